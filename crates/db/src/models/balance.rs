use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

/// Aggregate view of a seller's ledger, re-derived after every ledger or
/// payout change rather than incremented in place.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct SellerBalance {
    pub seller_id: Uuid,
    pub available_cents: i64,
    pub pending_payout_cents: i64,
    pub lifetime_net_cents: i64,
    pub updated_at: DateTime<Utc>,
}

impl SellerBalance {
    pub async fn upsert<'e, E>(
        executor: E,
        seller_id: Uuid,
        available_cents: i64,
        pending_payout_cents: i64,
        lifetime_net_cents: i64,
    ) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            r#"INSERT INTO seller_balances (seller_id, available_cents, pending_payout_cents, lifetime_net_cents, updated_at)
               VALUES ($1, $2, $3, $4, CURRENT_TIMESTAMP)
               ON CONFLICT(seller_id) DO UPDATE SET
                   available_cents = excluded.available_cents,
                   pending_payout_cents = excluded.pending_payout_cents,
                   lifetime_net_cents = excluded.lifetime_net_cents,
                   updated_at = CURRENT_TIMESTAMP"#,
        )
        .bind(seller_id)
        .bind(available_cents)
        .bind(pending_payout_cents)
        .bind(lifetime_net_cents)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn find(pool: &SqlitePool, seller_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, SellerBalance>(
            r#"SELECT seller_id, available_cents, pending_payout_cents, lifetime_net_cents, updated_at
               FROM seller_balances
               WHERE seller_id = $1"#,
        )
        .bind(seller_id)
        .fetch_optional(pool)
        .await
    }
}
