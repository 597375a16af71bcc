use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "payout_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PayoutStatus {
    #[default]
    Requested,
    Approved,
    Paid,
    Rejected,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Payout {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub amount_cents: i64,
    pub status: PayoutStatus,
    pub requested_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub processed_by: Option<Uuid>,
}

const PAYOUT_COLUMNS: &str =
    "id, seller_id, amount_cents, status, requested_at, processed_at, processed_by";

impl Payout {
    pub async fn create<'e, E>(
        executor: E,
        id: Uuid,
        seller_id: Uuid,
        amount_cents: i64,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Payout>(&format!(
            r#"INSERT INTO payouts (id, seller_id, amount_cents)
               VALUES ($1, $2, $3)
               RETURNING {PAYOUT_COLUMNS}"#
        ))
        .bind(id)
        .bind(seller_id)
        .bind(amount_cents)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Payout>(&format!(
            "SELECT {PAYOUT_COLUMNS} FROM payouts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    pub async fn list_for_seller(
        pool: &SqlitePool,
        seller_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Payout>(&format!(
            r#"SELECT {PAYOUT_COLUMNS} FROM payouts
               WHERE seller_id = $1
               ORDER BY requested_at DESC"#
        ))
        .bind(seller_id)
        .fetch_all(pool)
        .await
    }

    pub async fn list_by_status(
        pool: &SqlitePool,
        status: PayoutStatus,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Payout>(&format!(
            r#"SELECT {PAYOUT_COLUMNS} FROM payouts
               WHERE status = $1
               ORDER BY requested_at ASC
               LIMIT $2 OFFSET $3"#
        ))
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    /// Sum of payouts that reduce what the seller can still withdraw
    /// (requested, approved and already paid).
    pub async fn outstanding_total<'e, E>(executor: E, seller_id: Uuid) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar::<_, i64>(
            r#"SELECT COALESCE(SUM(amount_cents), 0)
               FROM payouts
               WHERE seller_id = $1 AND status IN ('requested', 'approved', 'paid')"#,
        )
        .bind(seller_id)
        .fetch_one(executor)
        .await
    }

    /// Sum of payouts still in flight (requested or approved).
    pub async fn pending_total<'e, E>(executor: E, seller_id: Uuid) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar::<_, i64>(
            r#"SELECT COALESCE(SUM(amount_cents), 0)
               FROM payouts
               WHERE seller_id = $1 AND status IN ('requested', 'approved')"#,
        )
        .bind(seller_id)
        .fetch_one(executor)
        .await
    }

    /// Conditional state flip; zero rows affected means the payout was not in
    /// `from`.
    pub async fn transition<'e, E>(
        executor: E,
        id: Uuid,
        from: PayoutStatus,
        to: PayoutStatus,
        processed_by: Option<Uuid>,
    ) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"UPDATE payouts
               SET status = $3, processed_at = CURRENT_TIMESTAMP, processed_by = $4
               WHERE id = $1 AND status = $2"#,
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .bind(processed_by)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }
}
