use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

/// One component of an order item's financial breakdown. Amounts are signed:
/// `sale_gross` is positive, the fee rows and `seller_net` negative, and the
/// four rows written per order item sum to zero.
#[derive(Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, TS, EnumString, Display)]
#[sqlx(type_name = "ledger_entry_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LedgerEntryType {
    SaleGross,
    PaymentFee,
    PlatformFee,
    SellerNet,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub order_id: Uuid,
    pub order_item_id: Uuid,
    pub seller_id: Uuid,
    pub entry_type: LedgerEntryType,
    pub amount_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub async fn insert<'e, E>(
        executor: E,
        order_id: Uuid,
        order_item_id: Uuid,
        seller_id: Uuid,
        entry_type: LedgerEntryType,
        amount_cents: i64,
    ) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            r#"INSERT INTO ledger_entries (id, order_id, order_item_id, seller_id, entry_type, amount_cents)
               VALUES ($1, $2, $3, $4, $5, $6)"#,
        )
        .bind(Uuid::new_v4())
        .bind(order_id)
        .bind(order_item_id)
        .bind(seller_id)
        .bind(entry_type)
        .bind(amount_cents)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn for_order(pool: &SqlitePool, order_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, LedgerEntry>(
            r#"SELECT id, order_id, order_item_id, seller_id, entry_type, amount_cents, created_at
               FROM ledger_entries
               WHERE order_id = $1
               ORDER BY created_at ASC, rowid ASC"#,
        )
        .bind(order_id)
        .fetch_all(pool)
        .await
    }

    pub async fn sum_for_order<'e, E>(executor: E, order_id: Uuid) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(amount_cents), 0) FROM ledger_entries WHERE order_id = $1",
        )
        .bind(order_id)
        .fetch_one(executor)
        .await
    }

    /// Lifetime net earned by a seller. `seller_net` rows are stored negative;
    /// the negated sum is what the seller is owed.
    pub async fn seller_net_total<'e, E>(executor: E, seller_id: Uuid) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar::<_, i64>(
            r#"SELECT COALESCE(-SUM(amount_cents), 0)
               FROM ledger_entries
               WHERE seller_id = $1 AND entry_type = 'seller_net'"#,
        )
        .bind(seller_id)
        .fetch_one(executor)
        .await
    }

    pub async fn distinct_sellers(pool: &SqlitePool) -> Result<Vec<Uuid>, sqlx::Error> {
        let rows: Vec<(Uuid,)> =
            sqlx::query_as("SELECT DISTINCT seller_id FROM ledger_entries")
                .fetch_all(pool)
                .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}
