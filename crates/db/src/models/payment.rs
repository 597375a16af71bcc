use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Captured,
    Failed,
    Refunded,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Payment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub status: PaymentStatus,
    pub amount_cents: i64,
    pub provider_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const PAYMENT_COLUMNS: &str = "id, order_id, status, amount_cents, provider_ref, created_at, updated_at";

impl Payment {
    pub async fn create<'e, E>(
        executor: E,
        id: Uuid,
        order_id: Uuid,
        amount_cents: i64,
        provider_ref: Option<&str>,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Payment>(&format!(
            r#"INSERT INTO payments (id, order_id, amount_cents, provider_ref)
               VALUES ($1, $2, $3, $4)
               RETURNING {PAYMENT_COLUMNS}"#
        ))
        .bind(id)
        .bind(order_id)
        .bind(amount_cents)
        .bind(provider_ref)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// The payment that still matters for an order: pending or captured.
    pub async fn find_live_by_order(
        pool: &SqlitePool,
        order_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Payment>(&format!(
            r#"SELECT {PAYMENT_COLUMNS} FROM payments
               WHERE order_id = $1 AND status IN ('pending', 'captured')
               ORDER BY created_at DESC
               LIMIT 1"#
        ))
        .bind(order_id)
        .fetch_optional(pool)
        .await
    }

    /// Conditional state flip. Returns the number of rows affected: zero means
    /// the payment was not in `from` and nothing changed.
    pub async fn transition<'e, E>(
        executor: E,
        id: Uuid,
        from: PaymentStatus,
        to: PaymentStatus,
    ) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"UPDATE payments
               SET status = $3, updated_at = CURRENT_TIMESTAMP
               WHERE id = $1 AND status = $2"#,
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }
}
