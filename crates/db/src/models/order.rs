use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "order_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Cancelled,
    Refunded,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Order {
    pub id: Uuid,
    pub buyer_id: Uuid,
    pub status: OrderStatus,
    pub total_cents: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub prompt_id: Uuid,
    pub seller_id: Uuid,
    pub unit_price_cents: i64,
}

/// Order with its line items, as returned by the order endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct OrderWithItems {
    #[serde(flatten)]
    #[ts(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

const ORDER_COLUMNS: &str = "id, buyer_id, status, total_cents, created_at, updated_at";

impl Order {
    pub async fn create<'e, E>(
        executor: E,
        id: Uuid,
        buyer_id: Uuid,
        total_cents: i64,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Order>(&format!(
            r#"INSERT INTO orders (id, buyer_id, total_cents)
               VALUES ($1, $2, $3)
               RETURNING {ORDER_COLUMNS}"#
        ))
        .bind(id)
        .bind(buyer_id)
        .bind(total_cents)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Order>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn list_for_buyer(pool: &SqlitePool, buyer_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Order>(&format!(
            r#"SELECT {ORDER_COLUMNS} FROM orders
               WHERE buyer_id = $1
               ORDER BY created_at DESC"#
        ))
        .bind(buyer_id)
        .fetch_all(pool)
        .await
    }

    pub async fn update_status<'e, E>(
        executor: E,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            "UPDATE orders SET status = $2, updated_at = CURRENT_TIMESTAMP WHERE id = $1",
        )
        .bind(id)
        .bind(status)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }
}

impl OrderItem {
    pub async fn create<'e, E>(
        executor: E,
        id: Uuid,
        order_id: Uuid,
        prompt_id: Uuid,
        seller_id: Uuid,
        unit_price_cents: i64,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, OrderItem>(
            r#"INSERT INTO order_items (id, order_id, prompt_id, seller_id, unit_price_cents)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING id, order_id, prompt_id, seller_id, unit_price_cents"#,
        )
        .bind(id)
        .bind(order_id)
        .bind(prompt_id)
        .bind(seller_id)
        .bind(unit_price_cents)
        .fetch_one(executor)
        .await
    }

    pub async fn for_order<'e, E>(executor: E, order_id: Uuid) -> Result<Vec<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, OrderItem>(
            r#"SELECT id, order_id, prompt_id, seller_id, unit_price_cents
               FROM order_items
               WHERE order_id = $1
               ORDER BY rowid ASC"#,
        )
        .bind(order_id)
        .fetch_all(executor)
        .await
    }
}
