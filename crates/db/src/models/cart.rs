use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

/// A cart belongs either to an authenticated user or to an anonymous
/// cookie-held key, never both.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Cart {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub anon_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct CartItem {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub prompt_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Cart line joined with the current prompt listing data.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct CartItemDetail {
    pub item_id: Uuid,
    pub prompt_id: Uuid,
    pub seller_id: Uuid,
    pub title: String,
    pub slug: String,
    pub price_cents: i64,
}

const CART_COLUMNS: &str = "id, user_id, anon_key, created_at, updated_at";

impl Cart {
    pub async fn find_by_user(pool: &SqlitePool, user_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Cart>(&format!(
            "SELECT {CART_COLUMNS} FROM carts WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_anon_key(
        pool: &SqlitePool,
        anon_key: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Cart>(&format!(
            "SELECT {CART_COLUMNS} FROM carts WHERE anon_key = $1"
        ))
        .bind(anon_key)
        .fetch_optional(pool)
        .await
    }

    pub async fn create_for_user(pool: &SqlitePool, user_id: Uuid) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Cart>(&format!(
            r#"INSERT INTO carts (id, user_id)
               VALUES ($1, $2)
               ON CONFLICT(user_id) DO UPDATE SET updated_at = CURRENT_TIMESTAMP
               RETURNING {CART_COLUMNS}"#
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    pub async fn create_for_anon_key(pool: &SqlitePool, anon_key: &str) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Cart>(&format!(
            r#"INSERT INTO carts (id, anon_key)
               VALUES ($1, $2)
               ON CONFLICT(anon_key) DO UPDATE SET updated_at = CURRENT_TIMESTAMP
               RETURNING {CART_COLUMNS}"#
        ))
        .bind(Uuid::new_v4())
        .bind(anon_key)
        .fetch_one(pool)
        .await
    }

    /// Add a prompt to the cart. Returns false when it is already there.
    pub async fn add_item<'e, E>(
        executor: E,
        cart_id: Uuid,
        prompt_id: Uuid,
    ) -> Result<bool, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"INSERT INTO cart_items (id, cart_id, prompt_id)
               VALUES ($1, $2, $3)
               ON CONFLICT(cart_id, prompt_id) DO NOTHING"#,
        )
        .bind(Uuid::new_v4())
        .bind(cart_id)
        .bind(prompt_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn remove_item(
        pool: &SqlitePool,
        cart_id: Uuid,
        prompt_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1 AND prompt_id = $2")
            .bind(cart_id)
            .bind(prompt_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn items<'e, E>(executor: E, cart_id: Uuid) -> Result<Vec<CartItemDetail>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, CartItemDetail>(
            r#"SELECT ci.id AS item_id, ci.prompt_id, p.seller_id, p.title, p.slug, p.price_cents
               FROM cart_items ci
               JOIN prompts p ON p.id = ci.prompt_id
               WHERE ci.cart_id = $1
               ORDER BY ci.created_at ASC"#,
        )
        .bind(cart_id)
        .fetch_all(executor)
        .await
    }

    pub async fn clear<'e, E>(executor: E, cart_id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(cart_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete a cart together with its items (used after merging an anonymous
    /// cart into a user cart).
    pub async fn delete<'e, E>(executor: E, cart_id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM carts WHERE id = $1")
            .bind(cart_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
