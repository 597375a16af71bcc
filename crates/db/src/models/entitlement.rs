use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

/// A permanent download grant for a purchased prompt. Unique per
/// (user, prompt); revoked by refunds rather than deleted.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Entitlement {
    pub id: Uuid,
    pub user_id: Uuid,
    pub prompt_id: Uuid,
    pub order_id: Uuid,
    pub granted_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

/// Library row: entitlement joined with the prompt it unlocks.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct PurchasedPrompt {
    pub prompt_id: Uuid,
    pub title: String,
    pub slug: String,
    pub order_id: Uuid,
    pub granted_at: DateTime<Utc>,
}

impl Entitlement {
    /// Idempotent grant: re-buying a prompt (e.g. after a refund revoked the
    /// grant) reactivates the existing row instead of failing.
    pub async fn grant<'e, E>(
        executor: E,
        user_id: Uuid,
        prompt_id: Uuid,
        order_id: Uuid,
    ) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            r#"INSERT INTO entitlements (id, user_id, prompt_id, order_id)
               VALUES ($1, $2, $3, $4)
               ON CONFLICT(user_id, prompt_id)
               DO UPDATE SET revoked_at = NULL, order_id = excluded.order_id"#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(prompt_id)
        .bind(order_id)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn revoke_for_order<'e, E>(executor: E, order_id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"UPDATE entitlements
               SET revoked_at = CURRENT_TIMESTAMP
               WHERE order_id = $1 AND revoked_at IS NULL"#,
        )
        .bind(order_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn find_active<'e, E>(
        executor: E,
        user_id: Uuid,
        prompt_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Entitlement>(
            r#"SELECT id, user_id, prompt_id, order_id, granted_at, revoked_at
               FROM entitlements
               WHERE user_id = $1 AND prompt_id = $2 AND revoked_at IS NULL"#,
        )
        .bind(user_id)
        .bind(prompt_id)
        .fetch_optional(executor)
        .await
    }

    pub async fn list_for_user(
        pool: &SqlitePool,
        user_id: Uuid,
    ) -> Result<Vec<PurchasedPrompt>, sqlx::Error> {
        sqlx::query_as::<_, PurchasedPrompt>(
            r#"SELECT e.prompt_id, p.title, p.slug, e.order_id, e.granted_at
               FROM entitlements e
               JOIN prompts p ON p.id = e.prompt_id
               WHERE e.user_id = $1 AND e.revoked_at IS NULL
               ORDER BY e.granted_at DESC"#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }
}
