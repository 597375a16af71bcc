use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

/// What an administrator did, for the audit trail.
#[derive(Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, TS, EnumString, Display)]
#[sqlx(type_name = "admin_action_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AdminActionKind {
    BanUser,
    UnbanUser,
    SuspendPrompt,
    RestorePrompt,
    ApprovePayout,
    CompletePayout,
    RejectPayout,
    RefundPayment,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct AdminAction {
    pub id: Uuid,
    pub admin_id: Uuid,
    pub action: AdminActionKind,
    pub target_id: Uuid,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AdminAction {
    /// Written inside the same transaction as the action it records.
    pub async fn record<'e, E>(
        executor: E,
        admin_id: Uuid,
        action: AdminActionKind,
        target_id: Uuid,
        note: Option<&str>,
    ) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            r#"INSERT INTO admin_actions (id, admin_id, action, target_id, note)
               VALUES ($1, $2, $3, $4, $5)"#,
        )
        .bind(Uuid::new_v4())
        .bind(admin_id)
        .bind(action)
        .bind(target_id)
        .bind(note)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn list(pool: &SqlitePool, limit: i64, offset: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, AdminAction>(
            r#"SELECT id, admin_id, action, target_id, note, created_at
               FROM admin_actions
               ORDER BY created_at DESC
               LIMIT $1 OFFSET $2"#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }
}
