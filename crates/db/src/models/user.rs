use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum UserRole {
    #[default]
    User,
    Seller,
    Admin,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub display_name: String,
    pub role: UserRole,
    pub banned: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub async fn create(
        pool: &SqlitePool,
        id: Uuid,
        email: &str,
        password_hash: &str,
        display_name: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"INSERT INTO users (id, email, password_hash, display_name)
               VALUES ($1, $2, $3, $4)
               RETURNING id, email, password_hash, display_name, role, banned, created_at, updated_at"#,
        )
        .bind(id)
        .bind(email)
        .bind(password_hash)
        .bind(display_name)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"SELECT id, email, password_hash, display_name, role, banned, created_at, updated_at
               FROM users
               WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"SELECT id, email, password_hash, display_name, role, banned, created_at, updated_at
               FROM users
               WHERE email = $1"#,
        )
        .bind(email)
        .fetch_optional(pool)
        .await
    }

    pub async fn set_role(pool: &SqlitePool, id: Uuid, role: UserRole) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET role = $2, updated_at = CURRENT_TIMESTAMP WHERE id = $1")
            .bind(id)
            .bind(role)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn set_banned<'e, E>(executor: E, id: Uuid, banned: bool) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result =
            sqlx::query("UPDATE users SET banned = $2, updated_at = CURRENT_TIMESTAMP WHERE id = $1")
                .bind(id)
                .bind(banned)
                .execute(executor)
                .await?;
        Ok(result.rows_affected())
    }

    pub async fn list(
        pool: &SqlitePool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"SELECT id, email, password_hash, display_name, role, banned, created_at, updated_at
               FROM users
               ORDER BY created_at DESC
               LIMIT $1 OFFSET $2"#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }
}
