use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
}

impl Tag {
    /// Insert the tag if it does not exist yet and return its row either way.
    /// `name` must already be normalized.
    pub async fn find_or_create<'e, E>(executor: E, name: &str) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let id = Uuid::new_v4();
        sqlx::query_as::<_, Tag>(
            r#"INSERT INTO tags (id, name)
               VALUES ($1, $2)
               ON CONFLICT(name) DO UPDATE SET name = excluded.name
               RETURNING id, name"#,
        )
        .bind(id)
        .bind(name)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_name(pool: &SqlitePool, name: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Tag>("SELECT id, name FROM tags WHERE name = $1")
            .bind(name)
            .fetch_optional(pool)
            .await
    }

    pub async fn autocomplete(
        pool: &SqlitePool,
        prefix: &str,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let pattern = format!("{}%", utils::text::escape_like(prefix));
        sqlx::query_as::<_, Tag>(
            r#"SELECT id, name FROM tags
               WHERE name LIKE $1 ESCAPE '\'
               ORDER BY name ASC
               LIMIT $2"#,
        )
        .bind(pattern)
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    pub async fn for_prompt<'e, E>(executor: E, prompt_id: Uuid) -> Result<Vec<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Tag>(
            r#"SELECT t.id, t.name
               FROM tags t
               JOIN prompt_tags pt ON pt.tag_id = t.id
               WHERE pt.prompt_id = $1
               ORDER BY t.name ASC"#,
        )
        .bind(prompt_id)
        .fetch_all(executor)
        .await
    }

    pub async fn attach<'e, E>(executor: E, prompt_id: Uuid, tag_id: Uuid) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            "INSERT INTO prompt_tags (prompt_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(prompt_id)
        .bind(tag_id)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn detach_all<'e, E>(executor: E, prompt_id: Uuid) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query("DELETE FROM prompt_tags WHERE prompt_id = $1")
            .bind(prompt_id)
            .execute(executor)
            .await?;
        Ok(())
    }
}
