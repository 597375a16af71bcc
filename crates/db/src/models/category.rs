use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

impl Category {
    pub async fn create(
        pool: &SqlitePool,
        id: Uuid,
        name: &str,
        slug: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Category>(
            r#"INSERT INTO categories (id, name, slug)
               VALUES ($1, $2, $3)
               RETURNING id, name, slug"#,
        )
        .bind(id)
        .bind(name)
        .bind(slug)
        .fetch_one(pool)
        .await
    }

    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Category>("SELECT id, name, slug FROM categories ORDER BY name ASC")
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Category>("SELECT id, name, slug FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_slug(pool: &SqlitePool, slug: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Category>("SELECT id, name, slug FROM categories WHERE slug = $1")
            .bind(slug)
            .fetch_optional(pool)
            .await
    }
}
