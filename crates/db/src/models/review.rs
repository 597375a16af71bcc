use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Review {
    pub id: Uuid,
    pub prompt_id: Uuid,
    pub user_id: Uuid,
    pub rating: i64,
    pub body: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct ReviewWithAuthor {
    pub id: Uuid,
    pub prompt_id: Uuid,
    pub user_id: Uuid,
    pub author_name: String,
    pub rating: i64,
    pub body: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct RatingSummary {
    pub review_count: i64,
    pub average_rating: Option<f64>,
}

impl Review {
    /// One review per buyer per prompt; writing again replaces the old one.
    pub async fn upsert(
        pool: &SqlitePool,
        prompt_id: Uuid,
        user_id: Uuid,
        rating: i64,
        body: Option<&str>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Review>(
            r#"INSERT INTO reviews (id, prompt_id, user_id, rating, body)
               VALUES ($1, $2, $3, $4, $5)
               ON CONFLICT(prompt_id, user_id) DO UPDATE SET
                   rating = excluded.rating,
                   body = excluded.body,
                   updated_at = CURRENT_TIMESTAMP
               RETURNING id, prompt_id, user_id, rating, body, created_at, updated_at"#,
        )
        .bind(Uuid::new_v4())
        .bind(prompt_id)
        .bind(user_id)
        .bind(rating)
        .bind(body)
        .fetch_one(pool)
        .await
    }

    pub async fn list_for_prompt(
        pool: &SqlitePool,
        prompt_id: Uuid,
    ) -> Result<Vec<ReviewWithAuthor>, sqlx::Error> {
        sqlx::query_as::<_, ReviewWithAuthor>(
            r#"SELECT r.id, r.prompt_id, r.user_id, u.display_name AS author_name,
                      r.rating, r.body, r.created_at
               FROM reviews r
               JOIN users u ON u.id = r.user_id
               WHERE r.prompt_id = $1
               ORDER BY r.created_at DESC"#,
        )
        .bind(prompt_id)
        .fetch_all(pool)
        .await
    }

    pub async fn summary(pool: &SqlitePool, prompt_id: Uuid) -> Result<RatingSummary, sqlx::Error> {
        sqlx::query_as::<_, RatingSummary>(
            r#"SELECT COUNT(*) AS review_count, AVG(rating) AS average_rating
               FROM reviews
               WHERE prompt_id = $1"#,
        )
        .bind(prompt_id)
        .fetch_one(pool)
        .await
    }
}
