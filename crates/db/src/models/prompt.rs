use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, QueryBuilder, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "prompt_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PromptStatus {
    #[default]
    Draft,
    Published,
    Suspended,
    Deleted,
}

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "prompt_visibility", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PromptVisibility {
    #[default]
    Public,
    Unlisted,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, TS, EnumString, Display, Default)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PromptSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    MostLiked,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Prompt {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub category_id: Option<Uuid>,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    /// The purchasable prompt text. Only delivered through entitlement-gated
    /// endpoints.
    #[serde(skip_serializing)]
    pub body: String,
    pub price_cents: i64,
    pub status: PromptStatus,
    pub visibility: PromptVisibility,
    pub like_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Listing row: everything a browse page needs, body excluded.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct PromptSummary {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub seller_name: String,
    pub category_id: Option<Uuid>,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub like_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreatePrompt {
    pub title: String,
    pub description: Option<String>,
    pub body: String,
    pub price_cents: i64,
    pub category_id: Option<Uuid>,
    pub visibility: Option<PromptVisibility>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct UpdatePrompt {
    pub title: Option<String>,
    pub description: Option<String>,
    pub body: Option<String>,
    pub price_cents: Option<i64>,
    pub category_id: Option<Uuid>,
    pub visibility: Option<PromptVisibility>,
    pub tags: Option<Vec<String>>,
}

/// Resolved search filter (slugs/tag names already mapped to ids).
#[derive(Debug, Clone, Default)]
pub struct PromptFilter {
    pub q: Option<String>,
    pub category_id: Option<Uuid>,
    pub tag_id: Option<Uuid>,
    pub min_price_cents: Option<i64>,
    pub max_price_cents: Option<i64>,
    pub sort: PromptSort,
}

const PROMPT_COLUMNS: &str = "id, seller_id, category_id, title, slug, description, body, \
                              price_cents, status, visibility, like_count, created_at, updated_at";

impl Prompt {
    pub async fn create<'e, E>(
        executor: E,
        id: Uuid,
        seller_id: Uuid,
        slug: &str,
        data: &CreatePrompt,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let visibility = data.visibility.unwrap_or_default();
        sqlx::query_as::<_, Prompt>(&format!(
            r#"INSERT INTO prompts (id, seller_id, category_id, title, slug, description, body, price_cents, visibility)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
               RETURNING {PROMPT_COLUMNS}"#,
        ))
        .bind(id)
        .bind(seller_id)
        .bind(data.category_id)
        .bind(&data.title)
        .bind(slug)
        .bind(&data.description)
        .bind(&data.body)
        .bind(data.price_cents)
        .bind(visibility)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Prompt>(&format!(
            "SELECT {PROMPT_COLUMNS} FROM prompts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    pub async fn find_by_slug(pool: &SqlitePool, slug: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Prompt>(&format!(
            "SELECT {PROMPT_COLUMNS} FROM prompts WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(pool)
        .await
    }

    pub async fn slug_exists(pool: &SqlitePool, slug: &str) -> Result<bool, sqlx::Error> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM prompts WHERE slug = $1")
            .bind(slug)
            .fetch_one(pool)
            .await?;
        Ok(count > 0)
    }

    pub async fn find_by_seller(
        pool: &SqlitePool,
        seller_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Prompt>(&format!(
            r#"SELECT {PROMPT_COLUMNS} FROM prompts
               WHERE seller_id = $1 AND status != 'deleted'
               ORDER BY created_at DESC"#,
        ))
        .bind(seller_id)
        .fetch_all(pool)
        .await
    }

    pub async fn update<'e, E>(
        executor: E,
        id: Uuid,
        title: &str,
        description: Option<&str>,
        body: &str,
        price_cents: i64,
        category_id: Option<Uuid>,
        visibility: PromptVisibility,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Prompt>(&format!(
            r#"UPDATE prompts
               SET title = $2, description = $3, body = $4, price_cents = $5,
                   category_id = $6, visibility = $7, updated_at = CURRENT_TIMESTAMP
               WHERE id = $1
               RETURNING {PROMPT_COLUMNS}"#,
        ))
        .bind(id)
        .bind(title)
        .bind(description)
        .bind(body)
        .bind(price_cents)
        .bind(category_id)
        .bind(visibility)
        .fetch_one(executor)
        .await
    }

    pub async fn update_status<'e, E>(
        executor: E,
        id: Uuid,
        status: PromptStatus,
    ) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            "UPDATE prompts SET status = $2, updated_at = CURRENT_TIMESTAMP WHERE id = $1",
        )
        .bind(id)
        .bind(status)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn search(
        pool: &SqlitePool,
        filter: &PromptFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PromptSummary>, sqlx::Error> {
        let mut qb = filtered_query(
            "SELECT p.id, p.seller_id, u.display_name AS seller_name, p.category_id, p.title, \
             p.slug, p.description, p.price_cents, p.like_count, p.created_at",
            filter,
        );

        qb.push(match filter.sort {
            PromptSort::Newest => " ORDER BY p.created_at DESC",
            PromptSort::PriceAsc => " ORDER BY p.price_cents ASC, p.created_at DESC",
            PromptSort::PriceDesc => " ORDER BY p.price_cents DESC, p.created_at DESC",
            PromptSort::MostLiked => " ORDER BY p.like_count DESC, p.created_at DESC",
        });
        qb.push(" LIMIT ");
        qb.push_bind(limit);
        qb.push(" OFFSET ");
        qb.push_bind(offset);

        qb.build_query_as::<PromptSummary>().fetch_all(pool).await
    }

    pub async fn count_search(pool: &SqlitePool, filter: &PromptFilter) -> Result<i64, sqlx::Error> {
        let mut qb = filtered_query("SELECT COUNT(*)", filter);
        qb.build_query_scalar::<i64>().fetch_one(pool).await
    }

    /// Record a like. Returns false when the user already liked the prompt.
    pub async fn insert_like<'e, E>(
        executor: E,
        user_id: Uuid,
        prompt_id: Uuid,
    ) -> Result<bool, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            "INSERT INTO prompt_likes (user_id, prompt_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(prompt_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_like<'e, E>(
        executor: E,
        user_id: Uuid,
        prompt_id: Uuid,
    ) -> Result<bool, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM prompt_likes WHERE user_id = $1 AND prompt_id = $2")
            .bind(user_id)
            .bind(prompt_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn bump_like_count<'e, E>(
        executor: E,
        prompt_id: Uuid,
        delta: i64,
    ) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query("UPDATE prompts SET like_count = like_count + $2 WHERE id = $1")
            .bind(prompt_id)
            .bind(delta)
            .execute(executor)
            .await?;
        Ok(())
    }
}

fn filtered_query<'a>(select: &str, filter: &'a PromptFilter) -> QueryBuilder<'a, Sqlite> {
    let mut qb = QueryBuilder::new(select);
    qb.push(" FROM prompts p JOIN users u ON u.id = p.seller_id");

    if let Some(tag_id) = filter.tag_id {
        qb.push(" JOIN prompt_tags pt ON pt.prompt_id = p.id AND pt.tag_id = ");
        qb.push_bind(tag_id);
    }

    qb.push(" WHERE p.status = 'published' AND p.visibility = 'public'");

    if let Some(q) = filter.q.as_deref() {
        let pattern = format!("%{}%", utils::text::escape_like(q));
        qb.push(" AND (p.title LIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" ESCAPE '\\' OR p.description LIKE ");
        qb.push_bind(pattern);
        qb.push(" ESCAPE '\\')");
    }
    if let Some(category_id) = filter.category_id {
        qb.push(" AND p.category_id = ");
        qb.push_bind(category_id);
    }
    if let Some(min) = filter.min_price_cents {
        qb.push(" AND p.price_cents >= ");
        qb.push_bind(min);
    }
    if let Some(max) = filter.max_price_cents {
        qb.push(" AND p.price_cents <= ");
        qb.push_bind(max);
    }

    qb
}
