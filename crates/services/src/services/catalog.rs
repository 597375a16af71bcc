//! Seller-side prompt management and the public browse surface.

use db::{
    DBService,
    models::{
        category::Category,
        prompt::{
            CreatePrompt, Prompt, PromptFilter, PromptSort, PromptStatus, PromptSummary,
            PromptVisibility, UpdatePrompt,
        },
        review::{RatingSummary, Review},
        tag::Tag,
        user::User,
    },
};
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use thiserror::Error;
use tracing::info;
use ts_rs::TS;
use utils::pagination::{PageQuery, Paged};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("prompt not found")]
    NotFound,
    #[error("prompt belongs to another seller")]
    NotOwner,
    #[error("price must not be negative")]
    InvalidPrice,
    #[error("prompt cannot be published: {0}")]
    NotPublishable(&'static str),
    #[error("unknown category")]
    UnknownCategory,
    #[error("category name already exists")]
    CategoryExists,
}

/// What a seller sees when editing a prompt (body included).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct SellerPromptView {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub body: String,
    pub price_cents: i64,
    pub category_id: Option<Uuid>,
    pub status: PromptStatus,
    pub visibility: PromptVisibility,
    pub like_count: i64,
    pub tags: Vec<Tag>,
}

/// Public detail page for a published prompt.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct PromptDetail {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub seller_name: String,
    pub category_id: Option<Uuid>,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub like_count: i64,
    pub tags: Vec<Tag>,
    pub rating: RatingSummary,
}

/// Query-string shape of the public search endpoint.
#[derive(Debug, Clone, Default, Deserialize, TS)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub category: Option<String>,
    pub tag: Option<String>,
    pub min_price_cents: Option<i64>,
    pub max_price_cents: Option<i64>,
    pub sort: Option<PromptSort>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl SearchQuery {
    fn page_query(&self) -> PageQuery {
        PageQuery {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[derive(Clone)]
pub struct CatalogService {
    db: DBService,
}

impl CatalogService {
    pub fn new(db: DBService) -> Self {
        Self { db }
    }

    pub async fn create_prompt(
        &self,
        seller_id: Uuid,
        data: &CreatePrompt,
    ) -> Result<SellerPromptView, CatalogError> {
        if data.price_cents < 0 {
            return Err(CatalogError::InvalidPrice);
        }
        if let Some(category_id) = data.category_id {
            Category::find_by_id(&self.db.pool, category_id)
                .await?
                .ok_or(CatalogError::UnknownCategory)?;
        }

        let slug = self.unique_slug(&data.title).await?;

        let mut tx = self.db.pool.begin().await?;
        let prompt = Prompt::create(&mut *tx, Uuid::new_v4(), seller_id, &slug, data).await?;
        if let Some(tags) = &data.tags {
            set_tags(&mut tx, prompt.id, tags).await?;
        }
        let tags = Tag::for_prompt(&mut *tx, prompt.id).await?;
        tx.commit().await?;

        info!(prompt_id = %prompt.id, seller_id = %seller_id, "prompt created");

        Ok(seller_view(prompt, tags))
    }

    pub async fn update_prompt(
        &self,
        seller_id: Uuid,
        prompt_id: Uuid,
        data: &UpdatePrompt,
    ) -> Result<SellerPromptView, CatalogError> {
        let prompt = self.owned_prompt(seller_id, prompt_id).await?;

        let title = data.title.clone().unwrap_or(prompt.title);
        let description = data.description.clone().or(prompt.description);
        let body = data.body.clone().unwrap_or(prompt.body);
        let price_cents = data.price_cents.unwrap_or(prompt.price_cents);
        let category_id = data.category_id.or(prompt.category_id);
        let visibility = data.visibility.unwrap_or(prompt.visibility);

        if price_cents < 0 {
            return Err(CatalogError::InvalidPrice);
        }
        if let Some(category_id) = category_id {
            Category::find_by_id(&self.db.pool, category_id)
                .await?
                .ok_or(CatalogError::UnknownCategory)?;
        }

        let mut tx = self.db.pool.begin().await?;
        let prompt = Prompt::update(
            &mut *tx,
            prompt_id,
            &title,
            description.as_deref(),
            &body,
            price_cents,
            category_id,
            visibility,
        )
        .await?;
        if let Some(tags) = &data.tags {
            set_tags(&mut tx, prompt.id, tags).await?;
        }
        let tags = Tag::for_prompt(&mut *tx, prompt.id).await?;
        tx.commit().await?;

        Ok(seller_view(prompt, tags))
    }

    /// Drafts go live. A published prompt needs a positive price, a category
    /// and a non-empty body.
    pub async fn publish(
        &self,
        seller_id: Uuid,
        prompt_id: Uuid,
    ) -> Result<SellerPromptView, CatalogError> {
        let prompt = self.owned_prompt(seller_id, prompt_id).await?;

        if prompt.status != PromptStatus::Draft {
            return Err(CatalogError::NotPublishable("only drafts can be published"));
        }
        if prompt.price_cents <= 0 {
            return Err(CatalogError::InvalidPrice);
        }
        if prompt.body.trim().is_empty() {
            return Err(CatalogError::NotPublishable("prompt body is empty"));
        }
        if prompt.category_id.is_none() {
            return Err(CatalogError::NotPublishable("category is required"));
        }

        Prompt::update_status(&self.db.pool, prompt.id, PromptStatus::Published).await?;
        info!(prompt_id = %prompt.id, "prompt published");

        self.get_for_seller(seller_id, prompt_id).await
    }

    /// Soft delete: the row stays for order history, the listing disappears.
    pub async fn delete_prompt(&self, seller_id: Uuid, prompt_id: Uuid) -> Result<(), CatalogError> {
        let prompt = self.owned_prompt(seller_id, prompt_id).await?;
        Prompt::update_status(&self.db.pool, prompt.id, PromptStatus::Deleted).await?;
        info!(prompt_id = %prompt.id, "prompt deleted");
        Ok(())
    }

    pub async fn my_prompts(&self, seller_id: Uuid) -> Result<Vec<Prompt>, CatalogError> {
        Ok(Prompt::find_by_seller(&self.db.pool, seller_id).await?)
    }

    pub async fn get_for_seller(
        &self,
        seller_id: Uuid,
        prompt_id: Uuid,
    ) -> Result<SellerPromptView, CatalogError> {
        let prompt = self.owned_prompt(seller_id, prompt_id).await?;
        let tags = Tag::for_prompt(&self.db.pool, prompt.id).await?;
        Ok(seller_view(prompt, tags))
    }

    /// Public detail by slug. Unlisted prompts resolve here even though they
    /// never appear in search results.
    pub async fn get_public(&self, slug: &str) -> Result<PromptDetail, CatalogError> {
        let prompt = Prompt::find_by_slug(&self.db.pool, slug)
            .await?
            .ok_or(CatalogError::NotFound)?;
        if prompt.status != PromptStatus::Published {
            return Err(CatalogError::NotFound);
        }

        let seller = User::find_by_id(&self.db.pool, prompt.seller_id)
            .await?
            .ok_or(CatalogError::NotFound)?;
        let tags = Tag::for_prompt(&self.db.pool, prompt.id).await?;
        let rating = Review::summary(&self.db.pool, prompt.id).await?;

        Ok(PromptDetail {
            id: prompt.id,
            seller_id: prompt.seller_id,
            seller_name: seller.display_name,
            category_id: prompt.category_id,
            title: prompt.title,
            slug: prompt.slug,
            description: prompt.description,
            price_cents: prompt.price_cents,
            like_count: prompt.like_count,
            tags,
            rating,
        })
    }

    pub async fn search(&self, query: &SearchQuery) -> Result<Paged<PromptSummary>, CatalogError> {
        let page = query.page_query();
        let mut filter = PromptFilter {
            q: query.q.clone().filter(|q| !q.trim().is_empty()),
            min_price_cents: query.min_price_cents,
            max_price_cents: query.max_price_cents,
            sort: query.sort.unwrap_or_default(),
            ..Default::default()
        };

        if let Some(category_slug) = query.category.as_deref() {
            match Category::find_by_slug(&self.db.pool, category_slug).await? {
                Some(category) => filter.category_id = Some(category.id),
                None => return Ok(Paged::new(Vec::new(), &page, 0)),
            }
        }
        if let Some(raw_tag) = query.tag.as_deref() {
            let Some(name) = utils::text::normalize_tag(raw_tag) else {
                return Ok(Paged::new(Vec::new(), &page, 0));
            };
            match Tag::find_by_name(&self.db.pool, &name).await? {
                Some(tag) => filter.tag_id = Some(tag.id),
                None => return Ok(Paged::new(Vec::new(), &page, 0)),
            }
        }

        let items = Prompt::search(&self.db.pool, &filter, page.per_page(), page.offset()).await?;
        let total = Prompt::count_search(&self.db.pool, &filter).await?;

        Ok(Paged::new(items, &page, total))
    }

    /// Toggleable like; returns the new like count.
    pub async fn like(&self, user_id: Uuid, prompt_id: Uuid) -> Result<i64, CatalogError> {
        let prompt = self.published_prompt(prompt_id).await?;

        let mut tx = self.db.pool.begin().await?;
        if Prompt::insert_like(&mut *tx, user_id, prompt.id).await? {
            Prompt::bump_like_count(&mut *tx, prompt.id, 1).await?;
        }
        tx.commit().await?;

        self.like_count(prompt_id).await
    }

    pub async fn unlike(&self, user_id: Uuid, prompt_id: Uuid) -> Result<i64, CatalogError> {
        let prompt = self.published_prompt(prompt_id).await?;

        let mut tx = self.db.pool.begin().await?;
        if Prompt::delete_like(&mut *tx, user_id, prompt.id).await? {
            Prompt::bump_like_count(&mut *tx, prompt.id, -1).await?;
        }
        tx.commit().await?;

        self.like_count(prompt_id).await
    }

    pub async fn categories(&self) -> Result<Vec<Category>, CatalogError> {
        Ok(Category::find_all(&self.db.pool).await?)
    }

    pub async fn create_category(&self, name: &str) -> Result<Category, CatalogError> {
        let slug = utils::text::slugify(name);
        if Category::find_by_slug(&self.db.pool, &slug).await?.is_some() {
            return Err(CatalogError::CategoryExists);
        }
        Ok(Category::create(&self.db.pool, Uuid::new_v4(), name.trim(), &slug).await?)
    }

    pub async fn autocomplete_tags(&self, prefix: &str) -> Result<Vec<Tag>, CatalogError> {
        let Some(prefix) = utils::text::normalize_tag(prefix) else {
            return Ok(Vec::new());
        };
        Ok(Tag::autocomplete(&self.db.pool, &prefix, 10).await?)
    }

    async fn owned_prompt(&self, seller_id: Uuid, prompt_id: Uuid) -> Result<Prompt, CatalogError> {
        let prompt = Prompt::find_by_id(&self.db.pool, prompt_id)
            .await?
            .ok_or(CatalogError::NotFound)?;
        if prompt.status == PromptStatus::Deleted {
            return Err(CatalogError::NotFound);
        }
        if prompt.seller_id != seller_id {
            return Err(CatalogError::NotOwner);
        }
        Ok(prompt)
    }

    async fn published_prompt(&self, prompt_id: Uuid) -> Result<Prompt, CatalogError> {
        let prompt = Prompt::find_by_id(&self.db.pool, prompt_id)
            .await?
            .ok_or(CatalogError::NotFound)?;
        if prompt.status != PromptStatus::Published {
            return Err(CatalogError::NotFound);
        }
        Ok(prompt)
    }

    async fn like_count(&self, prompt_id: Uuid) -> Result<i64, CatalogError> {
        let prompt = Prompt::find_by_id(&self.db.pool, prompt_id)
            .await?
            .ok_or(CatalogError::NotFound)?;
        Ok(prompt.like_count)
    }

    async fn unique_slug(&self, title: &str) -> Result<String, CatalogError> {
        let mut slug = utils::text::slugify(title);
        if slug.is_empty() {
            slug = "prompt".to_string();
        }
        if Prompt::slug_exists(&self.db.pool, &slug).await? {
            let suffix = Uuid::new_v4().simple().to_string();
            slug = format!("{}-{}", slug, &suffix[..8]);
        }
        Ok(slug)
    }
}

async fn set_tags(
    tx: &mut SqliteConnection,
    prompt_id: Uuid,
    raw_tags: &[String],
) -> Result<(), sqlx::Error> {
    Tag::detach_all(&mut *tx, prompt_id).await?;
    for raw in raw_tags {
        if let Some(name) = utils::text::normalize_tag(raw) {
            let tag = Tag::find_or_create(&mut *tx, &name).await?;
            Tag::attach(&mut *tx, prompt_id, tag.id).await?;
        }
    }
    Ok(())
}

fn seller_view(prompt: Prompt, tags: Vec<Tag>) -> SellerPromptView {
    SellerPromptView {
        id: prompt.id,
        title: prompt.title,
        slug: prompt.slug,
        description: prompt.description,
        body: prompt.body,
        price_cents: prompt.price_cents,
        category_id: prompt.category_id,
        status: prompt.status,
        visibility: prompt.visibility,
        like_count: prompt.like_count,
        tags,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;

    fn create_data(title: &str, price_cents: i64, category_id: Option<Uuid>) -> CreatePrompt {
        CreatePrompt {
            title: title.to_string(),
            description: Some("desc".to_string()),
            body: "You are a helpful assistant.".to_string(),
            price_cents,
            category_id,
            visibility: None,
            tags: Some(vec!["ChatGPT".to_string(), "SEO Writing".to_string()]),
        }
    }

    #[tokio::test]
    async fn test_create_publish_flow() {
        let db = test_db().await;
        let seller = create_seller(&db, "seller@test.com").await;
        let catalog = CatalogService::new(db);
        let category = catalog.create_category("Marketing").await.unwrap();

        let view = catalog
            .create_prompt(seller.id, &create_data("Blog Writer", 1500, Some(category.id)))
            .await
            .unwrap();
        assert_eq!(view.status, PromptStatus::Draft);
        assert_eq!(view.slug, "blog-writer");
        assert_eq!(view.tags.len(), 2);
        assert!(view.tags.iter().any(|t| t.name == "seo-writing"));

        let view = catalog.publish(seller.id, view.id).await.unwrap();
        assert_eq!(view.status, PromptStatus::Published);

        let detail = catalog.get_public("blog-writer").await.unwrap();
        assert_eq!(detail.price_cents, 1500);
        assert_eq!(detail.rating.review_count, 0);
    }

    #[tokio::test]
    async fn test_publish_requirements() {
        let db = test_db().await;
        let seller = create_seller(&db, "seller@test.com").await;
        let catalog = CatalogService::new(db);
        let category = catalog.create_category("Marketing").await.unwrap();

        // Free prompts cannot be published.
        let free = catalog
            .create_prompt(seller.id, &create_data("Free Prompt", 0, Some(category.id)))
            .await
            .unwrap();
        assert!(matches!(
            catalog.publish(seller.id, free.id).await,
            Err(CatalogError::InvalidPrice)
        ));

        // A category is required.
        let uncategorized = catalog
            .create_prompt(seller.id, &create_data("Uncategorized", 1000, None))
            .await
            .unwrap();
        assert!(matches!(
            catalog.publish(seller.id, uncategorized.id).await,
            Err(CatalogError::NotPublishable(_))
        ));
    }

    #[tokio::test]
    async fn test_update_requires_ownership() {
        let db = test_db().await;
        let seller = create_seller(&db, "seller@test.com").await;
        let intruder = create_seller(&db, "intruder@test.com").await;
        let catalog = CatalogService::new(db);

        let view = catalog
            .create_prompt(seller.id, &create_data("Mine", 1000, None))
            .await
            .unwrap();

        let update = UpdatePrompt {
            title: Some("Stolen".to_string()),
            description: None,
            body: None,
            price_cents: None,
            category_id: None,
            visibility: None,
            tags: None,
        };
        assert!(matches!(
            catalog.update_prompt(intruder.id, view.id, &update).await,
            Err(CatalogError::NotOwner)
        ));
    }

    #[tokio::test]
    async fn test_slug_collision_gets_suffix() {
        let db = test_db().await;
        let seller = create_seller(&db, "seller@test.com").await;
        let catalog = CatalogService::new(db);

        let first = catalog
            .create_prompt(seller.id, &create_data("Same Title", 1000, None))
            .await
            .unwrap();
        let second = catalog
            .create_prompt(seller.id, &create_data("Same Title", 1000, None))
            .await
            .unwrap();

        assert_eq!(first.slug, "same-title");
        assert_ne!(second.slug, first.slug);
        assert!(second.slug.starts_with("same-title-"));
    }

    #[tokio::test]
    async fn test_search_filters() {
        let db = test_db().await;
        let seller = create_seller(&db, "seller@test.com").await;
        let catalog = CatalogService::new(db);
        let marketing = catalog.create_category("Marketing").await.unwrap();
        let coding = catalog.create_category("Coding").await.unwrap();

        for (title, price, category) in [
            ("SEO Blog Writer", 1000, &marketing),
            ("Cold Email Pack", 2000, &marketing),
            ("Rust Refactoring Helper", 3000, &coding),
        ] {
            let view = catalog
                .create_prompt(seller.id, &create_data(title, price, Some(category.id)))
                .await
                .unwrap();
            catalog.publish(seller.id, view.id).await.unwrap();
        }

        // Everything published is visible.
        let all = catalog.search(&SearchQuery::default()).await.unwrap();
        assert_eq!(all.total, 3);

        // Text filter.
        let found = catalog
            .search(&SearchQuery {
                q: Some("rust".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(found.total, 1);
        assert_eq!(found.items[0].title, "Rust Refactoring Helper");

        // Category filter.
        let found = catalog
            .search(&SearchQuery {
                category: Some("marketing".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(found.total, 2);

        // Price range + sort.
        let found = catalog
            .search(&SearchQuery {
                min_price_cents: Some(1500),
                sort: Some(PromptSort::PriceAsc),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(found.total, 2);
        assert_eq!(found.items[0].price_cents, 2000);

        // Tag filter (tags shared by all three fixtures).
        let found = catalog
            .search(&SearchQuery {
                tag: Some("chatgpt".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(found.total, 3);

        // Unknown category yields an empty page, not an error.
        let found = catalog
            .search(&SearchQuery {
                category: Some("nonexistent".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(found.total, 0);
    }

    #[tokio::test]
    async fn test_unlisted_prompt_hidden_from_search_but_fetchable() {
        let db = test_db().await;
        let seller = create_seller(&db, "seller@test.com").await;
        let catalog = CatalogService::new(db);
        let category = catalog.create_category("Marketing").await.unwrap();

        let mut data = create_data("Secret Deal", 1000, Some(category.id));
        data.visibility = Some(PromptVisibility::Unlisted);
        let view = catalog.create_prompt(seller.id, &data).await.unwrap();
        catalog.publish(seller.id, view.id).await.unwrap();

        let found = catalog.search(&SearchQuery::default()).await.unwrap();
        assert_eq!(found.total, 0);

        let detail = catalog.get_public("secret-deal").await.unwrap();
        assert_eq!(detail.title, "Secret Deal");
    }

    #[tokio::test]
    async fn test_like_toggle_maintains_count() {
        let db = test_db().await;
        let seller = create_seller(&db, "seller@test.com").await;
        let buyer = create_user(&db, "buyer@test.com").await;
        let prompt = published_prompt(&db, &seller, "Likeable", 1000).await;
        let catalog = CatalogService::new(db);

        assert_eq!(catalog.like(buyer.id, prompt.id).await.unwrap(), 1);
        // Liking twice does not double count.
        assert_eq!(catalog.like(buyer.id, prompt.id).await.unwrap(), 1);
        assert_eq!(catalog.unlike(buyer.id, prompt.id).await.unwrap(), 0);
        assert_eq!(catalog.unlike(buyer.id, prompt.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_tag_autocomplete() {
        let db = test_db().await;
        let seller = create_seller(&db, "seller@test.com").await;
        let catalog = CatalogService::new(db);

        catalog
            .create_prompt(seller.id, &create_data("Tagged", 1000, None))
            .await
            .unwrap();

        let tags = catalog.autocomplete_tags("chat").await.unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name, "chatgpt");

        assert!(catalog.autocomplete_tags("zzz").await.unwrap().is_empty());
    }
}
