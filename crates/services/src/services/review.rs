//! Buyer reviews, gated on an active entitlement.

use db::{
    DBService,
    models::{
        entitlement::Entitlement,
        prompt::{Prompt, PromptStatus},
        review::{RatingSummary, Review, ReviewWithAuthor},
    },
};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("prompt not found")]
    PromptNotFound,
    #[error("rating must be between 1 and 5")]
    InvalidRating,
    #[error("only buyers can review a prompt")]
    NotEntitled,
}

#[derive(Clone)]
pub struct ReviewService {
    db: DBService,
}

impl ReviewService {
    pub fn new(db: DBService) -> Self {
        Self { db }
    }

    /// Create or replace the caller's review of a purchased prompt.
    pub async fn submit(
        &self,
        user_id: Uuid,
        prompt_id: Uuid,
        rating: i64,
        body: Option<&str>,
    ) -> Result<Review, ReviewError> {
        if !(1..=5).contains(&rating) {
            return Err(ReviewError::InvalidRating);
        }

        let prompt = Prompt::find_by_id(&self.db.pool, prompt_id)
            .await?
            .ok_or(ReviewError::PromptNotFound)?;
        if matches!(prompt.status, PromptStatus::Deleted | PromptStatus::Draft) {
            return Err(ReviewError::PromptNotFound);
        }

        if Entitlement::find_active(&self.db.pool, user_id, prompt.id)
            .await?
            .is_none()
        {
            return Err(ReviewError::NotEntitled);
        }

        let review = Review::upsert(&self.db.pool, prompt.id, user_id, rating, body).await?;
        info!(prompt_id = %prompt.id, user_id = %user_id, rating = rating, "review submitted");
        Ok(review)
    }

    pub async fn list(&self, prompt_id: Uuid) -> Result<Vec<ReviewWithAuthor>, ReviewError> {
        Ok(Review::list_for_prompt(&self.db.pool, prompt_id).await?)
    }

    pub async fn summary(&self, prompt_id: Uuid) -> Result<RatingSummary, ReviewError> {
        Ok(Review::summary(&self.db.pool, prompt_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;

    #[tokio::test]
    async fn test_review_requires_entitlement() {
        let db = test_db().await;
        let seller = create_seller(&db, "seller@test.com").await;
        let buyer = create_user(&db, "buyer@test.com").await;
        let prompt = published_prompt(&db, &seller, "Prompt A", 1000).await;

        let reviews = ReviewService::new(db.clone());
        assert!(matches!(
            reviews.submit(buyer.id, prompt.id, 5, None).await,
            Err(ReviewError::NotEntitled)
        ));

        // Grant through a fake order and try again.
        let order = db::models::order::Order::create(&db.pool, Uuid::new_v4(), buyer.id, 1000)
            .await
            .unwrap();
        Entitlement::grant(&db.pool, buyer.id, prompt.id, order.id).await.unwrap();

        let review = reviews
            .submit(buyer.id, prompt.id, 4, Some("Works well"))
            .await
            .unwrap();
        assert_eq!(review.rating, 4);
    }

    #[tokio::test]
    async fn test_resubmit_replaces_review() {
        let db = test_db().await;
        let seller = create_seller(&db, "seller@test.com").await;
        let buyer = create_user(&db, "buyer@test.com").await;
        let prompt = published_prompt(&db, &seller, "Prompt A", 1000).await;
        let order = db::models::order::Order::create(&db.pool, Uuid::new_v4(), buyer.id, 1000)
            .await
            .unwrap();
        Entitlement::grant(&db.pool, buyer.id, prompt.id, order.id).await.unwrap();

        let reviews = ReviewService::new(db);
        reviews.submit(buyer.id, prompt.id, 2, Some("meh")).await.unwrap();
        reviews.submit(buyer.id, prompt.id, 5, Some("actually great")).await.unwrap();

        let listed = reviews.list(prompt.id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].rating, 5);

        let summary = reviews.summary(prompt.id).await.unwrap();
        assert_eq!(summary.review_count, 1);
        assert_eq!(summary.average_rating, Some(5.0));
    }

    #[tokio::test]
    async fn test_invalid_rating_rejected() {
        let db = test_db().await;
        let seller = create_seller(&db, "seller@test.com").await;
        let buyer = create_user(&db, "buyer@test.com").await;
        let prompt = published_prompt(&db, &seller, "Prompt A", 1000).await;

        let reviews = ReviewService::new(db);
        assert!(matches!(
            reviews.submit(buyer.id, prompt.id, 0, None).await,
            Err(ReviewError::InvalidRating)
        ));
        assert!(matches!(
            reviews.submit(buyer.id, prompt.id, 6, None).await,
            Err(ReviewError::InvalidRating)
        ));
    }
}
