//! Buyer reviews.

use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::review::{Review, ReviewWithAuthor};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, auth::CurrentUser, error::ApiError};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct SubmitReviewRequest {
    pub prompt_id: Uuid,
    pub rating: i64,
    pub body: Option<String>,
}

pub async fn submit_review(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    axum::Json(payload): axum::Json<SubmitReviewRequest>,
) -> Result<ResponseJson<ApiResponse<Review>>, ApiError> {
    let review = state
        .reviews()
        .submit(user.id, payload.prompt_id, payload.rating, payload.body.as_deref())
        .await?;
    Ok(ResponseJson(ApiResponse::success(review)))
}

pub async fn list_reviews(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<ResponseJson<ApiResponse<Vec<ReviewWithAuthor>>>, ApiError> {
    let detail = state.catalog().get_public(&slug).await?;
    let reviews = state.reviews().list(detail.id).await?;
    Ok(ResponseJson(ApiResponse::success(reviews)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/reviews", post(submit_review))
        .route("/prompts/{slug}/reviews", get(list_reviews))
}
