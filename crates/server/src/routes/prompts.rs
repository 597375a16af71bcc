//! Public browse surface and seller-side prompt management.

use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::prompt::{CreatePrompt, Prompt, PromptSummary, UpdatePrompt};
use serde::{Deserialize, Serialize};
use services::services::catalog::{PromptDetail, SearchQuery, SellerPromptView};
use ts_rs::TS;
use utils::{pagination::Paged, response::ApiResponse};
use uuid::Uuid;

use crate::{
    AppState,
    auth::{CurrentUser, SellerUser},
    error::ApiError,
};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct LikeResponse {
    pub like_count: i64,
}

pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<ResponseJson<ApiResponse<Paged<PromptSummary>>>, ApiError> {
    let page = state.catalog().search(&query).await?;
    Ok(ResponseJson(ApiResponse::success(page)))
}

pub async fn get_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<ResponseJson<ApiResponse<PromptDetail>>, ApiError> {
    let detail = state.catalog().get_public(&slug).await?;
    Ok(ResponseJson(ApiResponse::success(detail)))
}

pub async fn like(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(slug): Path<String>,
) -> Result<ResponseJson<ApiResponse<LikeResponse>>, ApiError> {
    let detail = state.catalog().get_public(&slug).await?;
    let like_count = state.catalog().like(user.id, detail.id).await?;
    Ok(ResponseJson(ApiResponse::success(LikeResponse { like_count })))
}

pub async fn unlike(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(slug): Path<String>,
) -> Result<ResponseJson<ApiResponse<LikeResponse>>, ApiError> {
    let detail = state.catalog().get_public(&slug).await?;
    let like_count = state.catalog().unlike(user.id, detail.id).await?;
    Ok(ResponseJson(ApiResponse::success(LikeResponse { like_count })))
}

pub async fn create_prompt(
    State(state): State<AppState>,
    SellerUser(seller): SellerUser,
    axum::Json(payload): axum::Json<CreatePrompt>,
) -> Result<ResponseJson<ApiResponse<SellerPromptView>>, ApiError> {
    let view = state.catalog().create_prompt(seller.id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(view)))
}

pub async fn my_prompts(
    State(state): State<AppState>,
    SellerUser(seller): SellerUser,
) -> Result<ResponseJson<ApiResponse<Vec<Prompt>>>, ApiError> {
    let prompts = state.catalog().my_prompts(seller.id).await?;
    Ok(ResponseJson(ApiResponse::success(prompts)))
}

pub async fn get_my_prompt(
    State(state): State<AppState>,
    SellerUser(seller): SellerUser,
    Path(prompt_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<SellerPromptView>>, ApiError> {
    let view = state.catalog().get_for_seller(seller.id, prompt_id).await?;
    Ok(ResponseJson(ApiResponse::success(view)))
}

pub async fn update_prompt(
    State(state): State<AppState>,
    SellerUser(seller): SellerUser,
    Path(prompt_id): Path<Uuid>,
    axum::Json(payload): axum::Json<UpdatePrompt>,
) -> Result<ResponseJson<ApiResponse<SellerPromptView>>, ApiError> {
    let view = state
        .catalog()
        .update_prompt(seller.id, prompt_id, &payload)
        .await?;
    Ok(ResponseJson(ApiResponse::success(view)))
}

pub async fn publish_prompt(
    State(state): State<AppState>,
    SellerUser(seller): SellerUser,
    Path(prompt_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<SellerPromptView>>, ApiError> {
    let view = state.catalog().publish(seller.id, prompt_id).await?;
    Ok(ResponseJson(ApiResponse::success(view)))
}

pub async fn delete_prompt(
    State(state): State<AppState>,
    SellerUser(seller): SellerUser,
    Path(prompt_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    state.catalog().delete_prompt(seller.id, prompt_id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/prompts", get(search))
        .route("/prompts/{slug}", get(get_by_slug))
        .route("/prompts/{slug}/like", post(like).delete(unlike))
        .nest(
            "/seller/prompts",
            Router::new()
                .route("/", post(create_prompt).get(my_prompts))
                .route(
                    "/{prompt_id}",
                    get(get_my_prompt).put(update_prompt).delete(delete_prompt),
                )
                .route("/{prompt_id}/publish", post(publish_prompt)),
        )
}
