//! Cart routes for both authenticated users and anonymous visitors.

use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use services::services::cart::CartView;
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{
    AppState,
    auth::{CartIdentity, CurrentUser},
    error::ApiError,
};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct AddItemRequest {
    pub prompt_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct MergeCartRequest {
    pub cart_key: String,
}

pub async fn get_cart(
    State(state): State<AppState>,
    CartIdentity(owner): CartIdentity,
) -> Result<ResponseJson<ApiResponse<CartView>>, ApiError> {
    let view = state.cart().get_cart(&owner).await?;
    Ok(ResponseJson(ApiResponse::success(view)))
}

pub async fn add_item(
    State(state): State<AppState>,
    CartIdentity(owner): CartIdentity,
    axum::Json(payload): axum::Json<AddItemRequest>,
) -> Result<ResponseJson<ApiResponse<CartView>>, ApiError> {
    let view = state.cart().add_item(&owner, payload.prompt_id).await?;
    Ok(ResponseJson(ApiResponse::success(view)))
}

pub async fn remove_item(
    State(state): State<AppState>,
    CartIdentity(owner): CartIdentity,
    Path(prompt_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<CartView>>, ApiError> {
    let view = state.cart().remove_item(&owner, prompt_id).await?;
    Ok(ResponseJson(ApiResponse::success(view)))
}

/// Fold the visitor's anonymous cart into their account cart after login.
pub async fn merge(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    axum::Json(payload): axum::Json<MergeCartRequest>,
) -> Result<ResponseJson<ApiResponse<CartView>>, ApiError> {
    let view = state.cart().merge_into_user(&payload.cart_key, user.id).await?;
    Ok(ResponseJson(ApiResponse::success(view)))
}

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/cart",
        Router::new()
            .route("/", get(get_cart))
            .route("/items", post(add_item))
            .route("/items/{prompt_id}", axum::routing::delete(remove_item))
            .route("/merge", post(merge)),
    )
}
