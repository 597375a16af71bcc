//! Purchase library and entitlement-gated prompt delivery.

use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::{
    entitlement::{Entitlement, PurchasedPrompt},
    prompt::Prompt,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{AppState, auth::CurrentUser, error::ApiError};

/// The purchased prompt text, only handed to entitled buyers (or the seller).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct PromptDownload {
    pub prompt_id: uuid::Uuid,
    pub title: String,
    pub body: String,
}

pub async fn list_entitlements(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<ResponseJson<ApiResponse<Vec<PurchasedPrompt>>>, ApiError> {
    let purchases = Entitlement::list_for_user(&state.db().pool, user.id).await?;
    Ok(ResponseJson(ApiResponse::success(purchases)))
}

pub async fn download(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(slug): Path<String>,
) -> Result<ResponseJson<ApiResponse<PromptDownload>>, ApiError> {
    // Resolved regardless of listing status: a suspension does not take away
    // what a buyer already paid for.
    let prompt = Prompt::find_by_slug(&state.db().pool, &slug)
        .await?
        .ok_or(ApiError::NotFound)?;

    let entitled = prompt.seller_id == user.id
        || Entitlement::find_active(&state.db().pool, user.id, prompt.id)
            .await?
            .is_some();
    if !entitled {
        return Err(ApiError::Forbidden);
    }

    Ok(ResponseJson(ApiResponse::success(PromptDownload {
        prompt_id: prompt.id,
        title: prompt.title,
        body: prompt.body,
    })))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/entitlements", get(list_entitlements))
        .route("/prompts/{slug}/download", get(download))
}
