//! Categories and tag autocomplete.

use axum::{
    Router,
    extract::{Query, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::{category::Category, tag::Tag};
use serde::Deserialize;
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError};

#[derive(Debug, Clone, Deserialize, TS)]
pub struct AutocompleteQuery {
    pub q: String,
}

pub async fn categories(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<Category>>>, ApiError> {
    let categories = state.catalog().categories().await?;
    Ok(ResponseJson(ApiResponse::success(categories)))
}

pub async fn autocomplete_tags(
    State(state): State<AppState>,
    Query(query): Query<AutocompleteQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<Tag>>>, ApiError> {
    let tags = state.catalog().autocomplete_tags(&query.q).await?;
    Ok(ResponseJson(ApiResponse::success(tags)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/categories", get(categories))
        .route("/tags/autocomplete", get(autocomplete_tags))
}
