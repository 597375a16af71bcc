//! Order creation and history.

use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::order::{Order, OrderWithItems};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, auth::CurrentUser, error::ApiError};

pub async fn create_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<ResponseJson<ApiResponse<OrderWithItems>>, ApiError> {
    let order = state.checkout().create_order(user.id).await?;
    Ok(ResponseJson(ApiResponse::success(order)))
}

pub async fn list_orders(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<ResponseJson<ApiResponse<Vec<Order>>>, ApiError> {
    let orders = state.checkout().list_orders(user.id).await?;
    Ok(ResponseJson(ApiResponse::success(orders)))
}

pub async fn get_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(order_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<OrderWithItems>>, ApiError> {
    let order = state.checkout().get_order(user.id, order_id).await?;
    Ok(ResponseJson(ApiResponse::success(order)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", post(create_order).get(list_orders))
        .route("/orders/{order_id}", get(get_order))
}
