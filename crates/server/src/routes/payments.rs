//! Payment lifecycle: start, capture, fail.

use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::post,
};
use db::models::payment::Payment;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, auth::CurrentUser, error::ApiError};

pub async fn start_payment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(order_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Payment>>, ApiError> {
    let payment = state.checkout().start_payment(user.id, order_id).await?;
    Ok(ResponseJson(ApiResponse::success(payment)))
}

pub async fn capture_payment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(payment_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Payment>>, ApiError> {
    let payment = state.checkout().capture_payment(user.id, payment_id).await?;
    Ok(ResponseJson(ApiResponse::success(payment)))
}

pub async fn fail_payment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(payment_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Payment>>, ApiError> {
    let payment = state.checkout().fail_payment(user.id, payment_id).await?;
    Ok(ResponseJson(ApiResponse::success(payment)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders/{order_id}/payments", post(start_payment))
        .route("/payments/{payment_id}/capture", post(capture_payment))
        .route("/payments/{payment_id}/fail", post(fail_payment))
}
