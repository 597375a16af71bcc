//! Seller balance and payout requests.

use axum::{
    Router,
    extract::State,
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::{balance::SellerBalance, payout::Payout};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{AppState, auth::SellerUser, error::ApiError};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct PayoutRequest {
    pub amount_cents: i64,
}

pub async fn balance(
    State(state): State<AppState>,
    SellerUser(seller): SellerUser,
) -> Result<ResponseJson<ApiResponse<SellerBalance>>, ApiError> {
    let balance = state.payouts().balance(seller.id).await?;
    Ok(ResponseJson(ApiResponse::success(balance)))
}

pub async fn request_payout(
    State(state): State<AppState>,
    SellerUser(seller): SellerUser,
    axum::Json(payload): axum::Json<PayoutRequest>,
) -> Result<ResponseJson<ApiResponse<Payout>>, ApiError> {
    let payout = state.payouts().request(seller.id, payload.amount_cents).await?;
    Ok(ResponseJson(ApiResponse::success(payout)))
}

pub async fn list_payouts(
    State(state): State<AppState>,
    SellerUser(seller): SellerUser,
) -> Result<ResponseJson<ApiResponse<Vec<Payout>>>, ApiError> {
    let payouts = state.payouts().list_mine(seller.id).await?;
    Ok(ResponseJson(ApiResponse::success(payouts)))
}

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/seller",
        Router::new()
            .route("/balance", get(balance))
            .route("/payouts", post(request_payout).get(list_payouts)),
    )
}
