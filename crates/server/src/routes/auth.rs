//! Routes for registration, login and account state.

use axum::{Router, extract::State, response::Json as ResponseJson, routing::{get, post}};
use db::models::user::User;
use serde::{Deserialize, Serialize};
use services::services::auth::AuthSession;
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{AppState, auth::CurrentUser, error::ApiError};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub async fn register(
    State(state): State<AppState>,
    axum::Json(payload): axum::Json<RegisterRequest>,
) -> Result<ResponseJson<ApiResponse<AuthSession>>, ApiError> {
    let session = state
        .auth()
        .register(&payload.email, &payload.password, &payload.display_name)
        .await?;
    Ok(ResponseJson(ApiResponse::success(session)))
}

pub async fn login(
    State(state): State<AppState>,
    axum::Json(payload): axum::Json<LoginRequest>,
) -> Result<ResponseJson<ApiResponse<AuthSession>>, ApiError> {
    let session = state.auth().login(&payload.email, &payload.password).await?;
    Ok(ResponseJson(ApiResponse::success(session)))
}

pub async fn me(CurrentUser(user): CurrentUser) -> ResponseJson<ApiResponse<User>> {
    ResponseJson(ApiResponse::success(user))
}

pub async fn become_seller(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<ResponseJson<ApiResponse<User>>, ApiError> {
    let seller = state.auth().become_seller(&user).await?;
    Ok(ResponseJson(ApiResponse::success(seller)))
}

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/auth",
        Router::new()
            .route("/register", post(register))
            .route("/login", post(login))
            .route("/me", get(me))
            .route("/become-seller", post(become_seller)),
    )
}
