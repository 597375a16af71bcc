//! Admin console: moderation, payout queue, refunds and the audit log.

use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::{
    admin_action::AdminAction,
    category::Category,
    payment::Payment,
    payout::{Payout, PayoutStatus},
    user::User,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utils::{
    pagination::{PageQuery, Paged},
    response::ApiResponse,
};
use uuid::Uuid;

use crate::{AppState, auth::AdminUser, error::ApiError};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct NoteRequest {
    pub note: Option<String>,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct PayoutQueueQuery {
    pub status: Option<PayoutStatus>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateCategoryRequest {
    pub name: String,
}

pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(page): Query<PageQuery>,
) -> Result<ResponseJson<ApiResponse<Paged<User>>>, ApiError> {
    let users = state.moderation().list_users(&page).await?;
    Ok(ResponseJson(ApiResponse::success(users)))
}

pub async fn ban_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(user_id): Path<Uuid>,
    axum::Json(payload): axum::Json<NoteRequest>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    state
        .moderation()
        .ban_user(admin.id, user_id, payload.note.as_deref())
        .await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn unban_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(user_id): Path<Uuid>,
    axum::Json(payload): axum::Json<NoteRequest>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    state
        .moderation()
        .unban_user(admin.id, user_id, payload.note.as_deref())
        .await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn suspend_prompt(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(prompt_id): Path<Uuid>,
    axum::Json(payload): axum::Json<NoteRequest>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    state
        .moderation()
        .suspend_prompt(admin.id, prompt_id, payload.note.as_deref())
        .await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn restore_prompt(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(prompt_id): Path<Uuid>,
    axum::Json(payload): axum::Json<NoteRequest>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    state
        .moderation()
        .restore_prompt(admin.id, prompt_id, payload.note.as_deref())
        .await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn payout_queue(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(query): Query<PayoutQueueQuery>,
) -> Result<ResponseJson<ApiResponse<Paged<Payout>>>, ApiError> {
    let page = PageQuery {
        page: query.page,
        per_page: query.per_page,
    };
    let status = query.status.unwrap_or(PayoutStatus::Requested);
    let payouts = state.payouts().list_by_status(status, &page).await?;
    Ok(ResponseJson(ApiResponse::success(payouts)))
}

pub async fn approve_payout(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(payout_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Payout>>, ApiError> {
    let payout = state.payouts().approve(admin.id, payout_id).await?;
    Ok(ResponseJson(ApiResponse::success(payout)))
}

pub async fn complete_payout(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(payout_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Payout>>, ApiError> {
    let payout = state.payouts().complete(admin.id, payout_id).await?;
    Ok(ResponseJson(ApiResponse::success(payout)))
}

pub async fn reject_payout(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(payout_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Payout>>, ApiError> {
    let payout = state.payouts().reject(admin.id, payout_id).await?;
    Ok(ResponseJson(ApiResponse::success(payout)))
}

pub async fn refund_payment(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(payment_id): Path<Uuid>,
    axum::Json(payload): axum::Json<NoteRequest>,
) -> Result<ResponseJson<ApiResponse<Payment>>, ApiError> {
    let payment = state
        .checkout()
        .refund_payment(admin.id, payment_id, payload.note.as_deref())
        .await?;
    Ok(ResponseJson(ApiResponse::success(payment)))
}

pub async fn audit_log(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(page): Query<PageQuery>,
) -> Result<ResponseJson<ApiResponse<Paged<AdminAction>>>, ApiError> {
    let actions = state.moderation().audit_log(&page).await?;
    Ok(ResponseJson(ApiResponse::success(actions)))
}

pub async fn create_category(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    axum::Json(payload): axum::Json<CreateCategoryRequest>,
) -> Result<ResponseJson<ApiResponse<Category>>, ApiError> {
    let category = state.catalog().create_category(&payload.name).await?;
    Ok(ResponseJson(ApiResponse::success(category)))
}

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/admin",
        Router::new()
            .route("/users", get(list_users))
            .route("/users/{user_id}/ban", post(ban_user))
            .route("/users/{user_id}/unban", post(unban_user))
            .route("/prompts/{prompt_id}/suspend", post(suspend_prompt))
            .route("/prompts/{prompt_id}/restore", post(restore_prompt))
            .route("/payouts", get(payout_queue))
            .route("/payouts/{payout_id}/approve", post(approve_payout))
            .route("/payouts/{payout_id}/complete", post(complete_payout))
            .route("/payouts/{payout_id}/reject", post(reject_payout))
            .route("/payments/{payment_id}/refund", post(refund_payment))
            .route("/actions", get(audit_log))
            .route("/categories", post(create_category)),
    )
}
