//! Maps service errors onto HTTP statuses and stable machine codes.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use services::services::{
    auth::AuthError, cart::CartError, catalog::CatalogError, checkout::CheckoutError,
    gateway::GatewayError, moderation::ModerationError, payout::PayoutError, review::ReviewError,
};
use thiserror::Error;
use tracing::error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Cart(#[from] CartError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Checkout(#[from] CheckoutError),
    #[error(transparent)]
    Payout(#[from] PayoutError),
    #[error(transparent)]
    Review(#[from] ReviewError),
    #[error(transparent)]
    Moderation(#[from] ModerationError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("authentication required")]
    Unauthorized,
    #[error("forbidden")]
    Forbidden,
    #[error("not found")]
    NotFound,
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Auth(e) => match e {
                AuthError::EmailTaken => (StatusCode::CONFLICT, "email_taken"),
                AuthError::InvalidEmail => (StatusCode::BAD_REQUEST, "invalid_email"),
                AuthError::WeakPassword => (StatusCode::BAD_REQUEST, "weak_password"),
                AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "invalid_credentials"),
                AuthError::Banned => (StatusCode::FORBIDDEN, "banned"),
                AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token"),
                AuthError::AlreadySeller => (StatusCode::CONFLICT, "already_seller"),
                AuthError::Hash(_) | AuthError::Database(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "internal")
                }
            },
            Self::Cart(e) => match e {
                CartError::PromptUnavailable => (StatusCode::NOT_FOUND, "prompt_unavailable"),
                CartError::OwnPrompt => (StatusCode::BAD_REQUEST, "own_prompt"),
                CartError::AlreadyOwned => (StatusCode::CONFLICT, "already_owned"),
                CartError::AlreadyInCart => (StatusCode::CONFLICT, "already_in_cart"),
                CartError::NotInCart => (StatusCode::NOT_FOUND, "not_in_cart"),
                CartError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
            },
            Self::Catalog(e) => match e {
                CatalogError::NotFound => (StatusCode::NOT_FOUND, "prompt_not_found"),
                CatalogError::NotOwner => (StatusCode::FORBIDDEN, "not_owner"),
                CatalogError::InvalidPrice => (StatusCode::BAD_REQUEST, "invalid_price"),
                CatalogError::NotPublishable(_) => (StatusCode::BAD_REQUEST, "not_publishable"),
                CatalogError::UnknownCategory => (StatusCode::BAD_REQUEST, "unknown_category"),
                CatalogError::CategoryExists => (StatusCode::CONFLICT, "category_exists"),
                CatalogError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
            },
            Self::Checkout(e) => match e {
                CheckoutError::EmptyCart => (StatusCode::BAD_REQUEST, "empty_cart"),
                CheckoutError::PromptUnavailable(_) => {
                    (StatusCode::CONFLICT, "prompt_unavailable")
                }
                CheckoutError::OwnPrompt(_) => (StatusCode::BAD_REQUEST, "own_prompt"),
                CheckoutError::AlreadyOwned(_) => (StatusCode::CONFLICT, "already_owned"),
                CheckoutError::OrderNotFound => (StatusCode::NOT_FOUND, "order_not_found"),
                CheckoutError::NotOrderOwner => (StatusCode::FORBIDDEN, "not_order_owner"),
                CheckoutError::OrderNotPending => (StatusCode::CONFLICT, "order_not_pending"),
                CheckoutError::PaymentNotFound => (StatusCode::NOT_FOUND, "payment_not_found"),
                CheckoutError::PaymentInFlight => (StatusCode::CONFLICT, "payment_in_flight"),
                CheckoutError::PaymentNotPending => (StatusCode::CONFLICT, "payment_not_pending"),
                CheckoutError::AlreadyCaptured => (StatusCode::CONFLICT, "already_captured"),
                CheckoutError::PaymentNotCaptured => {
                    (StatusCode::CONFLICT, "payment_not_captured")
                }
                CheckoutError::Declined(_) => (StatusCode::PAYMENT_REQUIRED, "payment_declined"),
                CheckoutError::Gateway(g) => match g {
                    GatewayError::MissingSecret | GatewayError::InvalidSecret => {
                        (StatusCode::INTERNAL_SERVER_ERROR, "gateway_misconfigured")
                    }
                    _ => (StatusCode::BAD_GATEWAY, "gateway_error"),
                },
                CheckoutError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
            },
            Self::Payout(e) => match e {
                PayoutError::BelowMinimum(_) => (StatusCode::BAD_REQUEST, "below_minimum"),
                PayoutError::InsufficientBalance { .. } => {
                    (StatusCode::BAD_REQUEST, "insufficient_balance")
                }
                PayoutError::PayoutNotFound => (StatusCode::NOT_FOUND, "payout_not_found"),
                PayoutError::InvalidState => (StatusCode::CONFLICT, "invalid_payout_state"),
                PayoutError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
            },
            Self::Review(e) => match e {
                ReviewError::PromptNotFound => (StatusCode::NOT_FOUND, "prompt_not_found"),
                ReviewError::InvalidRating => (StatusCode::BAD_REQUEST, "invalid_rating"),
                ReviewError::NotEntitled => (StatusCode::FORBIDDEN, "not_entitled"),
                ReviewError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
            },
            Self::Moderation(e) => match e {
                ModerationError::UserNotFound => (StatusCode::NOT_FOUND, "user_not_found"),
                ModerationError::PromptNotFound => (StatusCode::NOT_FOUND, "prompt_not_found"),
                ModerationError::NotSuspended => (StatusCode::CONFLICT, "not_suspended"),
                ModerationError::NotPublished => (StatusCode::CONFLICT, "not_published"),
                ModerationError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
            },
            Self::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            Self::Forbidden => (StatusCode::FORBIDDEN, "forbidden"),
            Self::NotFound => (StatusCode::NOT_FOUND, "not_found"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            error!(error = %self, code = code, "request failed");
        }
        let body = ApiResponse::<()>::error(code, self.to_string());
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_mapping() {
        let (status, code) = ApiError::Checkout(CheckoutError::EmptyCart).status_and_code();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(code, "empty_cart");

        let (status, _) = ApiError::Checkout(CheckoutError::AlreadyCaptured).status_and_code();
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, code) =
            ApiError::Checkout(CheckoutError::Declined("card_declined".into())).status_and_code();
        assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
        assert_eq!(code, "payment_declined");

        let (status, _) = ApiError::Forbidden.status_and_code();
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}
