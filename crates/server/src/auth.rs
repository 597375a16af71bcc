//! Request extractors for authentication and cart identity.

use axum::{extract::FromRequestParts, http::header, http::request::Parts};
use db::models::user::{User, UserRole};
use services::services::cart::CartOwner;

use crate::{AppState, error::ApiError};

const CART_KEY_HEADER: &str = "x-cart-key";

/// Any authenticated, non-banned account.
pub struct CurrentUser(pub User);

/// Seller or admin account.
pub struct SellerUser(pub User);

/// Admin account.
pub struct AdminUser(pub User);

/// Either an authenticated user or an anonymous cookie-held cart key.
pub struct CartIdentity(pub CartOwner);

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(ApiError::Unauthorized)?;
        let user = state.auth().authenticate(token).await?;
        Ok(CurrentUser(user))
    }
}

impl FromRequestParts<AppState> for SellerUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        match user.role {
            UserRole::Seller | UserRole::Admin => Ok(SellerUser(user)),
            UserRole::User => Err(ApiError::Forbidden),
        }
    }
}

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if user.role != UserRole::Admin {
            return Err(ApiError::Forbidden);
        }
        Ok(AdminUser(user))
    }
}

impl FromRequestParts<AppState> for CartIdentity {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if bearer_token(parts).is_some() {
            let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
            return Ok(CartIdentity(CartOwner::User(user.id)));
        }

        let key = parts
            .headers
            .get(CART_KEY_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(ApiError::Unauthorized)?;

        Ok(CartIdentity(CartOwner::Anonymous(key.to_string())))
    }
}
