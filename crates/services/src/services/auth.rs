//! Account registration, login and bearer-token verification.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use db::{
    DBService,
    models::user::{User, UserRole},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("email already registered")]
    EmailTaken,
    #[error("invalid email address")]
    InvalidEmail,
    #[error("password must be at least 8 characters")]
    WeakPassword,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("account is banned")]
    Banned,
    #[error("invalid or expired token")]
    InvalidToken,
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error("already a seller")]
    AlreadySeller,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: UserRole,
    pub iat: i64,
    pub exp: i64,
}

/// Login/registration result returned to the client.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct AuthSession {
    pub token: String,
    pub user: User,
}

#[derive(Clone)]
pub struct AuthService {
    db: DBService,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_ttl: Duration,
}

impl AuthService {
    pub fn new(db: DBService, jwt_secret: &str, token_ttl_hours: i64) -> Self {
        Self {
            db,
            encoding_key: EncodingKey::from_secret(jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
            token_ttl: Duration::hours(token_ttl_hours),
        }
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<AuthSession, AuthError> {
        let email = email.trim().to_ascii_lowercase();
        if !email.contains('@') || email.len() < 3 {
            return Err(AuthError::InvalidEmail);
        }
        if password.len() < 8 {
            return Err(AuthError::WeakPassword);
        }
        if User::find_by_email(&self.db.pool, &email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let password_hash = hash_password(password)?;
        let user = User::create(
            &self.db.pool,
            Uuid::new_v4(),
            &email,
            &password_hash,
            display_name.trim(),
        )
        .await?;

        info!(user_id = %user.id, "registered new account");

        let token = self.issue_token(&user)?;
        Ok(AuthSession { token, user })
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let email = email.trim().to_ascii_lowercase();
        let user = User::find_by_email(&self.db.pool, &email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash) {
            return Err(AuthError::InvalidCredentials);
        }
        if user.banned {
            return Err(AuthError::Banned);
        }

        let token = self.issue_token(&user)?;
        Ok(AuthSession { token, user })
    }

    /// Resolve a bearer token to its (non-banned) user.
    pub async fn authenticate(&self, token: &str) -> Result<User, AuthError> {
        let claims = self.verify_token(token)?;
        let user = User::find_by_id(&self.db.pool, claims.sub)
            .await?
            .ok_or(AuthError::InvalidToken)?;
        if user.banned {
            return Err(AuthError::Banned);
        }
        Ok(user)
    }

    /// Upgrade a plain account to seller.
    pub async fn become_seller(&self, user: &User) -> Result<User, AuthError> {
        if user.role != UserRole::User {
            return Err(AuthError::AlreadySeller);
        }
        User::set_role(&self.db.pool, user.id, UserRole::Seller).await?;
        User::find_by_id(&self.db.pool, user.id)
            .await?
            .ok_or(AuthError::InvalidToken)
    }

    pub fn issue_token(&self, user: &User) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id,
            role: user.role,
            iat: now.timestamp(),
            exp: (now + self.token_ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|_| AuthError::InvalidToken)
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|_| AuthError::InvalidToken)
    }
}

fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hash(e.to_string()))
}

fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_db;

    fn auth(db: DBService) -> AuthService {
        AuthService::new(db, "test-secret", 1)
    }

    #[tokio::test]
    async fn test_register_and_login() {
        let db = test_db().await;
        let auth = auth(db);

        let session = auth
            .register("Buyer@Example.com", "hunter2hunter2", "Buyer")
            .await
            .unwrap();
        assert_eq!(session.user.email, "buyer@example.com");
        assert_eq!(session.user.role, UserRole::User);

        let session = auth.login("buyer@example.com", "hunter2hunter2").await.unwrap();
        let user = auth.authenticate(&session.token).await.unwrap();
        assert_eq!(user.id, session.user.id);
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let db = test_db().await;
        let auth = auth(db);

        auth.register("a@b.com", "longenough", "A").await.unwrap();
        assert!(matches!(
            auth.register("a@b.com", "longenough", "A2").await,
            Err(AuthError::EmailTaken)
        ));
    }

    #[tokio::test]
    async fn test_wrong_password_rejected() {
        let db = test_db().await;
        let auth = auth(db);

        auth.register("a@b.com", "longenough", "A").await.unwrap();
        assert!(matches!(
            auth.login("a@b.com", "wrong-password").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_banned_user_cannot_login_or_authenticate() {
        let db = test_db().await;
        let auth = auth(db.clone());

        let session = auth.register("a@b.com", "longenough", "A").await.unwrap();
        User::set_banned(&db.pool, session.user.id, true).await.unwrap();

        assert!(matches!(
            auth.login("a@b.com", "longenough").await,
            Err(AuthError::Banned)
        ));
        assert!(matches!(
            auth.authenticate(&session.token).await,
            Err(AuthError::Banned)
        ));
    }

    #[tokio::test]
    async fn test_become_seller() {
        let db = test_db().await;
        let auth = auth(db);

        let session = auth.register("s@b.com", "longenough", "S").await.unwrap();
        let seller = auth.become_seller(&session.user).await.unwrap();
        assert_eq!(seller.role, UserRole::Seller);
        assert!(matches!(
            auth.become_seller(&seller).await,
            Err(AuthError::AlreadySeller)
        ));
    }
}
