//! Environment-driven configuration for the server and services.

use tracing::warn;

const DEFAULT_JWT_SECRET: &str = "dev-secret-change-me";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub payment_provider_url: String,
    pub payment_provider_secret: Option<String>,
    pub min_payout_cents: i64,
    pub balance_audit_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        let jwt_secret = match std::env::var("JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ => {
                warn!("JWT_SECRET not set, using an insecure development secret");
                DEFAULT_JWT_SECRET.to_string()
            }
        };

        let payment_provider_secret = std::env::var("PAYMENT_PROVIDER_SECRET").ok();
        if payment_provider_secret.is_none() {
            warn!("PAYMENT_PROVIDER_SECRET not set - payment capture will fail");
        }

        Self {
            database_url: env_or("DATABASE_URL", "sqlite:promptec.db"),
            bind_addr: env_or("BIND_ADDR", "127.0.0.1:3001"),
            jwt_secret,
            token_ttl_hours: env_parsed("TOKEN_TTL_HOURS", 24),
            payment_provider_url: env_or("PAYMENT_PROVIDER_URL", "https://api.payments.example/v1"),
            payment_provider_secret,
            min_payout_cents: env_parsed("MIN_PAYOUT_CENTS", 1000),
            balance_audit_interval_secs: env_parsed("BALANCE_AUDIT_INTERVAL_SECS", 300),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parsed<T: std::str::FromStr + Copy>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, "unparseable env var, using default");
            default
        }),
        Err(_) => default,
    }
}
