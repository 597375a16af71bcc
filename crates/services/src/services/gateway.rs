//! HTTP client for the hosted card-payment provider.

use std::time::Duration;

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("timeout")]
    Timeout,
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("rate limited")]
    RateLimited,
    #[error("invalid provider credentials")]
    InvalidSecret,
    #[error("missing provider credentials: PAYMENT_PROVIDER_SECRET not set")]
    MissingSecret,
    #[error("json error: {0}")]
    Serde(String),
}

impl GatewayError {
    /// Returns true if the error is transient and should be retried.
    pub fn should_retry(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout | Self::RateLimited => true,
            Self::Http { status, .. } => (500..=599).contains(status),
            _ => false,
        }
    }
}

/// A provider-side payment intent for an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub provider_ref: String,
    /// Handed to the client so the hosted card form can confirm the intent.
    pub client_secret: Option<String>,
}

/// Result of confirming an intent. A decline is a normal outcome, not a
/// transport error, and is never retried.
#[derive(Debug, Clone, PartialEq)]
pub enum ChargeOutcome {
    Captured,
    Declined(String),
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_intent(
        &self,
        amount_cents: i64,
        currency: &str,
        reference: &str,
    ) -> Result<PaymentIntent, GatewayError>;

    async fn confirm_intent(&self, provider_ref: &str) -> Result<ChargeOutcome, GatewayError>;

    async fn refund_charge(&self, provider_ref: &str) -> Result<(), GatewayError>;
}

#[derive(Debug, Serialize)]
struct CreateIntentRequest<'a> {
    amount: i64,
    currency: &'a str,
    reference: &'a str,
}

#[derive(Debug, Deserialize)]
struct IntentResponse {
    id: String,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChargeResponse {
    status: String,
    #[serde(default)]
    decline_reason: Option<String>,
}

fn charge_outcome(response: ChargeResponse) -> ChargeOutcome {
    match response.status.as_str() {
        "succeeded" | "captured" => ChargeOutcome::Captured,
        _ => ChargeOutcome::Declined(
            response
                .decline_reason
                .unwrap_or_else(|| response.status.clone()),
        ),
    }
}

/// Card provider client over its REST API. The secret is checked per call so
/// the server can boot without one configured; capture then fails cleanly.
#[derive(Debug, Clone)]
pub struct HttpPaymentGateway {
    http: Client,
    base_url: String,
    secret_key: Option<String>,
}

impl HttpPaymentGateway {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(base_url: String, secret_key: Option<String>) -> Result<Self, GatewayError> {
        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .user_agent(concat!("promptec/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            secret_key,
        })
    }

    async fn post_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, GatewayError> {
        let secret_key = self.secret_key.as_ref().ok_or(GatewayError::MissingSecret)?;
        let res = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(secret_key)
            .json(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        match res.status() {
            s if s.is_success() => res
                .json::<T>()
                .await
                .map_err(|e| GatewayError::Serde(e.to_string())),
            StatusCode::UNAUTHORIZED => Err(GatewayError::InvalidSecret),
            StatusCode::TOO_MANY_REQUESTS => Err(GatewayError::RateLimited),
            s => {
                let status = s.as_u16();
                let body = res.text().await.unwrap_or_default();
                Err(GatewayError::Http { status, body })
            }
        }
    }

    async fn post_with_retry<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T, GatewayError> {
        (|| async { self.post_json(path, &body).await })
            .retry(
                &ExponentialBuilder::default()
                    .with_min_delay(Duration::from_millis(250))
                    .with_max_delay(Duration::from_secs(10))
                    .with_max_times(3)
                    .with_jitter(),
            )
            .when(|e: &GatewayError| e.should_retry())
            .notify(|e, dur| {
                warn!(
                    "payment provider call failed, retrying after {:.2}s: {}",
                    dur.as_secs_f64(),
                    e
                )
            })
            .await
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn create_intent(
        &self,
        amount_cents: i64,
        currency: &str,
        reference: &str,
    ) -> Result<PaymentIntent, GatewayError> {
        let body = serde_json::to_value(CreateIntentRequest {
            amount: amount_cents,
            currency,
            reference,
        })
        .map_err(|e| GatewayError::Serde(e.to_string()))?;

        let response: IntentResponse = self.post_with_retry("/payment_intents", body).await?;
        Ok(PaymentIntent {
            provider_ref: response.id,
            client_secret: response.client_secret,
        })
    }

    async fn confirm_intent(&self, provider_ref: &str) -> Result<ChargeOutcome, GatewayError> {
        let response: ChargeResponse = self
            .post_with_retry(
                &format!("/payment_intents/{provider_ref}/confirm"),
                serde_json::json!({}),
            )
            .await?;
        Ok(charge_outcome(response))
    }

    async fn refund_charge(&self, provider_ref: &str) -> Result<(), GatewayError> {
        let _: ChargeResponse = self
            .post_with_retry(
                &format!("/payment_intents/{provider_ref}/refund"),
                serde_json::json!({}),
            )
            .await?;
        Ok(())
    }
}

fn map_reqwest_error(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Timeout
    } else {
        GatewayError::Transport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_charge_outcome_captured() {
        let outcome = charge_outcome(ChargeResponse {
            status: "succeeded".to_string(),
            decline_reason: None,
        });
        assert_eq!(outcome, ChargeOutcome::Captured);
    }

    #[test]
    fn test_charge_outcome_declined_with_reason() {
        let outcome = charge_outcome(ChargeResponse {
            status: "declined".to_string(),
            decline_reason: Some("insufficient_funds".to_string()),
        });
        assert_eq!(outcome, ChargeOutcome::Declined("insufficient_funds".to_string()));
    }

    #[test]
    fn test_charge_outcome_unknown_status_is_declined() {
        let outcome = charge_outcome(ChargeResponse {
            status: "requires_action".to_string(),
            decline_reason: None,
        });
        assert_eq!(outcome, ChargeOutcome::Declined("requires_action".to_string()));
    }

    #[test]
    fn test_should_retry() {
        assert!(GatewayError::Timeout.should_retry());
        assert!(GatewayError::RateLimited.should_retry());
        assert!(
            GatewayError::Http {
                status: 503,
                body: String::new()
            }
            .should_retry()
        );
        assert!(
            !GatewayError::Http {
                status: 402,
                body: String::new()
            }
            .should_retry()
        );
        assert!(!GatewayError::InvalidSecret.should_retry());
    }
}
