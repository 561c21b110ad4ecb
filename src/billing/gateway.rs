//! Payment gateway client.
//!
//! Production Razorpay client with retry logic, secure key handling, and
//! error mapping, behind the [`PaymentGateway`] trait so managers and
//! tests never depend on the live API.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::error::BillingError;
use crate::error::Result;

/// Default Razorpay API base URL.
const DEFAULT_BASE_URL: &str = "https://api.razorpay.com/v1";

/// Request to open a gateway order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateGatewayOrder {
    /// Amount in paise.
    pub amount_paise: i64,
    /// ISO currency code.
    pub currency: String,
    /// Merchant receipt id.
    pub receipt: String,
    /// Free-form metadata attached to the gateway order.
    pub notes: HashMap<String, String>,
}

/// A gateway order awaiting payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayOrder {
    /// Gateway order id.
    pub id: String,
    /// Amount in paise.
    pub amount_paise: i64,
    /// ISO currency code.
    pub currency: String,
}

/// Trait for payment gateway operations.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Open an order for the given amount.
    async fn create_order(&self, request: CreateGatewayOrder) -> Result<GatewayOrder>;
}

/// Configuration for the live Razorpay gateway.
#[derive(Debug, Clone)]
pub struct RazorpayGatewayConfig {
    /// Maximum number of retry attempts for transient failures.
    pub max_retries: u32,
    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,
    /// Maximum delay between retries in milliseconds.
    pub max_delay_ms: u64,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for RazorpayGatewayConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 500,
            max_delay_ms: 30_000,
            timeout_seconds: 30,
        }
    }
}

/// Error returned when key validation fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidApiKeyError {
    /// Description of why the key is invalid.
    pub reason: String,
}

impl std::fmt::Display for InvalidApiKeyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Invalid Razorpay key id: {}", self.reason)
    }
}

impl std::error::Error for InvalidApiKeyError {}

/// Validate a Razorpay key id format.
///
/// Valid formats:
/// - `rzp_test_*` - Test mode key
/// - `rzp_live_*` - Live mode key
fn validate_key_id(key_id: &str) -> std::result::Result<(), InvalidApiKeyError> {
    if key_id.is_empty() {
        return Err(InvalidApiKeyError {
            reason: "key id is empty".to_string(),
        });
    }
    if !key_id.starts_with("rzp_test_") && !key_id.starts_with("rzp_live_") {
        return Err(InvalidApiKeyError {
            reason: "expected rzp_test_ or rzp_live_ prefix".to_string(),
        });
    }
    Ok(())
}

/// Production Razorpay gateway client.
///
/// The key secret is held in a [`SecretString`] and only exposed for the
/// basic-auth header. Transient failures (429, 5xx, transport errors) are
/// retried with exponential backoff up to the configured attempt limit.
#[derive(Clone)]
pub struct RazorpayGateway {
    http: reqwest::Client,
    key_id: String,
    key_secret: SecretString,
    base_url: String,
    config: RazorpayGatewayConfig,
}

impl RazorpayGateway {
    /// Create a new gateway client with default configuration.
    pub fn new(
        key_id: impl Into<String>,
        key_secret: impl Into<SecretString>,
    ) -> std::result::Result<Self, InvalidApiKeyError> {
        Self::with_config(key_id, key_secret, RazorpayGatewayConfig::default())
    }

    /// Create a new gateway client with a custom configuration.
    pub fn with_config(
        key_id: impl Into<String>,
        key_secret: impl Into<SecretString>,
        config: RazorpayGatewayConfig,
    ) -> std::result::Result<Self, InvalidApiKeyError> {
        let key_id = key_id.into();
        validate_key_id(&key_id)?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| InvalidApiKeyError {
                reason: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            http,
            key_id,
            key_secret: key_secret.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            config,
        })
    }

    /// Override the API base URL (testing against a stub server).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        let exp = self.config.base_delay_ms.saturating_mul(1u64 << attempt.min(16));
        Duration::from_millis(exp.min(self.config.max_delay_ms))
    }
}

#[derive(Serialize)]
struct OrderRequestBody<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
    notes: &'a HashMap<String, String>,
}

#[derive(Deserialize)]
struct OrderResponseBody {
    id: String,
    amount: i64,
    currency: String,
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    async fn create_order(&self, request: CreateGatewayOrder) -> Result<GatewayOrder> {
        let url = format!("{}/orders", self.base_url);
        let body = OrderRequestBody {
            amount: request.amount_paise,
            currency: &request.currency,
            receipt: &request.receipt,
            notes: &request.notes,
        };

        let mut attempt = 0;
        loop {
            let response = self
                .http
                .post(&url)
                .basic_auth(&self.key_id, Some(self.key_secret.expose_secret()))
                .json(&body)
                .send()
                .await;

            let retryable = match &response {
                Ok(resp) => {
                    let status = resp.status();
                    status.as_u16() == 429 || status.is_server_error()
                }
                Err(_) => true,
            };

            if retryable && attempt < self.config.max_retries {
                let delay = self.backoff_delay(attempt);
                tracing::warn!(
                    target: "linkdeck::billing::gateway",
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "Transient gateway failure creating order, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            let resp = response.map_err(|e| BillingError::GatewayError {
                operation: "create_order".to_string(),
                message: e.to_string(),
                http_status: None,
            })?;

            let status = resp.status();
            if !status.is_success() {
                let message = resp.text().await.unwrap_or_default();
                return Err(BillingError::GatewayError {
                    operation: "create_order".to_string(),
                    message,
                    http_status: Some(status.as_u16()),
                }
                .into());
            }

            let parsed: OrderResponseBody =
                resp.json().await.map_err(|e| BillingError::GatewayError {
                    operation: "create_order".to_string(),
                    message: format!("malformed order response: {}", e),
                    http_status: Some(status.as_u16()),
                })?;

            return Ok(GatewayOrder {
                id: parsed.id,
                amount_paise: parsed.amount,
                currency: parsed.currency,
            });
        }
    }
}

/// Mock payment gateway for testing.
#[cfg(any(test, feature = "test-billing"))]
pub mod test {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use tokio::sync::Mutex;

    /// Mock gateway recording every order it opens.
    #[derive(Default, Clone)]
    pub struct MockPaymentGateway {
        orders: Arc<Mutex<Vec<CreateGatewayOrder>>>,
        counter: Arc<AtomicU64>,
        fail: Arc<AtomicBool>,
    }

    impl MockPaymentGateway {
        /// Create a new mock gateway.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Make subsequent `create_order` calls fail.
        pub fn set_fail(&self, fail: bool) {
            self.fail.store(fail, Ordering::SeqCst);
        }

        /// Number of orders opened.
        #[must_use]
        pub fn call_count(&self) -> u64 {
            self.counter.load(Ordering::SeqCst)
        }

        /// Recorded order requests.
        pub async fn orders(&self) -> Vec<CreateGatewayOrder> {
            self.orders.lock().await.clone()
        }
    }

    #[async_trait]
    impl PaymentGateway for MockPaymentGateway {
        async fn create_order(&self, request: CreateGatewayOrder) -> Result<GatewayOrder> {
            let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail.load(Ordering::SeqCst) {
                return Err(BillingError::GatewayError {
                    operation: "create_order".to_string(),
                    message: "mock gateway failure".to_string(),
                    http_status: Some(503),
                }
                .into());
            }
            let order = GatewayOrder {
                id: format!("order_mock_{:06}", n),
                amount_paise: request.amount_paise,
                currency: request.currency.clone(),
            };
            self.orders.lock().await.push(request);
            Ok(order)
        }
    }
}
