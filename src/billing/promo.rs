//! Promo code validation and discount application.
//!
//! Validation is idempotent and never consumes a code; consumption happens
//! only after a verified payment. A code discounts the computed order
//! amount multiplicatively and never stacks with another code.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::error::BillingError;
use super::storage::PromoStore;
use crate::error::Result;
use crate::utils::unix_now;

/// A validated discount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoDiscount {
    /// The code, normalized upper-case.
    pub code: String,
    /// Discount percentage, 0 through 100.
    pub discount_percent: u8,
}

/// Normalize a user-supplied code for lookup: trim, then upper-case.
#[must_use]
pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Apply a percentage discount to an amount in paise, rounding to the
/// minor unit half-up.
#[must_use]
pub fn apply_discount(amount_paise: i64, discount_percent: u8) -> i64 {
    let percent = i64::from(discount_percent.min(100));
    (amount_paise * (100 - percent) + 50) / 100
}

/// Promo code resolver over a [`PromoStore`].
#[derive(Clone)]
pub struct PromoResolver {
    store: Arc<dyn PromoStore>,
}

impl PromoResolver {
    /// Create a new resolver over a promo store.
    #[must_use]
    pub fn new(store: Arc<dyn PromoStore>) -> Self {
        Self { store }
    }

    /// Validate a code and return its discount.
    ///
    /// Fails with [`BillingError::InvalidPromoCode`] when the code does not
    /// exist, is disabled, has expired, or is exhausted. The reason is
    /// deliberately not distinguished. Repeated validation never changes
    /// the code's remaining uses.
    pub async fn validate(&self, raw_code: &str) -> Result<PromoDiscount> {
        let code = normalize_code(raw_code);
        if code.is_empty() {
            return Err(BillingError::InvalidPromoCode.into());
        }

        let promo = self
            .store
            .get_promo_code(&code)
            .await?
            .ok_or(BillingError::InvalidPromoCode)?;

        if !promo.is_active || promo.is_expired(unix_now()) || promo.is_exhausted() {
            return Err(BillingError::InvalidPromoCode.into());
        }

        Ok(PromoDiscount {
            code: promo.code,
            discount_percent: promo.discount_percent,
        })
    }

    /// Record one consumption of a code after a verified payment.
    ///
    /// At-least-once: a failure here is logged and swallowed so it can
    /// never roll back a subscription activation that already happened.
    pub async fn consume(&self, raw_code: &str) {
        let code = normalize_code(raw_code);
        if let Err(err) = self.store.record_promo_use(&code).await {
            tracing::warn!(
                target: "linkdeck::billing",
                code = %code,
                error = %err,
                "Failed to record promo code use"
            );
        }
    }
}
