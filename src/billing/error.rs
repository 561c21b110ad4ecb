//! Billing-specific error types.
//!
//! Granular errors for entitlement and settlement operations. Entitlement
//! denial is not an error: it is a normal [`Decision`](super::entitlements::Decision)
//! with `allowed = false`.

use std::fmt;

/// Billing-specific errors.
///
/// These carry more context than generic errors and convert to
/// [`LinkdeckError`](crate::error::LinkdeckError) for HTTP responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingError {
    /// The plan is absent, or retired where a purchasable plan is required.
    PlanNotFound { plan_id: String },
    /// The order does not exist.
    OrderNotFound { order_id: String },
    /// The promo code does not exist, is inactive, expired, or exhausted.
    /// Deliberately opaque: the resolver reports pass/fail only.
    InvalidPromoCode,
    /// The payment signature did not match. Deliberately opaque; the
    /// message must not reveal why verification failed.
    SignatureInvalid,
    /// The payment gateway returned an error.
    GatewayError {
        operation: String,
        message: String,
        http_status: Option<u16>,
    },
    /// Payment settled but the subscription write kept failing. Money has
    /// moved; highest severity, always logged, never swallowed.
    ActivationFailed { tenant_id: String, order_id: String },
    /// An unexpected internal error occurred.
    Internal { message: String },
}

impl fmt::Display for BillingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PlanNotFound { plan_id } => {
                write!(f, "Plan not found: {}", plan_id)
            }
            Self::OrderNotFound { order_id } => {
                write!(f, "Order not found: {}", order_id)
            }
            Self::InvalidPromoCode => {
                write!(f, "Invalid promo code")
            }
            Self::SignatureInvalid => {
                write!(f, "Invalid payment signature")
            }
            Self::GatewayError {
                operation,
                message,
                http_status,
            } => {
                write!(f, "Payment gateway error during '{}': {}", operation, message)?;
                if let Some(status) = http_status {
                    write!(f, " [HTTP {}]", status)?;
                }
                Ok(())
            }
            Self::ActivationFailed {
                tenant_id,
                order_id,
            } => {
                write!(
                    f,
                    "Payment verified but activation failed for '{}' (order {}). Please contact support.",
                    tenant_id, order_id
                )
            }
            Self::Internal { message } => {
                write!(f, "Internal billing error: {}", message)
            }
        }
    }
}

impl std::error::Error for BillingError {}

impl From<BillingError> for crate::error::LinkdeckError {
    fn from(err: BillingError) -> Self {
        match &err {
            // Client-caused: the HTTP contract maps these to 400
            BillingError::PlanNotFound { .. }
            | BillingError::OrderNotFound { .. }
            | BillingError::InvalidPromoCode
            | BillingError::SignatureInvalid => {
                crate::error::LinkdeckError::BadRequest(err.to_string())
            }

            // Server-side faults
            BillingError::GatewayError { .. } | BillingError::Internal { .. } => {
                crate::error::LinkdeckError::Internal(err.to_string())
            }

            // Money moved, state write failed: 500 with support guidance
            BillingError::ActivationFailed { .. } => {
                crate::error::LinkdeckError::Internal(err.to_string())
            }
        }
    }
}

impl BillingError {
    /// Check if this is a client error (4xx).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::PlanNotFound { .. }
                | Self::OrderNotFound { .. }
                | Self::InvalidPromoCode
                | Self::SignatureInvalid
        )
    }

    /// Check if this is a server error (5xx).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        !self.is_client_error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BillingError::PlanNotFound {
            plan_id: "pro".to_string(),
        };
        assert_eq!(err.to_string(), "Plan not found: pro");

        // Opaque by design
        assert_eq!(
            BillingError::SignatureInvalid.to_string(),
            "Invalid payment signature"
        );
        assert_eq!(
            BillingError::InvalidPromoCode.to_string(),
            "Invalid promo code"
        );
    }

    #[test]
    fn test_error_classification() {
        assert!(BillingError::InvalidPromoCode.is_client_error());
        assert!(BillingError::SignatureInvalid.is_client_error());
        assert!(
            BillingError::ActivationFailed {
                tenant_id: "tn_1".to_string(),
                order_id: "order_1".to_string(),
            }
            .is_server_error()
        );
    }

    #[test]
    fn test_convert_to_linkdeck_error() {
        let err: crate::error::LinkdeckError = BillingError::SignatureInvalid.into();
        assert!(matches!(err, crate::error::LinkdeckError::BadRequest(_)));

        let err: crate::error::LinkdeckError = BillingError::ActivationFailed {
            tenant_id: "tn_1".to_string(),
            order_id: "order_1".to_string(),
        }
        .into();
        assert!(matches!(err, crate::error::LinkdeckError::Internal(_)));
    }
}
