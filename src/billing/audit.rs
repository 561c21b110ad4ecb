//! Audit logging for settlement operations.
//!
//! Trait-based so deployments can route events to their own sink. The
//! settlement path must never be silent: signature rejections and
//! activation failures in particular always reach the audit log.

use std::fmt;

use async_trait::async_trait;

/// Audit event types for the settlement lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingAuditEvent {
    /// Gateway order opened.
    OrderCreated {
        tenant_id: String,
        plan_id: String,
        order_id: String,
        amount_paise: i64,
    },
    /// Zero-amount checkout activated without touching the gateway.
    FreeUpgradeActivated { tenant_id: String, plan_id: String },
    /// Payment signature verified and subscription activated.
    PaymentVerified {
        tenant_id: String,
        order_id: String,
        payment_id: String,
        plan_id: String,
    },
    /// Payment signature rejected.
    SignatureRejected { tenant_id: String, order_id: String },
    /// Payment verified but the subscription write kept failing.
    ActivationFailed { tenant_id: String, order_id: String },
    /// Promo code consumed.
    PromoConsumed { tenant_id: String, code: String },
}

impl fmt::Display for BillingAuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OrderCreated {
                tenant_id,
                plan_id,
                order_id,
                amount_paise,
            } => {
                write!(
                    f,
                    "Order created: tenant={}, plan={}, order={}, amount={}",
                    tenant_id, plan_id, order_id, amount_paise
                )
            }
            Self::FreeUpgradeActivated { tenant_id, plan_id } => {
                write!(f, "Free upgrade activated: tenant={}, plan={}", tenant_id, plan_id)
            }
            Self::PaymentVerified {
                tenant_id,
                order_id,
                payment_id,
                plan_id,
            } => {
                write!(
                    f,
                    "Payment verified: tenant={}, order={}, payment={}, plan={}",
                    tenant_id, order_id, payment_id, plan_id
                )
            }
            Self::SignatureRejected {
                tenant_id,
                order_id,
            } => {
                write!(f, "Signature rejected: tenant={}, order={}", tenant_id, order_id)
            }
            Self::ActivationFailed {
                tenant_id,
                order_id,
            } => {
                write!(f, "Activation failed: tenant={}, order={}", tenant_id, order_id)
            }
            Self::PromoConsumed { tenant_id, code } => {
                write!(f, "Promo consumed: tenant={}, code={}", tenant_id, code)
            }
        }
    }
}

/// Trait for audit logging backends.
///
/// Implementations should handle failures gracefully to avoid disrupting
/// settlement operations.
#[async_trait]
pub trait BillingAuditLogger: Send + Sync {
    /// Log a billing audit event.
    async fn log(&self, event: BillingAuditEvent);
}

/// No-op audit logger that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpAuditLogger;

#[async_trait]
impl BillingAuditLogger for NoOpAuditLogger {
    async fn log(&self, _event: BillingAuditEvent) {
        // No-op
    }
}

/// Tracing-based audit logger.
///
/// Signature rejections log at WARN, activation failures at ERROR,
/// everything else at INFO.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditLogger;

#[async_trait]
impl BillingAuditLogger for TracingAuditLogger {
    async fn log(&self, event: BillingAuditEvent) {
        let kind = event_kind(&event);
        match &event {
            BillingAuditEvent::ActivationFailed { .. } => {
                tracing::error!(target: "linkdeck::billing::audit", event_type = %kind, "{}", event);
            }
            BillingAuditEvent::SignatureRejected { .. } => {
                tracing::warn!(target: "linkdeck::billing::audit", event_type = %kind, "{}", event);
            }
            _ => {
                tracing::info!(target: "linkdeck::billing::audit", event_type = %kind, "{}", event);
            }
        }
    }
}

/// Get the event kind as a string for structured logging.
fn event_kind(event: &BillingAuditEvent) -> &'static str {
    match event {
        BillingAuditEvent::OrderCreated { .. } => "order_created",
        BillingAuditEvent::FreeUpgradeActivated { .. } => "free_upgrade_activated",
        BillingAuditEvent::PaymentVerified { .. } => "payment_verified",
        BillingAuditEvent::SignatureRejected { .. } => "signature_rejected",
        BillingAuditEvent::ActivationFailed { .. } => "activation_failed",
        BillingAuditEvent::PromoConsumed { .. } => "promo_consumed",
    }
}

/// Test audit logger that captures events.
#[cfg(any(test, feature = "test-billing"))]
#[derive(Default, Clone)]
pub struct TestAuditLogger {
    events: std::sync::Arc<tokio::sync::Mutex<Vec<BillingAuditEvent>>>,
}

#[cfg(any(test, feature = "test-billing"))]
impl TestAuditLogger {
    /// Create a new capturing logger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the captured events.
    pub async fn events(&self) -> Vec<BillingAuditEvent> {
        self.events.lock().await.clone()
    }
}

#[cfg(any(test, feature = "test-billing"))]
#[async_trait]
impl BillingAuditLogger for TestAuditLogger {
    async fn log(&self, event: BillingAuditEvent) {
        self.events.lock().await.push(event);
    }
}
