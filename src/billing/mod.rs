//! Plan entitlements and Razorpay-based subscription settlement.
//!
//! Decides what a tenant may create under their plan and moves tenants
//! between plans when a payment settles.
//!
//! # Example
//!
//! ```rust,ignore
//! use linkdeck::billing::{Action, CheckoutManager, EntitlementsManager, OrderOutcome};
//!
//! // Gate a resource creation
//! let decision = entitlements.check(&tenant_id, Action::AddLink).await;
//! if !decision.allowed {
//!     return Err(LinkdeckError::forbidden(decision.message.unwrap_or_default()));
//! }
//!
//! // Start an upgrade
//! match checkout.create_order(&tenant_id, "pro", BillingCycle::Monthly, Some("SAVE20")).await? {
//!     OrderOutcome::Free { subscription } => { /* already active */ }
//!     OrderOutcome::Pending { order_id, amount_paise, .. } => {
//!         // hand order_id to the Razorpay widget, verify on return
//!     }
//! }
//! ```

pub mod audit;
pub mod checkout;
pub mod entitlements;
pub mod error;
pub mod gateway;
pub mod plans;
pub mod promo;
pub mod settlement;
pub mod storage;
pub mod usage;

// Plan exports
pub use plans::{BillingCycle, Plan, PlanCatalog, Resource};

// Storage exports
pub use storage::{
    Order, OrderStatus, OrderStore, PlanStore, PromoCode, PromoStore, Subscription,
    SubscriptionStatus, SubscriptionStore, UsageSource,
};

// Usage exports
pub use usage::{UsageCounter, UsageSnapshot};

// Entitlements exports
pub use entitlements::{
    Action, Decision, EntitlementsManager, LimitsDisplay, PlanLimits, PlanLimitsSummary,
    can_perform,
};

// Promo exports
pub use promo::{PromoDiscount, PromoResolver, apply_discount, normalize_code};

// Gateway exports
pub use gateway::{
    CreateGatewayOrder, GatewayOrder, InvalidApiKeyError, PaymentGateway, RazorpayGateway,
    RazorpayGatewayConfig,
};

// Checkout exports
pub use checkout::{CheckoutManager, OrderOutcome};

// Settlement exports
pub use settlement::{SettlementManager, compute_signature};

// Audit exports
pub use audit::{BillingAuditEvent, BillingAuditLogger, NoOpAuditLogger, TracingAuditLogger};

// Error exports
pub use error::BillingError;

// Test exports
#[cfg(any(test, feature = "test-billing"))]
pub use storage::test::InMemoryBillingStore;

#[cfg(any(test, feature = "test-billing"))]
pub use gateway::test::MockPaymentGateway;

#[cfg(any(test, feature = "test-billing"))]
pub use audit::TestAuditLogger;
