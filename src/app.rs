//! Application context for dependency injection and shared state.

use std::sync::Arc;

use crate::billing::audit::{BillingAuditLogger, TracingAuditLogger};
use crate::billing::checkout::CheckoutManager;
use crate::billing::entitlements::EntitlementsManager;
use crate::billing::gateway::PaymentGateway;
use crate::billing::plans::PlanCatalog;
use crate::billing::promo::PromoResolver;
use crate::billing::settlement::SettlementManager;
use crate::billing::storage::{
    OrderStore, PlanStore, PromoStore, SubscriptionStore, UsageSource,
};
use crate::billing::usage::UsageCounter;
use crate::config::BillingConfig;
use crate::error::{LinkdeckError, Result};

/// Application context holding the billing managers and shared stores.
///
/// Built once at startup and cloned into every handler via axum state.
#[derive(Clone)]
pub struct AppContext {
    pub catalog: PlanCatalog,
    pub entitlements: EntitlementsManager,
    pub promo: PromoResolver,
    pub checkout: CheckoutManager,
    pub settlement: SettlementManager,
    pub subscriptions: Arc<dyn SubscriptionStore>,
}

impl AppContext {
    /// Builder pattern for constructing AppContext
    #[must_use]
    pub fn builder() -> AppContextBuilder {
        AppContextBuilder::new()
    }
}

/// Builder for [`AppContext`].
#[derive(Default)]
pub struct AppContextBuilder {
    plans: Option<Arc<dyn PlanStore>>,
    subscriptions: Option<Arc<dyn SubscriptionStore>>,
    orders: Option<Arc<dyn OrderStore>>,
    promo_codes: Option<Arc<dyn PromoStore>>,
    usage: Option<Arc<dyn UsageSource>>,
    gateway: Option<Arc<dyn PaymentGateway>>,
    audit: Option<Arc<dyn BillingAuditLogger>>,
    billing: Option<BillingConfig>,
}

impl AppContextBuilder {
    /// Create a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use one store object for every storage concern.
    #[must_use]
    pub fn with_store<T>(mut self, store: Arc<T>) -> Self
    where
        T: PlanStore + SubscriptionStore + OrderStore + PromoStore + UsageSource + 'static,
    {
        self.plans = Some(store.clone());
        self.subscriptions = Some(store.clone());
        self.orders = Some(store.clone());
        self.promo_codes = Some(store.clone());
        self.usage = Some(store);
        self
    }

    /// Set the plan store.
    #[must_use]
    pub fn with_plan_store(mut self, store: Arc<dyn PlanStore>) -> Self {
        self.plans = Some(store);
        self
    }

    /// Set the subscription store.
    #[must_use]
    pub fn with_subscription_store(mut self, store: Arc<dyn SubscriptionStore>) -> Self {
        self.subscriptions = Some(store);
        self
    }

    /// Set the order store.
    #[must_use]
    pub fn with_order_store(mut self, store: Arc<dyn OrderStore>) -> Self {
        self.orders = Some(store);
        self
    }

    /// Set the promo code store.
    #[must_use]
    pub fn with_promo_store(mut self, store: Arc<dyn PromoStore>) -> Self {
        self.promo_codes = Some(store);
        self
    }

    /// Set the usage source.
    #[must_use]
    pub fn with_usage_source(mut self, source: Arc<dyn UsageSource>) -> Self {
        self.usage = Some(source);
        self
    }

    /// Set the payment gateway.
    #[must_use]
    pub fn with_gateway(mut self, gateway: Arc<dyn PaymentGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    /// Set the audit logger. Defaults to [`TracingAuditLogger`].
    #[must_use]
    pub fn with_audit_logger(mut self, audit: Arc<dyn BillingAuditLogger>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Set the billing configuration.
    #[must_use]
    pub fn with_billing_config(mut self, config: BillingConfig) -> Self {
        self.billing = Some(config);
        self
    }

    /// Build the context, wiring the managers.
    pub fn build(self) -> Result<AppContext> {
        let plans = self
            .plans
            .ok_or_else(|| LinkdeckError::internal("plan store not configured"))?;
        let subscriptions = self
            .subscriptions
            .ok_or_else(|| LinkdeckError::internal("subscription store not configured"))?;
        let orders = self
            .orders
            .ok_or_else(|| LinkdeckError::internal("order store not configured"))?;
        let promo_codes = self
            .promo_codes
            .ok_or_else(|| LinkdeckError::internal("promo store not configured"))?;
        let usage = self
            .usage
            .ok_or_else(|| LinkdeckError::internal("usage source not configured"))?;
        let gateway = self
            .gateway
            .ok_or_else(|| LinkdeckError::internal("payment gateway not configured"))?;
        let billing = self
            .billing
            .ok_or_else(|| LinkdeckError::internal("billing config not configured"))?;
        let audit = self.audit.unwrap_or_else(|| Arc::new(TracingAuditLogger));

        let catalog = PlanCatalog::new(plans);
        let promo = PromoResolver::new(promo_codes);
        let entitlements = EntitlementsManager::new(
            subscriptions.clone(),
            catalog.clone(),
            UsageCounter::new(usage),
        );
        let checkout = CheckoutManager::new(
            catalog.clone(),
            promo.clone(),
            gateway,
            orders.clone(),
            subscriptions.clone(),
            audit.clone(),
            billing.clone(),
        );
        let settlement = SettlementManager::new(
            orders,
            subscriptions.clone(),
            promo.clone(),
            audit,
            billing.key_secret.clone(),
        );

        Ok(AppContext {
            catalog,
            entitlements,
            promo,
            checkout,
            settlement,
            subscriptions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::gateway::test::MockPaymentGateway;
    use crate::billing::storage::test::InMemoryBillingStore;
    use secrecy::SecretString;

    #[test]
    fn test_builder_requires_every_dependency() {
        assert!(AppContextBuilder::new().build().is_err());

        let built = AppContextBuilder::new()
            .with_store(Arc::new(InMemoryBillingStore::new()))
            .with_gateway(Arc::new(MockPaymentGateway::new()))
            .with_billing_config(BillingConfig {
                key_id: "rzp_test_abc".to_string(),
                key_secret: SecretString::new("secret".to_string()),
                currency: "INR".to_string(),
            })
            .build();
        assert!(built.is_ok());
    }
}
