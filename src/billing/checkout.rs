//! Checkout order creation.
//!
//! Computes the order amount from plan, cycle and promo discount, then
//! opens a gateway order. Zero-amount checkouts (free plans, 100%
//! discounts) never touch the gateway: the subscription activates
//! directly.

use std::collections::HashMap;
use std::sync::Arc;

use super::audit::{BillingAuditEvent, BillingAuditLogger};
use super::gateway::{CreateGatewayOrder, PaymentGateway};
use super::plans::{BillingCycle, PlanCatalog};
use super::promo::{PromoResolver, apply_discount};
use super::storage::{Order, OrderStatus, OrderStore, Subscription, SubscriptionStore};
use crate::config::BillingConfig;
use crate::error::Result;
use crate::utils::unix_now;

/// Outcome of creating a checkout order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderOutcome {
    /// Nothing to collect; the subscription is already active.
    Free { subscription: Subscription },
    /// A gateway order awaits payment. The subscription is untouched until
    /// the payment verifies.
    Pending {
        order_id: String,
        amount_paise: i64,
        currency: String,
        key_id: String,
    },
}

/// Checkout manager.
#[derive(Clone)]
pub struct CheckoutManager {
    catalog: PlanCatalog,
    promo: PromoResolver,
    gateway: Arc<dyn PaymentGateway>,
    orders: Arc<dyn OrderStore>,
    subscriptions: Arc<dyn SubscriptionStore>,
    audit: Arc<dyn BillingAuditLogger>,
    config: BillingConfig,
}

impl CheckoutManager {
    /// Create a new checkout manager.
    #[must_use]
    pub fn new(
        catalog: PlanCatalog,
        promo: PromoResolver,
        gateway: Arc<dyn PaymentGateway>,
        orders: Arc<dyn OrderStore>,
        subscriptions: Arc<dyn SubscriptionStore>,
        audit: Arc<dyn BillingAuditLogger>,
        config: BillingConfig,
    ) -> Self {
        Self {
            catalog,
            promo,
            gateway,
            orders,
            subscriptions,
            audit,
            config,
        }
    }

    /// Create an order for a plan upgrade.
    ///
    /// An invalid promo code aborts the checkout; it is never silently
    /// ignored.
    pub async fn create_order(
        &self,
        tenant_id: &str,
        plan_id: &str,
        billing_cycle: BillingCycle,
        promo_code: Option<&str>,
    ) -> Result<OrderOutcome> {
        let plan = self.catalog.get_purchasable(plan_id).await?;
        let base_paise = plan.price_paise(billing_cycle);

        let discount = match promo_code {
            Some(code) => Some(self.promo.validate(code).await?),
            None => None,
        };
        let amount_paise = match &discount {
            Some(d) => apply_discount(base_paise, d.discount_percent),
            None => base_paise,
        };

        let now = unix_now();

        if amount_paise == 0 {
            let subscription =
                Subscription::activated(tenant_id, plan.id.as_str(), billing_cycle, now);
            self.subscriptions.upsert_subscription(&subscription).await?;
            self.audit
                .log(BillingAuditEvent::FreeUpgradeActivated {
                    tenant_id: tenant_id.to_string(),
                    plan_id: plan.id.clone(),
                })
                .await;
            return Ok(OrderOutcome::Free { subscription });
        }

        let receipt = format!("rcpt_{}", uuid::Uuid::new_v4().simple());
        let mut notes = HashMap::new();
        notes.insert("tenant_id".to_string(), tenant_id.to_string());
        notes.insert("plan_id".to_string(), plan.id.clone());
        notes.insert("billing_cycle".to_string(), billing_cycle.to_string());

        let gateway_order = self
            .gateway
            .create_order(CreateGatewayOrder {
                amount_paise,
                currency: self.config.currency.clone(),
                receipt,
                notes,
            })
            .await?;

        let order = Order {
            order_id: gateway_order.id.clone(),
            tenant_id: tenant_id.to_string(),
            plan_id: plan.id.clone(),
            billing_cycle,
            promo_code: discount.map(|d| d.code),
            amount_paise,
            currency: gateway_order.currency.clone(),
            status: OrderStatus::Created,
            created_at: now,
        };
        self.orders.save_order(&order).await?;

        self.audit
            .log(BillingAuditEvent::OrderCreated {
                tenant_id: tenant_id.to_string(),
                plan_id: plan.id,
                order_id: gateway_order.id.clone(),
                amount_paise,
            })
            .await;

        Ok(OrderOutcome::Pending {
            order_id: gateway_order.id,
            amount_paise,
            currency: gateway_order.currency,
            key_id: self.config.key_id.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::audit::TestAuditLogger;
    use crate::billing::gateway::test::MockPaymentGateway;
    use crate::billing::plans::Plan;
    use crate::billing::storage::test::InMemoryBillingStore;
    use crate::billing::storage::{PromoCode, SubscriptionStatus};
    use secrecy::SecretString;

    fn plan(id: &str, monthly_paise: i64) -> Plan {
        Plan {
            id: id.to_string(),
            name: format!("{} Plan", id),
            description: None,
            monthly_price_paise: monthly_paise,
            yearly_price_paise: monthly_paise * 10,
            max_links: 999,
            max_pages: 99,
            max_blocks: 999,
            max_socials: 99,
            max_team_members: 99,
            qr_code_enabled: true,
            analytics_enabled: true,
            custom_templates_enabled: true,
            is_active: true,
            is_featured: false,
            sort_order: 0,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn billing_config() -> BillingConfig {
        BillingConfig {
            key_id: "rzp_test_abc".to_string(),
            key_secret: SecretString::new("secret".to_string()),
            currency: "INR".to_string(),
        }
    }

    struct Fixture {
        manager: CheckoutManager,
        store: InMemoryBillingStore,
        gateway: MockPaymentGateway,
        audit: TestAuditLogger,
    }

    fn fixture(plans: Vec<Plan>, codes: Vec<PromoCode>) -> Fixture {
        let store = InMemoryBillingStore::new();
        store.seed_plans(plans);
        store.seed_promo_codes(codes);

        let gateway = MockPaymentGateway::new();
        let audit = TestAuditLogger::new();
        let arc_store = Arc::new(store.clone());

        let manager = CheckoutManager::new(
            PlanCatalog::new(arc_store.clone()),
            PromoResolver::new(arc_store.clone()),
            Arc::new(gateway.clone()),
            arc_store.clone(),
            arc_store,
            Arc::new(audit.clone()),
            billing_config(),
        );

        Fixture {
            manager,
            store,
            gateway,
            audit,
        }
    }

    #[tokio::test]
    async fn test_discounted_order_amount() {
        let f = fixture(
            vec![plan("pro", 99_900)],
            vec![PromoCode {
                code: "SAVE20".to_string(),
                discount_percent: 20,
                expires_at: None,
                max_uses: 0,
                use_count: 0,
                is_active: true,
            }],
        );

        let outcome = f
            .manager
            .create_order("tn_1", "pro", BillingCycle::Monthly, Some("save20"))
            .await
            .unwrap();

        match outcome {
            OrderOutcome::Pending {
                order_id,
                amount_paise,
                currency,
                key_id,
            } => {
                assert_eq!(amount_paise, 79_920);
                assert_eq!(currency, "INR");
                assert_eq!(key_id, "rzp_test_abc");

                let order = f.store.order(&order_id).unwrap();
                assert_eq!(order.status, OrderStatus::Created);
                assert_eq!(order.promo_code.as_deref(), Some("SAVE20"));
                assert_eq!(order.amount_paise, 79_920);
            }
            OrderOutcome::Free { .. } => panic!("expected a pending order"),
        }

        // Validation at checkout never consumes the code
        assert_eq!(f.store.promo_code("SAVE20").unwrap().use_count, 0);
    }

    #[tokio::test]
    async fn test_free_plan_skips_gateway() {
        let f = fixture(vec![plan("free", 0)], vec![]);

        let outcome = f
            .manager
            .create_order("tn_1", "free", BillingCycle::Monthly, None)
            .await
            .unwrap();

        match outcome {
            OrderOutcome::Free { subscription } => {
                assert_eq!(subscription.status, SubscriptionStatus::Active);
                assert_eq!(subscription.plan_id, "free");
            }
            OrderOutcome::Pending { .. } => panic!("expected a free activation"),
        }

        assert_eq!(f.gateway.call_count(), 0);
        let stored = f.store.get_subscription("tn_1").await.unwrap().unwrap();
        assert!(stored.is_active());
    }

    #[tokio::test]
    async fn test_fully_discounted_order_skips_gateway() {
        let f = fixture(
            vec![plan("pro", 99_900)],
            vec![PromoCode {
                code: "FREEBIE".to_string(),
                discount_percent: 100,
                expires_at: None,
                max_uses: 1,
                use_count: 0,
                is_active: true,
            }],
        );

        let outcome = f
            .manager
            .create_order("tn_1", "pro", BillingCycle::Yearly, Some("freebie"))
            .await
            .unwrap();

        assert!(matches!(outcome, OrderOutcome::Free { .. }));
        assert_eq!(f.gateway.call_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_promo_aborts_checkout() {
        let f = fixture(vec![plan("pro", 99_900)], vec![]);

        let err = f
            .manager
            .create_order("tn_1", "pro", BillingCycle::Monthly, Some("NOPE"))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Invalid promo code"));
        assert_eq!(f.gateway.call_count(), 0);
        assert!(f.store.get_subscription("tn_1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_or_inactive_plan() {
        let mut retired = plan("legacy", 49_900);
        retired.is_active = false;
        let f = fixture(vec![retired], vec![]);

        assert!(
            f.manager
                .create_order("tn_1", "missing", BillingCycle::Monthly, None)
                .await
                .is_err()
        );
        assert!(
            f.manager
                .create_order("tn_1", "legacy", BillingCycle::Monthly, None)
                .await
                .is_err()
        );
        assert_eq!(f.gateway.call_count(), 0);
    }

    #[tokio::test]
    async fn test_yearly_cycle_uses_yearly_price() {
        let f = fixture(vec![plan("pro", 99_900)], vec![]);

        let outcome = f
            .manager
            .create_order("tn_1", "pro", BillingCycle::Yearly, None)
            .await
            .unwrap();

        match outcome {
            OrderOutcome::Pending { amount_paise, .. } => assert_eq!(amount_paise, 999_000),
            OrderOutcome::Free { .. } => panic!("expected a pending order"),
        }

        let events = f.audit.events().await;
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            BillingAuditEvent::OrderCreated { amount_paise: 999_000, .. }
        ));
    }
}
