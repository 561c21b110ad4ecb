//! Payment verification and subscription activation.
//!
//! The gateway signs `"{order_id}|{payment_id}"` with the shared key
//! secret; verification recomputes the HMAC locally and compares in
//! constant time. Once a signature verifies, the money has moved: the
//! order-verified mark and the subscription upsert are treated as one
//! logical unit, with the subscription write retried before the failure
//! escalates to [`BillingError::ActivationFailed`].

use std::sync::Arc;
use std::time::Duration;

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::audit::{BillingAuditEvent, BillingAuditLogger};
use super::error::BillingError;
use super::plans::BillingCycle;
use super::promo::PromoResolver;
use super::storage::{OrderStatus, OrderStore, Subscription, SubscriptionStore};
use crate::error::Result;
use crate::utils::unix_now;

type HmacSha256 = Hmac<Sha256>;

/// Attempts for the subscription write after a verified payment.
const ACTIVATION_ATTEMPTS: u32 = 3;
/// Base delay between activation attempts in milliseconds.
const ACTIVATION_RETRY_DELAY_MS: u64 = 100;

/// Compute the hex payment signature for an order/payment pair.
///
/// This is what the gateway sends back after collecting payment; exposed
/// so test suites and gateway stubs can produce valid receipts.
pub fn compute_signature(secret: &str, order_id: &str, payment_id: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| {
        BillingError::Internal {
            message: "invalid HMAC key".to_string(),
        }
    })?;
    mac.update(format!("{}|{}", order_id, payment_id).as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Settlement manager: verifies returned payment receipts and activates
/// subscriptions.
#[derive(Clone)]
pub struct SettlementManager {
    orders: Arc<dyn OrderStore>,
    subscriptions: Arc<dyn SubscriptionStore>,
    promo: PromoResolver,
    audit: Arc<dyn BillingAuditLogger>,
    key_secret: SecretString,
}

impl SettlementManager {
    /// Create a new settlement manager.
    #[must_use]
    pub fn new(
        orders: Arc<dyn OrderStore>,
        subscriptions: Arc<dyn SubscriptionStore>,
        promo: PromoResolver,
        audit: Arc<dyn BillingAuditLogger>,
        key_secret: impl Into<SecretString>,
    ) -> Self {
        Self {
            orders,
            subscriptions,
            promo,
            audit,
            key_secret: key_secret.into(),
        }
    }

    /// Verify a returned payment and activate the subscription.
    ///
    /// On signature mismatch the order is marked failed, the subscription
    /// is untouched, and the caller sees only that the signature was
    /// invalid. On success the subscription row for the tenant is
    /// overwritten with the purchased plan and cycle.
    #[allow(clippy::too_many_arguments)]
    pub async fn verify_payment(
        &self,
        tenant_id: &str,
        order_id: &str,
        payment_id: &str,
        signature: &str,
        plan_id: &str,
        billing_cycle: BillingCycle,
        promo_code: Option<&str>,
    ) -> Result<Subscription> {
        if !self.signature_matches(order_id, payment_id, signature)? {
            if let Err(err) = self
                .orders
                .set_order_status(order_id, OrderStatus::Failed)
                .await
            {
                tracing::warn!(
                    target: "linkdeck::billing",
                    order_id = %order_id,
                    error = %err,
                    "Failed to mark order as failed after signature mismatch"
                );
            }
            self.audit
                .log(BillingAuditEvent::SignatureRejected {
                    tenant_id: tenant_id.to_string(),
                    order_id: order_id.to_string(),
                })
                .await;
            return Err(BillingError::SignatureInvalid.into());
        }

        let order = self
            .orders
            .get_order(order_id)
            .await?
            .filter(|o| o.tenant_id == tenant_id)
            .ok_or_else(|| BillingError::OrderNotFound {
                order_id: order_id.to_string(),
            })?;

        // Bookkeeping only; the subscription is the user-facing state
        if let Err(err) = self
            .orders
            .set_order_status(order_id, OrderStatus::Verified)
            .await
        {
            tracing::warn!(
                target: "linkdeck::billing",
                order_id = %order_id,
                error = %err,
                "Failed to mark order as verified"
            );
        }

        let subscription =
            Subscription::activated(tenant_id, plan_id, billing_cycle, unix_now());
        self.activate(&subscription, order_id).await?;

        self.audit
            .log(BillingAuditEvent::PaymentVerified {
                tenant_id: tenant_id.to_string(),
                order_id: order_id.to_string(),
                payment_id: payment_id.to_string(),
                plan_id: plan_id.to_string(),
            })
            .await;

        // At-least-once; a miss here never rolls back the activation
        if let Some(code) = promo_code
            .map(str::to_string)
            .or_else(|| order.promo_code.clone())
        {
            self.promo.consume(&code).await;
            self.audit
                .log(BillingAuditEvent::PromoConsumed {
                    tenant_id: tenant_id.to_string(),
                    code,
                })
                .await;
        }

        Ok(subscription)
    }

    /// Upsert the subscription, retrying before escalating. The payment
    /// has already settled by the time this runs.
    async fn activate(&self, subscription: &Subscription, order_id: &str) -> Result<()> {
        let mut last_err = None;
        for attempt in 0..ACTIVATION_ATTEMPTS {
            match self.subscriptions.upsert_subscription(subscription).await {
                Ok(()) => return Ok(()),
                Err(err) => {
                    tracing::warn!(
                        target: "linkdeck::billing",
                        tenant_id = %subscription.tenant_id,
                        order_id = %order_id,
                        attempt = attempt + 1,
                        error = %err,
                        "Subscription activation attempt failed"
                    );
                    last_err = Some(err);
                    if attempt + 1 < ACTIVATION_ATTEMPTS {
                        tokio::time::sleep(Duration::from_millis(
                            ACTIVATION_RETRY_DELAY_MS << attempt,
                        ))
                        .await;
                    }
                }
            }
        }

        if let Some(err) = last_err {
            tracing::error!(
                target: "linkdeck::billing",
                tenant_id = %subscription.tenant_id,
                order_id = %order_id,
                error = %err,
                "Payment verified but subscription activation failed"
            );
        }
        self.audit
            .log(BillingAuditEvent::ActivationFailed {
                tenant_id: subscription.tenant_id.clone(),
                order_id: order_id.to_string(),
            })
            .await;
        Err(BillingError::ActivationFailed {
            tenant_id: subscription.tenant_id.clone(),
            order_id: order_id.to_string(),
        }
        .into())
    }

    /// Constant-time signature comparison. Malformed hex in the supplied
    /// signature counts as a mismatch, not an error.
    fn signature_matches(
        &self,
        order_id: &str,
        payment_id: &str,
        supplied: &str,
    ) -> Result<bool> {
        let expected = compute_signature(self.key_secret.expose_secret(), order_id, payment_id)?;
        let expected_bytes = hex::decode(&expected).map_err(|_| BillingError::Internal {
            message: "hex encode roundtrip failed".to_string(),
        })?;
        let Ok(supplied_bytes) = hex::decode(supplied.trim()) else {
            return Ok(false);
        };
        Ok(expected_bytes.ct_eq(supplied_bytes.as_slice()).unwrap_u8() == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::plans::BillingCycle;
    use crate::billing::audit::TestAuditLogger;
    use crate::billing::storage::test::InMemoryBillingStore;
    use crate::billing::storage::{Order, PromoCode};

    const SECRET: &str = "test_key_secret";

    fn order(order_id: &str, tenant_id: &str, promo_code: Option<&str>) -> Order {
        Order {
            order_id: order_id.to_string(),
            tenant_id: tenant_id.to_string(),
            plan_id: "pro".to_string(),
            billing_cycle: BillingCycle::Monthly,
            promo_code: promo_code.map(str::to_string),
            amount_paise: 79_920,
            currency: "INR".to_string(),
            status: OrderStatus::Created,
            created_at: 0,
        }
    }

    fn manager(store: &InMemoryBillingStore, audit: &TestAuditLogger) -> SettlementManager {
        let arc_store = Arc::new(store.clone());
        SettlementManager::new(
            arc_store.clone(),
            arc_store.clone(),
            PromoResolver::new(arc_store),
            Arc::new(audit.clone()),
            SecretString::new(SECRET.to_string()),
        )
    }

    fn sign(order_id: &str, payment_id: &str) -> String {
        compute_signature(SECRET, order_id, payment_id).unwrap()
    }

    #[test]
    fn test_signature_is_deterministic_hex() {
        let a = sign("order_1", "pay_1");
        let b = sign("order_1", "pay_1");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, sign("order_1", "pay_2"));
    }

    #[tokio::test]
    async fn test_verified_payment_activates_subscription() {
        let store = InMemoryBillingStore::new();
        let audit = TestAuditLogger::new();
        store.save_order(&order("order_1", "tn_1", None)).await.unwrap();

        let before = unix_now();
        let sub = manager(&store, &audit)
            .verify_payment(
                "tn_1",
                "order_1",
                "pay_1",
                &sign("order_1", "pay_1"),
                "pro",
                BillingCycle::Monthly,
                None,
            )
            .await
            .unwrap();

        assert!(sub.is_active());
        assert_eq!(sub.plan_id, "pro");
        // period end ~ now + 30 days
        let expected_end = before + 30 * 86_400;
        assert!(sub.current_period_end >= expected_end);
        assert!(sub.current_period_end <= expected_end + 5);

        assert_eq!(
            store.order("order_1").unwrap().status,
            OrderStatus::Verified
        );
        let stored = store.get_subscription("tn_1").await.unwrap().unwrap();
        assert_eq!(stored, sub);
    }

    #[tokio::test]
    async fn test_yearly_period_end() {
        let store = InMemoryBillingStore::new();
        let audit = TestAuditLogger::new();
        store.save_order(&order("order_1", "tn_1", None)).await.unwrap();

        let before = unix_now();
        let sub = manager(&store, &audit)
            .verify_payment(
                "tn_1",
                "order_1",
                "pay_1",
                &sign("order_1", "pay_1"),
                "pro",
                BillingCycle::Yearly,
                None,
            )
            .await
            .unwrap();

        let expected_end = before + 365 * 86_400;
        assert!(sub.current_period_end >= expected_end);
        assert!(sub.current_period_end <= expected_end + 5);
    }

    #[tokio::test]
    async fn test_tampered_signature_leaves_state_untouched() {
        let store = InMemoryBillingStore::new();
        let audit = TestAuditLogger::new();
        store.save_order(&order("order_1", "tn_1", None)).await.unwrap();

        let mut tampered = sign("order_1", "pay_1");
        tampered.replace_range(0..2, "00");
        if tampered == sign("order_1", "pay_1") {
            tampered.replace_range(0..2, "11");
        }

        let err = manager(&store, &audit)
            .verify_payment(
                "tn_1",
                "order_1",
                "pay_1",
                &tampered,
                "pro",
                BillingCycle::Monthly,
                None,
            )
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Invalid payment signature"));
        assert!(store.get_subscription("tn_1").await.unwrap().is_none());
        assert_eq!(store.order("order_1").unwrap().status, OrderStatus::Failed);

        let events = audit.events().await;
        assert!(matches!(
            events[0],
            BillingAuditEvent::SignatureRejected { .. }
        ));
    }

    #[tokio::test]
    async fn test_malformed_signature_is_a_mismatch() {
        let store = InMemoryBillingStore::new();
        let audit = TestAuditLogger::new();
        store.save_order(&order("order_1", "tn_1", None)).await.unwrap();

        let err = manager(&store, &audit)
            .verify_payment(
                "tn_1",
                "order_1",
                "pay_1",
                "not-hex-at-all",
                "pro",
                BillingCycle::Monthly,
                None,
            )
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Invalid payment signature"));
    }

    #[tokio::test]
    async fn test_order_must_belong_to_tenant() {
        let store = InMemoryBillingStore::new();
        let audit = TestAuditLogger::new();
        store.save_order(&order("order_1", "tn_other", None)).await.unwrap();

        let err = manager(&store, &audit)
            .verify_payment(
                "tn_1",
                "order_1",
                "pay_1",
                &sign("order_1", "pay_1"),
                "pro",
                BillingCycle::Monthly,
                None,
            )
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Order not found"));
        assert!(store.get_subscription("tn_1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_activation_retries_through_transient_failures() {
        let store = InMemoryBillingStore::new();
        let audit = TestAuditLogger::new();
        store.save_order(&order("order_1", "tn_1", None)).await.unwrap();
        store.fail_next_subscription_writes(2);

        let sub = manager(&store, &audit)
            .verify_payment(
                "tn_1",
                "order_1",
                "pay_1",
                &sign("order_1", "pay_1"),
                "pro",
                BillingCycle::Monthly,
                None,
            )
            .await
            .unwrap();

        assert!(sub.is_active());
        assert!(store.get_subscription("tn_1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_persistent_activation_failure_escalates() {
        let store = InMemoryBillingStore::new();
        let audit = TestAuditLogger::new();
        store.save_order(&order("order_1", "tn_1", None)).await.unwrap();
        store.fail_next_subscription_writes(10);

        let err = manager(&store, &audit)
            .verify_payment(
                "tn_1",
                "order_1",
                "pay_1",
                &sign("order_1", "pay_1"),
                "pro",
                BillingCycle::Monthly,
                None,
            )
            .await
            .unwrap_err();

        assert!(err.to_string().contains("contact support"));
        // The order stays verified: the money moved
        assert_eq!(
            store.order("order_1").unwrap().status,
            OrderStatus::Verified
        );

        let events = audit.events().await;
        assert!(
            events
                .iter()
                .any(|e| matches!(e, BillingAuditEvent::ActivationFailed { .. }))
        );
    }

    #[tokio::test]
    async fn test_promo_consumed_after_verification() {
        let store = InMemoryBillingStore::new();
        let audit = TestAuditLogger::new();
        store.seed_promo_codes(vec![PromoCode {
            code: "SAVE20".to_string(),
            discount_percent: 20,
            expires_at: None,
            max_uses: 5,
            use_count: 0,
            is_active: true,
        }]);
        store
            .save_order(&order("order_1", "tn_1", Some("SAVE20")))
            .await
            .unwrap();

        manager(&store, &audit)
            .verify_payment(
                "tn_1",
                "order_1",
                "pay_1",
                &sign("order_1", "pay_1"),
                "pro",
                BillingCycle::Monthly,
                Some("save20"),
            )
            .await
            .unwrap();

        assert_eq!(store.promo_code("SAVE20").unwrap().use_count, 1);
        let events = audit.events().await;
        assert!(
            events
                .iter()
                .any(|e| matches!(e, BillingAuditEvent::PromoConsumed { .. }))
        );
    }
}
