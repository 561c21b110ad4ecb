//! Storage traits for billing data.
//!
//! Implement these traits to persist billing state to your database.
//! An in-memory implementation is provided for testing.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::plans::{BillingCycle, Plan};
use super::usage::UsageSnapshot;
use crate::error::Result;

/// A tenant's current subscription.
///
/// Exactly one row is current per tenant; activation overwrites the
/// previous row, rows are never merged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    /// Owning tenant.
    pub tenant_id: String,
    /// Plan identifier.
    pub plan_id: String,
    /// Billing cycle.
    pub billing_cycle: BillingCycle,
    /// Subscription status.
    pub status: SubscriptionStatus,
    /// End of the current billing period (unix seconds).
    pub current_period_end: u64,
    /// Last updated timestamp (unix seconds).
    pub updated_at: u64,
}

impl Subscription {
    /// Build an active subscription starting now, with the period end
    /// derived from the billing cycle.
    #[must_use]
    pub fn activated(
        tenant_id: impl Into<String>,
        plan_id: impl Into<String>,
        billing_cycle: BillingCycle,
        now: u64,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            plan_id: plan_id.into(),
            billing_cycle,
            status: SubscriptionStatus::Active,
            current_period_end: now + billing_cycle.period_secs(),
            updated_at: now,
        }
    }

    /// Check if the subscription is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == SubscriptionStatus::Active
    }

    /// Check if the paid period has ended.
    #[must_use]
    pub fn has_lapsed(&self, now: u64) -> bool {
        now >= self.current_period_end
    }
}

/// Subscription status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Paid and current.
    Active,
    /// Awaiting payment settlement.
    Pending,
    /// Cancelled by the tenant.
    Cancelled,
    /// Period ended without renewal.
    Expired,
}

impl SubscriptionStatus {
    /// Convert to string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Pending => "pending",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
        }
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A checkout order awaiting (or past) settlement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Gateway order id.
    pub order_id: String,
    /// Tenant that opened the checkout.
    pub tenant_id: String,
    /// Plan being purchased.
    pub plan_id: String,
    /// Billing cycle being purchased.
    pub billing_cycle: BillingCycle,
    /// Promo code applied at checkout, normalized upper-case.
    pub promo_code: Option<String>,
    /// Final amount in paise after any discount.
    pub amount_paise: i64,
    /// ISO currency code.
    pub currency: String,
    /// Order status.
    pub status: OrderStatus,
    /// Created timestamp (unix seconds).
    pub created_at: u64,
}

/// Order status. `Created` moves to `Verified` on a successful signature
/// check or to `Failed` on mismatch; there are no other transitions, and a
/// failed order is never retried in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Created,
    Verified,
    Failed,
}

impl OrderStatus {
    /// Convert to string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Verified => "verified",
            Self::Failed => "failed",
        }
    }
}

/// A promotional discount code.
///
/// Codes are stored normalized upper-case and matched case-insensitively
/// after trimming.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PromoCode {
    /// The code, normalized upper-case.
    pub code: String,
    /// Discount percentage, 0 through 100.
    pub discount_percent: u8,
    /// Expiry timestamp (unix seconds), if any.
    pub expires_at: Option<u64>,
    /// Usage cap. Zero means uncapped.
    pub max_uses: u32,
    /// Times the code has been consumed.
    pub use_count: u32,
    /// Whether the code is enabled.
    pub is_active: bool,
}

impl PromoCode {
    /// Check if the code has expired.
    #[must_use]
    pub fn is_expired(&self, now: u64) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }

    /// Check if the usage cap has been reached.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.max_uses > 0 && self.use_count >= self.max_uses
    }
}

/// Trait for storing plan data.
///
/// Write methods back the admin surface (an external collaborator); the
/// catalog only reads. Plans referenced by an active subscription are
/// immutable except for administrative correction.
#[async_trait]
pub trait PlanStore: Send + Sync {
    /// Get all active plans.
    async fn list_plans(&self) -> Result<Vec<Plan>>;

    /// Get all plans, including inactive ones.
    async fn list_all_plans(&self) -> Result<Vec<Plan>>;

    /// Get a plan by id.
    async fn get_plan(&self, plan_id: &str) -> Result<Option<Plan>>;

    /// Create a new plan.
    async fn create_plan(&self, plan: &Plan) -> Result<()>;

    /// Update an existing plan.
    async fn update_plan(&self, plan: &Plan) -> Result<()>;

    /// Activate or retire a plan.
    async fn set_plan_active(&self, plan_id: &str, is_active: bool) -> Result<()>;
}

/// Trait for storing a tenant's current subscription.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Get the current subscription for a tenant.
    async fn get_subscription(&self, tenant_id: &str) -> Result<Option<Subscription>>;

    /// Save the subscription, overwriting any prior row for the tenant.
    async fn upsert_subscription(&self, subscription: &Subscription) -> Result<()>;

    /// Delete the subscription record.
    async fn delete_subscription(&self, tenant_id: &str) -> Result<()>;
}

/// Trait for storing checkout orders.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persist a new order.
    async fn save_order(&self, order: &Order) -> Result<()>;

    /// Get an order by gateway order id.
    async fn get_order(&self, order_id: &str) -> Result<Option<Order>>;

    /// Update an order's status. Unknown ids are a no-op.
    async fn set_order_status(&self, order_id: &str, status: OrderStatus) -> Result<()>;
}

/// Trait for storing promo codes.
#[async_trait]
pub trait PromoStore: Send + Sync {
    /// Look up a code by its normalized (upper-case) form.
    async fn get_promo_code(&self, code: &str) -> Result<Option<PromoCode>>;

    /// Record one consumption of a code.
    async fn record_promo_use(&self, code: &str) -> Result<()>;
}

/// Trait for counting a tenant's resources.
///
/// Implementations must apply the counting rules: links and blocks count
/// only rows flagged active; pages and socials count unconditionally;
/// team members count only members whose status is not `deactivated`.
/// Read-only, side-effect free.
#[async_trait]
pub trait UsageSource: Send + Sync {
    /// Count the tenant's resources at query time.
    async fn count_usage(&self, tenant_id: &str) -> Result<UsageSnapshot>;
}

/// In-memory billing store for testing.
#[cfg(any(test, feature = "test-billing"))]
pub mod test {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, RwLock};

    use crate::error::LinkdeckError;

    /// In-memory billing store for testing.
    ///
    /// Implements every storage trait. Wraps data in Arc for cheap cloning.
    #[derive(Default, Clone)]
    pub struct InMemoryBillingStore {
        inner: Arc<Inner>,
    }

    #[derive(Default)]
    struct Inner {
        plans: RwLock<HashMap<String, Plan>>,
        subscriptions: RwLock<HashMap<String, Subscription>>,
        orders: RwLock<HashMap<String, Order>>,
        promo_codes: RwLock<HashMap<String, PromoCode>>,
        resources: RwLock<HashMap<String, TenantResources>>,
        subscription_write_failures: AtomicU32,
    }

    #[derive(Default)]
    struct TenantResources {
        /// Active flag per link.
        links: Vec<bool>,
        /// Active flag per block.
        blocks: Vec<bool>,
        pages: u64,
        socials: u64,
        /// Status per team member.
        member_statuses: Vec<String>,
    }

    impl InMemoryBillingStore {
        /// Create a new in-memory store.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Seed plans, validating each first.
        ///
        /// # Panics
        ///
        /// Panics if a seeded plan fails validation.
        pub fn seed_plans(&self, plans: Vec<Plan>) {
            let mut store = self.inner.plans.write().unwrap();
            for plan in plans {
                plan.validate().expect("seeded plan must be valid");
                store.insert(plan.id.clone(), plan);
            }
        }

        /// Seed promo codes.
        pub fn seed_promo_codes(&self, codes: Vec<PromoCode>) {
            let mut store = self.inner.promo_codes.write().unwrap();
            for code in codes {
                store.insert(code.code.clone(), code);
            }
        }

        /// Add a link row for a tenant.
        pub fn add_link(&self, tenant_id: &str, active: bool) {
            self.with_resources(tenant_id, |r| r.links.push(active));
        }

        /// Add a page row for a tenant.
        pub fn add_page(&self, tenant_id: &str) {
            self.with_resources(tenant_id, |r| r.pages += 1);
        }

        /// Add a block row for a tenant.
        pub fn add_block(&self, tenant_id: &str, active: bool) {
            self.with_resources(tenant_id, |r| r.blocks.push(active));
        }

        /// Add a social icon row for a tenant.
        pub fn add_social(&self, tenant_id: &str) {
            self.with_resources(tenant_id, |r| r.socials += 1);
        }

        /// Add a team member with the given status.
        pub fn add_team_member(&self, tenant_id: &str, status: &str) {
            self.with_resources(tenant_id, |r| r.member_statuses.push(status.to_string()));
        }

        /// Make the next `n` subscription writes fail.
        pub fn fail_next_subscription_writes(&self, n: u32) {
            self.inner
                .subscription_write_failures
                .store(n, Ordering::SeqCst);
        }

        /// Get an order by id (for assertions).
        #[must_use]
        pub fn order(&self, order_id: &str) -> Option<Order> {
            self.inner.orders.read().unwrap().get(order_id).cloned()
        }

        /// Get a promo code by normalized form (for assertions).
        #[must_use]
        pub fn promo_code(&self, code: &str) -> Option<PromoCode> {
            self.inner.promo_codes.read().unwrap().get(code).cloned()
        }

        fn with_resources(&self, tenant_id: &str, f: impl FnOnce(&mut TenantResources)) {
            let mut resources = self.inner.resources.write().unwrap();
            f(resources.entry(tenant_id.to_string()).or_default());
        }
    }

    #[async_trait]
    impl PlanStore for InMemoryBillingStore {
        async fn list_plans(&self) -> Result<Vec<Plan>> {
            let plans = self.inner.plans.read().unwrap();
            Ok(plans.values().filter(|p| p.is_active).cloned().collect())
        }

        async fn list_all_plans(&self) -> Result<Vec<Plan>> {
            Ok(self.inner.plans.read().unwrap().values().cloned().collect())
        }

        async fn get_plan(&self, plan_id: &str) -> Result<Option<Plan>> {
            Ok(self.inner.plans.read().unwrap().get(plan_id).cloned())
        }

        async fn create_plan(&self, plan: &Plan) -> Result<()> {
            plan.validate().map_err(LinkdeckError::bad_request)?;
            self.inner
                .plans
                .write()
                .unwrap()
                .insert(plan.id.clone(), plan.clone());
            Ok(())
        }

        async fn update_plan(&self, plan: &Plan) -> Result<()> {
            plan.validate().map_err(LinkdeckError::bad_request)?;
            let mut plans = self.inner.plans.write().unwrap();
            if plans.contains_key(&plan.id) {
                plans.insert(plan.id.clone(), plan.clone());
            }
            Ok(())
        }

        async fn set_plan_active(&self, plan_id: &str, is_active: bool) -> Result<()> {
            let mut plans = self.inner.plans.write().unwrap();
            if let Some(plan) = plans.get_mut(plan_id) {
                plan.is_active = is_active;
            }
            Ok(())
        }
    }

    #[async_trait]
    impl SubscriptionStore for InMemoryBillingStore {
        async fn get_subscription(&self, tenant_id: &str) -> Result<Option<Subscription>> {
            Ok(self
                .inner
                .subscriptions
                .read()
                .unwrap()
                .get(tenant_id)
                .cloned())
        }

        async fn upsert_subscription(&self, subscription: &Subscription) -> Result<()> {
            let failures = &self.inner.subscription_write_failures;
            if failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(LinkdeckError::internal("injected subscription write failure"));
            }
            self.inner
                .subscriptions
                .write()
                .unwrap()
                .insert(subscription.tenant_id.clone(), subscription.clone());
            Ok(())
        }

        async fn delete_subscription(&self, tenant_id: &str) -> Result<()> {
            self.inner.subscriptions.write().unwrap().remove(tenant_id);
            Ok(())
        }
    }

    #[async_trait]
    impl OrderStore for InMemoryBillingStore {
        async fn save_order(&self, order: &Order) -> Result<()> {
            self.inner
                .orders
                .write()
                .unwrap()
                .insert(order.order_id.clone(), order.clone());
            Ok(())
        }

        async fn get_order(&self, order_id: &str) -> Result<Option<Order>> {
            Ok(self.inner.orders.read().unwrap().get(order_id).cloned())
        }

        async fn set_order_status(&self, order_id: &str, status: OrderStatus) -> Result<()> {
            let mut orders = self.inner.orders.write().unwrap();
            if let Some(order) = orders.get_mut(order_id) {
                order.status = status;
            }
            Ok(())
        }
    }

    #[async_trait]
    impl PromoStore for InMemoryBillingStore {
        async fn get_promo_code(&self, code: &str) -> Result<Option<PromoCode>> {
            Ok(self.inner.promo_codes.read().unwrap().get(code).cloned())
        }

        async fn record_promo_use(&self, code: &str) -> Result<()> {
            let mut codes = self.inner.promo_codes.write().unwrap();
            match codes.get_mut(code) {
                Some(promo) => {
                    promo.use_count += 1;
                    Ok(())
                }
                None => Err(LinkdeckError::internal(format!(
                    "promo code not found: {}",
                    code
                ))),
            }
        }
    }

    #[async_trait]
    impl UsageSource for InMemoryBillingStore {
        async fn count_usage(&self, tenant_id: &str) -> Result<UsageSnapshot> {
            let resources = self.inner.resources.read().unwrap();
            let Some(r) = resources.get(tenant_id) else {
                return Ok(UsageSnapshot::default());
            };
            Ok(UsageSnapshot {
                links: r.links.iter().filter(|active| **active).count() as u64,
                pages: r.pages,
                blocks: r.blocks.iter().filter(|active| **active).count() as u64,
                socials: r.socials,
                team_members: r
                    .member_statuses
                    .iter()
                    .filter(|status| status.as_str() != "deactivated")
                    .count() as u64,
            })
        }
    }
}
