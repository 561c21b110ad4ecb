//! Plan definitions and the plan catalog.
//!
//! Plans are closed, typed records: numeric resource limits and boolean
//! feature flags, validated when written. Prices are INR minor units
//! (paise) per billing cycle.
//!
//! # Example
//!
//! ```rust,ignore
//! use linkdeck::billing::{Plan, PlanCatalog};
//!
//! let catalog = PlanCatalog::new(store);
//!
//! // Pricing page: active plans, cheapest first
//! let plans = catalog.list_active().await?;
//!
//! // Grandfathered tenants can still resolve a retired plan
//! let legacy = catalog.get("starter-2023").await?;
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::error::BillingError;
use super::storage::PlanStore;
use crate::error::Result;

/// Limits at or above the sentinel are treated as unlimited for display.
/// Links and blocks use the high sentinel, pages, socials and team members
/// the low one.
const UNLIMITED_HIGH: u64 = 999;
const UNLIMITED_LOW: u64 = 99;

/// A subscription plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    /// Plan identifier (e.g., "free", "pro").
    pub id: String,
    /// Display name shown to users.
    pub name: String,
    /// Description of the plan.
    #[serde(default)]
    pub description: Option<String>,
    /// Monthly price in paise.
    pub monthly_price_paise: i64,
    /// Yearly price in paise.
    pub yearly_price_paise: i64,
    /// Maximum number of links.
    pub max_links: u64,
    /// Maximum number of pages.
    pub max_pages: u64,
    /// Maximum number of content blocks.
    pub max_blocks: u64,
    /// Maximum number of social icons.
    pub max_socials: u64,
    /// Maximum number of team members.
    pub max_team_members: u64,
    /// Whether QR codes are available.
    pub qr_code_enabled: bool,
    /// Whether analytics are available.
    pub analytics_enabled: bool,
    /// Whether custom templates are available.
    pub custom_templates_enabled: bool,
    /// Whether the plan is purchasable. Inactive plans stay resolvable by
    /// id for tenants already subscribed to them.
    pub is_active: bool,
    /// Whether the plan is highlighted on the pricing page.
    pub is_featured: bool,
    /// Sort order used to break price ties in listings.
    #[serde(default)]
    pub sort_order: i32,
    /// Created timestamp (unix seconds).
    #[serde(default)]
    pub created_at: u64,
    /// Updated timestamp (unix seconds).
    #[serde(default)]
    pub updated_at: u64,
}

impl Plan {
    /// Get the price in paise for a billing cycle.
    #[must_use]
    pub fn price_paise(&self, cycle: BillingCycle) -> i64 {
        match cycle {
            BillingCycle::Monthly => self.monthly_price_paise,
            BillingCycle::Yearly => self.yearly_price_paise,
        }
    }

    /// Get the limit for a countable resource.
    #[must_use]
    pub fn limit(&self, resource: Resource) -> u64 {
        match resource {
            Resource::Links => self.max_links,
            Resource::Pages => self.max_pages,
            Resource::Blocks => self.max_blocks,
            Resource::Socials => self.max_socials,
            Resource::TeamMembers => self.max_team_members,
        }
    }

    /// Get the limit formatted for display. Sentinel values render as "∞".
    #[must_use]
    pub fn limit_display(&self, resource: Resource) -> String {
        let limit = self.limit(resource);
        if limit >= resource.unlimited_sentinel() {
            "∞".to_string()
        } else {
            limit.to_string()
        }
    }

    /// Validate plan invariants before persisting.
    ///
    /// Admin write paths call this; a plan that fails validation must not
    /// reach the catalog.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("plan id must not be empty".to_string());
        }
        if self.name.trim().is_empty() {
            return Err("plan name must not be empty".to_string());
        }
        if self.monthly_price_paise < 0 || self.yearly_price_paise < 0 {
            return Err("plan prices must not be negative".to_string());
        }
        Ok(())
    }
}

/// Billing cycle for a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingCycle {
    /// Billed monthly.
    Monthly,
    /// Billed yearly.
    Yearly,
}

impl BillingCycle {
    /// Length of one billing period in seconds (30 days / 365 days).
    #[must_use]
    pub fn period_secs(&self) -> u64 {
        match self {
            Self::Monthly => 30 * 86_400,
            Self::Yearly => 365 * 86_400,
        }
    }

    /// Convert to string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }
}

impl std::fmt::Display for BillingCycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A countable, limit-bound resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Links,
    Pages,
    Blocks,
    Socials,
    TeamMembers,
}

impl Resource {
    /// Sentinel at or above which the limit is displayed as unlimited.
    #[must_use]
    pub fn unlimited_sentinel(&self) -> u64 {
        match self {
            Self::Links | Self::Blocks => UNLIMITED_HIGH,
            Self::Pages | Self::Socials | Self::TeamMembers => UNLIMITED_LOW,
        }
    }
}

/// Read-side view over the plan store.
///
/// Listing excludes retired plans; direct resolution does not, so tenants
/// grandfathered onto a retired plan keep their entitlements.
#[derive(Clone)]
pub struct PlanCatalog {
    store: Arc<dyn PlanStore>,
}

impl PlanCatalog {
    /// Create a new catalog over a plan store.
    #[must_use]
    pub fn new(store: Arc<dyn PlanStore>) -> Self {
        Self { store }
    }

    /// List purchasable plans, ascending by monthly price (ties broken by
    /// sort order).
    pub async fn list_active(&self) -> Result<Vec<Plan>> {
        let mut plans = self.store.list_plans().await?;
        plans.retain(|p| p.is_active);
        plans.sort_by_key(|p| (p.monthly_price_paise, p.sort_order));
        Ok(plans)
    }

    /// Resolve a plan by id, including inactive plans.
    pub async fn get(&self, plan_id: &str) -> Result<Plan> {
        self.store
            .get_plan(plan_id)
            .await?
            .ok_or_else(|| {
                BillingError::PlanNotFound {
                    plan_id: plan_id.to_string(),
                }
                .into()
            })
    }

    /// Resolve a plan for purchase. Absent or inactive plans both surface
    /// as not found.
    pub async fn get_purchasable(&self, plan_id: &str) -> Result<Plan> {
        let plan = self.get(plan_id).await?;
        if !plan.is_active {
            return Err(BillingError::PlanNotFound {
                plan_id: plan_id.to_string(),
            }
            .into());
        }
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::storage::test::InMemoryBillingStore;

    fn plan(id: &str, monthly_paise: i64, is_active: bool, sort_order: i32) -> Plan {
        Plan {
            id: id.to_string(),
            name: format!("{} Plan", id),
            description: None,
            monthly_price_paise: monthly_paise,
            yearly_price_paise: monthly_paise * 10,
            max_links: 5,
            max_pages: 1,
            max_blocks: 10,
            max_socials: 3,
            max_team_members: 1,
            qr_code_enabled: false,
            analytics_enabled: false,
            custom_templates_enabled: false,
            is_active,
            is_featured: false,
            sort_order,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_price_per_cycle() {
        let p = plan("pro", 99_900, true, 0);
        assert_eq!(p.price_paise(BillingCycle::Monthly), 99_900);
        assert_eq!(p.price_paise(BillingCycle::Yearly), 999_000);
    }

    #[test]
    fn test_limit_display_sentinels() {
        let mut p = plan("business", 199_900, true, 0);
        p.max_links = 999;
        p.max_pages = 99;
        p.max_team_members = 10;
        assert_eq!(p.limit_display(Resource::Links), "∞");
        assert_eq!(p.limit_display(Resource::Pages), "∞");
        assert_eq!(p.limit_display(Resource::TeamMembers), "10");
    }

    #[test]
    fn test_validate() {
        assert!(plan("ok", 0, true, 0).validate().is_ok());

        let mut bad = plan("bad", 0, true, 0);
        bad.monthly_price_paise = -1;
        assert!(bad.validate().is_err());

        let mut unnamed = plan("x", 0, true, 0);
        unnamed.name = "  ".to_string();
        assert!(unnamed.validate().is_err());
    }

    #[test]
    fn test_cycle_period() {
        assert_eq!(BillingCycle::Monthly.period_secs(), 2_592_000);
        assert_eq!(BillingCycle::Yearly.period_secs(), 31_536_000);
    }

    #[tokio::test]
    async fn test_list_active_sorted_by_price() {
        let store = InMemoryBillingStore::new();
        store.seed_plans(vec![
            plan("pro", 99_900, true, 1),
            plan("free", 0, true, 0),
            plan("business", 199_900, true, 2),
            plan("legacy", 49_900, false, 0),
        ]);

        let catalog = PlanCatalog::new(Arc::new(store));
        let plans = catalog.list_active().await.unwrap();

        let ids: Vec<&str> = plans.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["free", "pro", "business"]);
    }

    #[tokio::test]
    async fn test_get_grandfathers_inactive_plans() {
        let store = InMemoryBillingStore::new();
        store.seed_plans(vec![plan("legacy", 49_900, false, 0)]);

        let catalog = PlanCatalog::new(Arc::new(store));

        // Resolvable by id for existing subscribers
        assert_eq!(catalog.get("legacy").await.unwrap().id, "legacy");

        // But not purchasable
        assert!(catalog.get_purchasable("legacy").await.is_err());
        assert!(catalog.get("nonexistent").await.is_err());
    }
}
