//! Entitlement evaluation and plan-limit gating.
//!
//! [`can_perform`] is a pure decision function: it never errors and has no
//! side effects. Callers run it before every resource-creation write; the
//! check and the write are not one transaction, so concurrent creations by
//! the same tenant can transiently exceed a limit by at most the number of
//! in-flight requests minus one. Accepted for this domain.
//!
//! When usage or plan context cannot be resolved the evaluator fails open
//! and allows the action. This is deliberate reference behavior, kept so
//! missing data never blocks a tenant; see DESIGN.md.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::plans::{Plan, PlanCatalog, Resource};
use super::storage::SubscriptionStore;
use super::usage::{UsageCounter, UsageSnapshot};
use crate::error::Result;

/// An action gated by the tenant's plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    AddLink,
    AddPage,
    AddBlock,
    AddSocial,
    AddTeamMember,
    UseQrCode,
    UseAnalytics,
}

impl Action {
    /// The counted resource for count-bound actions; `None` for
    /// feature-bound actions.
    #[must_use]
    pub fn resource(&self) -> Option<Resource> {
        match self {
            Self::AddLink => Some(Resource::Links),
            Self::AddPage => Some(Resource::Pages),
            Self::AddBlock => Some(Resource::Blocks),
            Self::AddSocial => Some(Resource::Socials),
            Self::AddTeamMember => Some(Resource::TeamMembers),
            Self::UseQrCode | Self::UseAnalytics => None,
        }
    }
}

/// Outcome of an entitlement check. Denial is not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Decision {
    /// An allowing decision.
    #[must_use]
    pub fn allow() -> Self {
        Self {
            allowed: true,
            message: None,
        }
    }

    /// A denying decision with an upgrade prompt.
    #[must_use]
    pub fn deny(message: impl Into<String>) -> Self {
        Self {
            allowed: false,
            message: Some(message.into()),
        }
    }
}

/// Decide whether an action is within the plan's entitlements.
///
/// Count-bound actions compare current usage against the plan limit;
/// feature-bound actions consult the plan's feature flag. Missing usage or
/// plan context allows the action (fail-open).
#[must_use]
pub fn can_perform(
    action: Action,
    usage: Option<&UsageSnapshot>,
    plan: Option<&Plan>,
) -> Decision {
    let Some(plan) = plan else {
        return Decision::allow();
    };

    match action {
        Action::UseQrCode => {
            if plan.qr_code_enabled {
                Decision::allow()
            } else {
                Decision::deny(
                    "QR codes aren't included in your current plan. Upgrade to unlock QR codes.",
                )
            }
        }
        Action::UseAnalytics => {
            if plan.analytics_enabled {
                Decision::allow()
            } else {
                Decision::deny(
                    "Analytics aren't included in your current plan. Upgrade to unlock analytics.",
                )
            }
        }
        _ => {
            let Some(usage) = usage else {
                return Decision::allow();
            };
            // Count-bound actions always carry a resource
            let resource = match action.resource() {
                Some(r) => r,
                None => return Decision::allow(),
            };
            let current = usage_count(usage, resource);
            let max = plan.limit(resource);
            if current < max {
                Decision::allow()
            } else {
                Decision::deny(limit_message(resource, current, max))
            }
        }
    }
}

fn usage_count(usage: &UsageSnapshot, resource: Resource) -> u64 {
    match resource {
        Resource::Links => usage.links,
        Resource::Pages => usage.pages,
        Resource::Blocks => usage.blocks,
        Resource::Socials => usage.socials,
        Resource::TeamMembers => usage.team_members,
    }
}

fn limit_message(resource: Resource, current: u64, max: u64) -> String {
    match resource {
        Resource::Links => format!(
            "You've reached your link limit ({}/{}). Upgrade your plan to add more links.",
            current, max
        ),
        Resource::Pages => format!(
            "You've reached your page limit ({}/{}). Upgrade your plan to add more pages.",
            current, max
        ),
        Resource::Blocks => format!(
            "You've reached your block limit ({}/{}). Upgrade your plan to add more blocks.",
            current, max
        ),
        Resource::Socials => format!(
            "You've reached your social icon limit ({}/{}). Upgrade your plan to add more social icons.",
            current, max
        ),
        Resource::TeamMembers => format!(
            "You've reached your team member limit ({}/{}). Upgrade your plan to invite more members.",
            current, max
        ),
    }
}

/// Entitlements manager resolving a tenant's subscription, plan and usage
/// before delegating to [`can_perform`].
#[derive(Clone)]
pub struct EntitlementsManager {
    subscriptions: Arc<dyn SubscriptionStore>,
    catalog: PlanCatalog,
    usage: UsageCounter,
}

impl EntitlementsManager {
    /// Create a new entitlements manager.
    #[must_use]
    pub fn new(
        subscriptions: Arc<dyn SubscriptionStore>,
        catalog: PlanCatalog,
        usage: UsageCounter,
    ) -> Self {
        Self {
            subscriptions,
            catalog,
            usage,
        }
    }

    /// Check whether a tenant may perform an action.
    ///
    /// Infallible: storage failures degrade to missing context, which
    /// fails open. The degradation is logged so the leniency stays
    /// observable.
    pub async fn check(&self, tenant_id: &str, action: Action) -> Decision {
        let plan = self.resolve_plan(tenant_id).await;

        let usage = match self.usage.count_usage(tenant_id).await {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                tracing::warn!(
                    target: "linkdeck::billing",
                    tenant_id = %tenant_id,
                    error = %err,
                    "Usage count failed, entitlement check failing open"
                );
                None
            }
        };

        can_perform(action, usage.as_ref(), plan.as_ref())
    }

    /// Merged usage and plan-limit view for the current tenant.
    ///
    /// Usage is always present; plan fields are `None` when the tenant has
    /// no resolvable plan (clients treat that as unlimited, mirroring the
    /// fail-open evaluator).
    pub async fn plan_limits(&self, tenant_id: &str) -> Result<PlanLimitsSummary> {
        let usage = self.usage.count_usage(tenant_id).await?;
        let plan = self.resolve_plan(tenant_id).await;

        Ok(match plan {
            Some(plan) => PlanLimitsSummary {
                plan_id: Some(plan.id.clone()),
                plan_name: Some(plan.name.clone()),
                usage,
                limits: Some(PlanLimits {
                    max_links: plan.max_links,
                    max_pages: plan.max_pages,
                    max_blocks: plan.max_blocks,
                    max_socials: plan.max_socials,
                    max_team_members: plan.max_team_members,
                    qr_code_enabled: plan.qr_code_enabled,
                    analytics_enabled: plan.analytics_enabled,
                    custom_templates_enabled: plan.custom_templates_enabled,
                }),
                limits_display: Some(LimitsDisplay {
                    links: plan.limit_display(Resource::Links),
                    pages: plan.limit_display(Resource::Pages),
                    blocks: plan.limit_display(Resource::Blocks),
                    socials: plan.limit_display(Resource::Socials),
                    team_members: plan.limit_display(Resource::TeamMembers),
                }),
            },
            None => PlanLimitsSummary {
                plan_id: None,
                plan_name: None,
                usage,
                limits: None,
                limits_display: None,
            },
        })
    }

    /// Resolve the plan the tenant currently holds. The subscription row is
    /// the plan pointer whatever its status; any gap in the chain yields
    /// `None`.
    async fn resolve_plan(&self, tenant_id: &str) -> Option<Plan> {
        let subscription = match self.subscriptions.get_subscription(tenant_id).await {
            Ok(sub) => sub,
            Err(err) => {
                tracing::warn!(
                    target: "linkdeck::billing",
                    tenant_id = %tenant_id,
                    error = %err,
                    "Subscription lookup failed, entitlement check failing open"
                );
                None
            }
        }?;

        self.catalog.get(&subscription.plan_id).await.ok()
    }
}

/// Merged usage and plan-limit view returned by the plan-limits endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanLimitsSummary {
    pub plan_id: Option<String>,
    pub plan_name: Option<String>,
    pub usage: UsageSnapshot,
    pub limits: Option<PlanLimits>,
    pub limits_display: Option<LimitsDisplay>,
}

/// Numeric limits and feature flags of the tenant's plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanLimits {
    pub max_links: u64,
    pub max_pages: u64,
    pub max_blocks: u64,
    pub max_socials: u64,
    pub max_team_members: u64,
    pub qr_code_enabled: bool,
    pub analytics_enabled: bool,
    pub custom_templates_enabled: bool,
}

/// Display strings for limits; unlimited sentinels render as "∞".
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitsDisplay {
    pub links: String,
    pub pages: String,
    pub blocks: String,
    pub socials: String,
    pub team_members: String,
}
