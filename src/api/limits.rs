//! Merged usage and plan-limit view for the authenticated tenant.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::app::AppContext;
use crate::billing::entitlements::PlanLimitsSummary;
use crate::error::Result;
use crate::http::{RouteModule, TenantId};

/// Routes under `/auth`.
pub struct PlanLimitsModule;

impl RouteModule for PlanLimitsModule {
    fn routes(&self) -> Router<AppContext> {
        Router::new().route("/plan-limits", get(plan_limits))
    }

    fn prefix(&self) -> Option<&str> {
        Some("/auth")
    }
}

/// Current usage merged with the tenant's plan limits.
async fn plan_limits(
    State(context): State<AppContext>,
    tenant: TenantId,
) -> Result<Json<PlanLimitsSummary>> {
    Ok(Json(
        context.entitlements.plan_limits(tenant.as_str()).await?,
    ))
}
