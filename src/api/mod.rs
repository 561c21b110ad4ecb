//! HTTP surface for pricing, payments, promo codes and plan limits.
//!
//! Assembled from [`RouteModule`]s and mounted under `/api`. The auth
//! collaborator populates [`TenantId`](crate::http::TenantId) into request
//! extensions before these handlers run.

pub mod limits;
pub mod payments;
pub mod pricing;
pub mod promo_codes;

use axum::Router;

use crate::app::AppContext;
use crate::http::RouteModule;

/// Build the full API router.
#[must_use]
pub fn router(context: AppContext) -> Router {
    let mut routes = Router::new();
    routes = pricing::PricingModule.register(routes);
    routes = payments::PaymentsModule.register(routes);
    routes = promo_codes::PromoCodesModule.register(routes);
    routes = limits::PlanLimitsModule.register(routes);

    Router::new().nest("/api", routes.with_state(context))
}
