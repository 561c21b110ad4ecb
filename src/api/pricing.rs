//! Public pricing endpoints.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::app::AppContext;
use crate::billing::plans::Plan;
use crate::error::Result;
use crate::http::RouteModule;

/// Routes under `/pricing`.
pub struct PricingModule;

impl RouteModule for PricingModule {
    fn routes(&self) -> Router<AppContext> {
        Router::new().route("/plans", get(list_plans))
    }

    fn prefix(&self) -> Option<&str> {
        Some("/pricing")
    }
}

/// List purchasable plans, cheapest first.
async fn list_plans(State(context): State<AppContext>) -> Result<Json<Vec<Plan>>> {
    Ok(Json(context.catalog.list_active().await?))
}
