//! Promo code validation endpoint.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

use crate::app::AppContext;
use crate::billing::promo::PromoDiscount;
use crate::error::Result;
use crate::http::{RouteModule, TenantId};

/// Routes under `/promo-codes`.
pub struct PromoCodesModule;

impl RouteModule for PromoCodesModule {
    fn routes(&self) -> Router<AppContext> {
        Router::new().route("/validate", post(validate))
    }

    fn prefix(&self) -> Option<&str> {
        Some("/promo-codes")
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValidateBody {
    code: String,
}

/// Validate a promo code. Never consumes it.
async fn validate(
    State(context): State<AppContext>,
    _tenant: TenantId,
    Json(body): Json<ValidateBody>,
) -> Result<Json<PromoDiscount>> {
    Ok(Json(context.promo.validate(&body.code).await?))
}
