//! Subscription and payment endpoints.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::app::AppContext;
use crate::billing::checkout::OrderOutcome;
use crate::billing::plans::BillingCycle;
use crate::billing::storage::Subscription;
use crate::error::Result;
use crate::http::{RouteModule, TenantId};

/// Routes under `/payments`.
pub struct PaymentsModule;

impl RouteModule for PaymentsModule {
    fn routes(&self) -> Router<AppContext> {
        Router::new()
            .route("/subscription", get(current_subscription))
            .route("/create-order", post(create_order))
            .route("/verify", post(verify_payment))
    }

    fn prefix(&self) -> Option<&str> {
        Some("/payments")
    }
}

/// The tenant's current subscription, or null.
async fn current_subscription(
    State(context): State<AppContext>,
    tenant: TenantId,
) -> Result<Json<Option<Subscription>>> {
    Ok(Json(
        context.subscriptions.get_subscription(tenant.as_str()).await?,
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateOrderBody {
    plan_id: String,
    billing_cycle: BillingCycle,
    #[serde(default)]
    promo_code: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum CreateOrderResponse {
    #[serde(rename_all = "camelCase")]
    Free { free: bool },
    #[serde(rename_all = "camelCase")]
    Pending {
        free: bool,
        order_id: String,
        amount: i64,
        currency: String,
        key_id: String,
    },
}

/// Open a checkout order for a plan upgrade.
async fn create_order(
    State(context): State<AppContext>,
    tenant: TenantId,
    Json(body): Json<CreateOrderBody>,
) -> Result<Json<CreateOrderResponse>> {
    let outcome = context
        .checkout
        .create_order(
            tenant.as_str(),
            &body.plan_id,
            body.billing_cycle,
            body.promo_code.as_deref(),
        )
        .await?;

    Ok(Json(match outcome {
        OrderOutcome::Free { .. } => CreateOrderResponse::Free { free: true },
        OrderOutcome::Pending {
            order_id,
            amount_paise,
            currency,
            key_id,
        } => CreateOrderResponse::Pending {
            free: false,
            order_id,
            amount: amount_paise,
            currency,
            key_id,
        },
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyPaymentBody {
    razorpay_order_id: String,
    razorpay_payment_id: String,
    razorpay_signature: String,
    plan_id: String,
    billing_cycle: BillingCycle,
    #[serde(default)]
    promo_code: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifyPaymentResponse {
    ok: bool,
    subscription: Subscription,
}

/// Verify a returned payment receipt and activate the subscription.
async fn verify_payment(
    State(context): State<AppContext>,
    tenant: TenantId,
    Json(body): Json<VerifyPaymentBody>,
) -> Result<Json<VerifyPaymentResponse>> {
    let subscription = context
        .settlement
        .verify_payment(
            tenant.as_str(),
            &body.razorpay_order_id,
            &body.razorpay_payment_id,
            &body.razorpay_signature,
            &body.plan_id,
            body.billing_cycle,
            body.promo_code.as_deref(),
        )
        .await?;

    Ok(Json(VerifyPaymentResponse {
        ok: true,
        subscription,
    }))
}
