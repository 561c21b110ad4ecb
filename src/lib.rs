//! Linkdeck - plan entitlement and subscription settlement core
//!
//! The billing heart of the Linkdeck link-in-bio platform: decides what a
//! tenant may create under their plan, and moves tenants between plans
//! when a Razorpay payment settles.
//!
//! # Features
//!
//! - **Plan catalog**: typed plans with limits and feature flags,
//!   price-ascending listings, grandfathered retired plans
//! - **Entitlements**: pure allow/deny decisions with upgrade prompts
//! - **Promo codes**: case-insensitive validation, round-half-up discounts
//! - **Settlement**: order creation, constant-time signature verification,
//!   retried subscription activation
//! - **HTTP**: axum route modules mounted under `/api`
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use linkdeck::{AppContext, Config, api};
//! use linkdeck::billing::RazorpayGateway;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     linkdeck::init_tracing();
//!
//!     let config = Config::from_env()?;
//!     let gateway = RazorpayGateway::new(
//!         config.billing.key_id.clone(),
//!         config.billing.key_secret.clone(),
//!     )?;
//!
//!     let context = AppContext::builder()
//!         .with_store(my_database_store()) // your storage implementation
//!         .with_gateway(Arc::new(gateway))
//!         .with_billing_config(config.billing.clone())
//!         .build()?;
//!
//!     let app = api::router(context);
//!     let listener = tokio::net::TcpListener::bind(
//!         (config.server.host.as_str(), config.server.port),
//!     ).await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
mod app;
pub mod billing;
mod config;
mod error;
pub mod http;
pub mod utils;

pub use app::{AppContext, AppContextBuilder};
pub use config::{BillingConfig, Config, LoggingConfig, ServerConfig};
pub use error::{ErrorResponse, LinkdeckError, Result};
pub use http::{RouteModule, TenantId};

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging with sensible defaults
///
/// Call this early, typically in main() before building the AppContext.
///
/// # Environment Variables
///
/// - `RUST_LOG`: Set log level (e.g., "info", "debug", "linkdeck=debug")
/// - `LINKDECK_LOG_JSON`: Set to "true" for JSON formatted logs
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_logs = std::env::var("LINKDECK_LOG_JSON")
        .map(|v| v.parse::<bool>().unwrap_or(false))
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Initialize tracing with a custom configuration
pub fn init_tracing_with_config(config: &Config) {
    let env_filter = EnvFilter::new(&config.logging.level);

    if config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
