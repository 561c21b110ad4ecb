//! Tenant identity extractor.
//!
//! The auth collaborator (session middleware, JWT layer) resolves the
//! caller and inserts a [`TenantId`] into request extensions before the
//! billing handlers run. Handlers take it as an extractor argument and
//! reject with 401 when the extension is missing.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde::{Deserialize, Serialize};

use crate::error::LinkdeckError;

/// The authenticated tenant owning the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantId(pub String);

impl TenantId {
    /// The tenant id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<S> FromRequestParts<S> for TenantId
where
    S: Send + Sync,
{
    type Rejection = LinkdeckError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<TenantId>()
            .cloned()
            .ok_or_else(|| LinkdeckError::unauthorized("Tenant context missing"))
    }
}
