//! Tenant resource counting.
//!
//! A [`UsageSnapshot`] is derived at query time from a
//! [`UsageSource`](super::storage::UsageSource); nothing here is persisted.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::storage::UsageSource;
use crate::error::Result;

/// Counts of a tenant's resources at a point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSnapshot {
    /// Active links.
    pub links: u64,
    /// Pages (counted unconditionally).
    pub pages: u64,
    /// Active content blocks.
    pub blocks: u64,
    /// Social icons (counted unconditionally).
    pub socials: u64,
    /// Team members not deactivated.
    pub team_members: u64,
}

/// Read-side counter over a [`UsageSource`].
#[derive(Clone)]
pub struct UsageCounter {
    source: Arc<dyn UsageSource>,
}

impl UsageCounter {
    /// Create a new counter over a usage source.
    #[must_use]
    pub fn new(source: Arc<dyn UsageSource>) -> Self {
        Self { source }
    }

    /// Count the tenant's resources at query time.
    pub async fn count_usage(&self, tenant_id: &str) -> Result<UsageSnapshot> {
        self.source.count_usage(tenant_id).await
    }
}
