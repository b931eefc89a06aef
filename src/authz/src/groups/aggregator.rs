//! Group permission aggregation
//!
//! Folds the raw grants of every active group a principal belongs to into
//! one map. Groups are processed in membership order and a later group's
//! value replaces an earlier one for the same key, whatever the booleans
//! are. The result stays raw (it may contain wildcards).

use std::sync::Arc;
use tracing::debug;

use super::store::GroupStore;
use crate::error::Result;
use crate::permission::PermissionMap;

/// Aggregates a principal's group grants
#[derive(Clone)]
pub struct GroupAggregator {
    store: Arc<dyn GroupStore>,
}

impl GroupAggregator {
    /// Create an aggregator over a store
    pub fn new(store: Arc<dyn GroupStore>) -> Self {
        Self { store }
    }

    /// Returns the underlying store
    pub fn store(&self) -> &Arc<dyn GroupStore> {
        &self.store
    }

    /// Effective raw permission map of a principal
    ///
    /// No active memberships yields an empty map (default-deny).
    pub async fn aggregate(&self, principal: &str) -> Result<PermissionMap> {
        let groups = self.store.load_principal_grants(principal).await?;

        let mut aggregated = PermissionMap::new();
        for (group, grants) in &groups {
            debug!("Merging {} grants from group {} for {}", grants.len(), group, principal);
            aggregated.merge(grants);
        }

        debug!(
            "Aggregated {} permissions for {} from {} groups",
            aggregated.len(),
            principal,
            groups.len()
        );

        Ok(aggregated)
    }
}
