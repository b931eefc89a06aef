//! Authorization engine
//!
//! Ties the catalog, the wildcard expander and the group aggregator
//! together behind one handle, and records decision metrics.

pub mod decision;
pub mod metrics;

pub use decision::{authorize, authorize_permission, evaluate, AuthDecision, DecisionReason};
pub use metrics::{EngineMetrics, MetricsCollector};

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::catalog::PermissionCatalog;
use crate::error::{AuthzError, Result};
use crate::expand::{CacheStats, WildcardExpander, DEFAULT_CACHE_CAPACITY};
use crate::groups::{GroupAggregator, GroupStore};
use crate::permission::PermissionMap;
use crate::validate::{violations_between, SubsetValidation};

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Cache pattern expansions
    pub expansion_cache: bool,

    /// Maximum number of cached pattern expansions (least recently used go first)
    pub expansion_cache_capacity: usize,

    /// Enable metrics collection
    pub enable_metrics: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            expansion_cache: true,
            expansion_cache_capacity: DEFAULT_CACHE_CAPACITY,
            enable_metrics: true,
        }
    }
}

/// Authorization engine
///
/// # Architecture
///
/// ```text
/// GroupStore → GroupAggregator → raw map
///                                   ↓
///                  Catalog → WildcardExpander → expanded → authorize → Decision
///                                   ↓                                    ↓
///                            validate_subset                         [Metrics]
/// ```
///
/// Principal-level checks run against the expanded map, the same form that
/// credential snapshots carry, so a later group's explicit `false` wins over
/// an earlier group's pattern in both places.
pub struct AuthzEngine {
    /// Closed set of concrete permissions
    catalog: Arc<PermissionCatalog>,

    /// Catalog-bound expander
    expander: Arc<WildcardExpander>,

    /// Group aggregation over the store
    aggregator: GroupAggregator,

    /// Decision counters
    metrics: Option<Arc<MetricsCollector>>,

    config: EngineConfig,
}

impl AuthzEngine {
    /// Create an engine with the default configuration
    pub fn new(catalog: Arc<PermissionCatalog>, store: Arc<dyn GroupStore>) -> Result<Self> {
        Self::with_config(EngineConfig::default(), catalog, store)
    }

    /// Create an engine
    ///
    /// # Errors
    ///
    /// `EmptyCatalog` if the catalog has no entries.
    pub fn with_config(
        config: EngineConfig,
        catalog: Arc<PermissionCatalog>,
        store: Arc<dyn GroupStore>,
    ) -> Result<Self> {
        if catalog.is_empty() {
            return Err(AuthzError::EmptyCatalog);
        }

        let capacity = if config.expansion_cache {
            config.expansion_cache_capacity
        } else {
            0
        };
        let expander = Arc::new(WildcardExpander::with_capacity(Arc::clone(&catalog), capacity));

        let metrics = if config.enable_metrics {
            Some(Arc::new(MetricsCollector::new()))
        } else {
            None
        };

        info!(
            "AuthzEngine initialized with {} catalog entries, expansion_cache={} (capacity {}), metrics={}",
            catalog.len(),
            config.expansion_cache,
            config.expansion_cache_capacity,
            config.enable_metrics
        );

        Ok(Self {
            catalog,
            expander,
            aggregator: GroupAggregator::new(store),
            metrics,
            config,
        })
    }

    /// The catalog the engine expands against
    pub fn catalog(&self) -> &Arc<PermissionCatalog> {
        &self.catalog
    }

    /// The shared expander
    pub fn expander(&self) -> &Arc<WildcardExpander> {
        &self.expander
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Checks a held map against a concrete requirement
    pub fn authorize(&self, held: &PermissionMap, required: &str) -> bool {
        let allowed = authorize(held, required);
        if let Some(metrics) = &self.metrics {
            metrics.record_check(allowed);
        }
        allowed
    }

    /// Like [`AuthzEngine::authorize`], with the reason attached
    pub fn decide(&self, held: &PermissionMap, required: &str) -> AuthDecision {
        let decision = evaluate(held, required);
        debug!(
            "Decision for {}: {} ({:?})",
            required,
            if decision.allowed { "ALLOW" } else { "DENY" },
            decision.reason
        );

        if let Some(metrics) = &self.metrics {
            metrics.record_decision(&decision);
        }
        decision
    }

    /// Raw effective map of a principal (may contain wildcards)
    pub async fn aggregate_group_permissions(&self, principal: &str) -> Result<PermissionMap> {
        let aggregated = self.aggregator.aggregate(principal).await?;
        if let Some(metrics) = &self.metrics {
            metrics.record_aggregation();
        }
        Ok(aggregated)
    }

    /// Expanded effective map of a principal
    pub async fn effective_permissions(&self, principal: &str) -> Result<PermissionMap> {
        let aggregated = self.aggregate_group_permissions(principal).await?;
        Ok(self.expander.expand_map(&aggregated))
    }

    /// Live check against a principal's current group grants
    ///
    /// Decides on [`AuthzEngine::effective_permissions`], so the answer
    /// agrees with a session issued at the same moment.
    pub async fn authorize_principal(&self, principal: &str, required: &str) -> Result<bool> {
        let effective = self.effective_permissions(principal).await?;
        Ok(self.authorize(&effective, required))
    }

    /// Expands every key of a map against the catalog
    pub fn expand_map(&self, map: &PermissionMap) -> PermissionMap {
        self.expander.expand_map(map)
    }

    /// Checks that `requested` grants nothing beyond `superset`
    pub fn validate_subset(&self, requested: &PermissionMap, superset: &PermissionMap) -> SubsetValidation {
        let validation = violations_between(
            &self.expander.expand_map(requested),
            &self.expander.expand_map(superset),
        );

        if let Some(metrics) = &self.metrics {
            metrics.record_subset_check(!validation.is_ok());
        }
        validation
    }

    /// Validates a derived-credential request against the owner's current rights
    pub async fn validate_for_principal(
        &self,
        owner: &str,
        requested: &PermissionMap,
    ) -> Result<SubsetValidation> {
        let held = self.aggregate_group_permissions(owner).await?;
        Ok(self.validate_subset(requested, &held))
    }

    /// Get engine metrics
    pub fn get_metrics(&self) -> Option<EngineMetrics> {
        self.metrics.as_ref().map(|metrics| metrics.get_metrics())
    }

    /// Metrics in Prometheus text format
    pub fn export_metrics(&self) -> Option<String> {
        self.metrics.as_ref().map(|metrics| metrics.export_prometheus())
    }

    /// Get expansion cache statistics
    pub fn cache_stats(&self) -> CacheStats {
        self.expander.stats()
    }
}
