//! Decision and issuance counters for engine observability

use std::sync::atomic::{AtomicU64, Ordering};

use super::decision::{AuthDecision, DecisionReason};

/// Engine metrics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineMetrics {
    /// Total number of authorization checks
    pub total_checks: u64,

    /// Number of allowed decisions
    pub allowed: u64,

    /// Number of denied decisions (invalid requirements included)
    pub denied: u64,

    /// Denials caused by a malformed or non-concrete requirement
    pub invalid_requirements: u64,

    /// Group aggregations performed
    pub aggregations: u64,

    /// Subset validations performed
    pub subset_checks: u64,

    /// Subset validations that found violations
    pub escalations_rejected: u64,
}

impl EngineMetrics {
    /// Calculate allow rate
    pub fn allow_rate(&self) -> f64 {
        let total = self.allowed + self.denied;
        if total == 0 {
            0.0
        } else {
            self.allowed as f64 / total as f64
        }
    }
}

/// Lock-free metrics collector
///
/// Checks run on synchronous hot paths, so every counter is its own
/// relaxed atomic.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    total_checks: AtomicU64,
    allowed: AtomicU64,
    denied: AtomicU64,
    invalid_requirements: AtomicU64,
    aggregations: AtomicU64,
    subset_checks: AtomicU64,
    escalations_rejected: AtomicU64,
}

impl MetricsCollector {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    fn counters(&self) -> [&AtomicU64; 7] {
        [
            &self.total_checks,
            &self.allowed,
            &self.denied,
            &self.invalid_requirements,
            &self.aggregations,
            &self.subset_checks,
            &self.escalations_rejected,
        ]
    }

    /// Record a plain allow/deny check
    pub fn record_check(&self, allowed: bool) {
        self.total_checks.fetch_add(1, Ordering::Relaxed);
        let outcome = if allowed { &self.allowed } else { &self.denied };
        outcome.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a decision with its reason
    pub fn record_decision(&self, decision: &AuthDecision) {
        self.record_check(decision.allowed);
        if matches!(decision.reason, DecisionReason::InvalidRequirement { .. }) {
            self.invalid_requirements.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a group aggregation
    pub fn record_aggregation(&self) {
        self.aggregations.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a subset validation and whether it was rejected
    pub fn record_subset_check(&self, rejected: bool) {
        self.subset_checks.fetch_add(1, Ordering::Relaxed);
        if rejected {
            self.escalations_rejected.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Get current metrics snapshot
    pub fn get_metrics(&self) -> EngineMetrics {
        EngineMetrics {
            total_checks: self.total_checks.load(Ordering::Relaxed),
            allowed: self.allowed.load(Ordering::Relaxed),
            denied: self.denied.load(Ordering::Relaxed),
            invalid_requirements: self.invalid_requirements.load(Ordering::Relaxed),
            aggregations: self.aggregations.load(Ordering::Relaxed),
            subset_checks: self.subset_checks.load(Ordering::Relaxed),
            escalations_rejected: self.escalations_rejected.load(Ordering::Relaxed),
        }
    }

    /// Reset all metrics
    pub fn reset(&self) {
        for counter in self.counters() {
            counter.store(0, Ordering::Relaxed);
        }
    }

    /// Export metrics in Prometheus text format
    pub fn export_prometheus(&self) -> String {
        let metrics = self.get_metrics();

        format!(
            r#"# HELP gatekeeper_checks_total Total number of authorization checks
# TYPE gatekeeper_checks_total counter
gatekeeper_checks_total {}

# HELP gatekeeper_allowed_total Number of allowed decisions
# TYPE gatekeeper_allowed_total counter
gatekeeper_allowed_total {}

# HELP gatekeeper_denied_total Number of denied decisions
# TYPE gatekeeper_denied_total counter
gatekeeper_denied_total {}

# HELP gatekeeper_invalid_requirements_total Denials caused by malformed requirements
# TYPE gatekeeper_invalid_requirements_total counter
gatekeeper_invalid_requirements_total {}

# HELP gatekeeper_aggregations_total Group aggregations
# TYPE gatekeeper_aggregations_total counter
gatekeeper_aggregations_total {}

# HELP gatekeeper_subset_checks_total Subset validations
# TYPE gatekeeper_subset_checks_total counter
gatekeeper_subset_checks_total {}

# HELP gatekeeper_escalations_rejected_total Subset validations with violations
# TYPE gatekeeper_escalations_rejected_total counter
gatekeeper_escalations_rejected_total {}
"#,
            metrics.total_checks,
            metrics.allowed,
            metrics.denied,
            metrics.invalid_requirements,
            metrics.aggregations,
            metrics.subset_checks,
            metrics.escalations_rejected,
        )
    }
}
