use std::net::SocketAddr;

use crate::model::{ConflictKind, SchedulingDecision};

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: total evaluations. Labels: outcome.
pub const EVALUATIONS_TOTAL: &str = "slotguard_evaluations_total";

/// Histogram: evaluation latency in seconds.
pub const EVALUATION_DURATION_SECONDS: &str = "slotguard_evaluation_duration_seconds";

/// Counter: conflict findings produced. Labels: kind.
pub const FINDINGS_TOTAL: &str = "slotguard_findings_total";

/// Counter: overrides admitted (audit records published).
pub const OVERRIDES_TOTAL: &str = "slotguard_overrides_total";

// ── Failure-path metrics ────────────────────────────────────────

/// Counter: evaluations rejected fail-closed because the policy store was
/// unreachable.
pub const POLICY_UNAVAILABLE_TOTAL: &str = "slotguard_policy_unavailable_total";

/// Counter: optimistic commits refused on a stale timeline version.
pub const COMMIT_CONFLICTS_TOTAL: &str = "slotguard_commit_conflicts_total";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}

/// Map a decision variant to a short label for metrics.
pub fn decision_label(decision: &SchedulingDecision) -> &'static str {
    match decision {
        SchedulingDecision::Admitted => "admitted",
        SchedulingDecision::AdmittedWithWarning { .. } => "admitted_with_warning",
        SchedulingDecision::AdmittedByOverride { .. } => "admitted_by_override",
        SchedulingDecision::Rejected { system_error: true, .. } => "rejected_system_error",
        SchedulingDecision::Rejected { .. } => "rejected",
    }
}

pub fn finding_label(kind: &ConflictKind) -> &'static str {
    match kind {
        ConflictKind::BufferShortfall => "buffer_shortfall",
        ConflictKind::BlockOverlap => "block_overlap",
    }
}
