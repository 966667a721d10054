use crate::model::{ConflictFinding, OverrideRequest, SchedulingDecision};
use crate::policy::EnforcementSettings;

/// Enforcement state machine. The mode is fixed per request from the
/// snapshot; no transitions happen during an evaluation.
///
/// Block overlaps short-circuit everything: they reject in every mode,
/// including disabled enforcement and override-capable mode with a
/// justification supplied.
pub fn apply_enforcement(
    settings: &EnforcementSettings,
    findings: Vec<ConflictFinding>,
    override_req: Option<&OverrideRequest>,
) -> SchedulingDecision {
    if findings.iter().any(ConflictFinding::is_block) {
        return SchedulingDecision::Rejected {
            findings,
            system_error: false,
        };
    }
    if findings.is_empty() {
        return SchedulingDecision::Admitted;
    }
    if !settings.enabled {
        // buffers are informational only; findings were computed but are dropped
        return SchedulingDecision::Admitted;
    }
    if settings.strict_mode {
        return SchedulingDecision::Rejected {
            findings,
            system_error: false,
        };
    }
    match override_req {
        Some(o) if settings.allow_override => SchedulingDecision::AdmittedByOverride {
            findings,
            justification: o.justification.clone(),
        },
        _ => SchedulingDecision::AdmittedWithWarning { findings },
    }
}
