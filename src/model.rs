use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unix milliseconds — the only time type.
pub type Ms = i64;

/// Buffer rules and durations are configured in whole minutes.
pub const MINUTE_MS: Ms = 60_000;

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: Ms,
    pub end: Ms,
}

impl Span {
    pub fn new(start: Ms, end: Ms) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    pub fn duration_ms(&self) -> Ms {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// What a committed interval represents on a resource timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntervalKind {
    /// A confirmed appointment, protected by the buffers frozen at booking time.
    Appointment {
        service_id: Ulid,
        label: Option<String>,
    },
    /// Immovable blocked time. Hard exclusion — buffers never apply to it,
    /// and overlapping its core is a conflict in every enforcement mode.
    Block { reason: Option<String> },
}

/// A booking or block already accepted onto a resource's timeline.
///
/// `applied_before`/`applied_after` are the buffer ms that were in effect
/// when this interval was committed. Policy edits later never recompute
/// them; past bookings keep the margins they were admitted under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommittedInterval {
    pub id: Ulid,
    pub resource_id: Ulid,
    pub span: Span,
    pub kind: IntervalKind,
    pub applied_before: Ms,
    pub applied_after: Ms,
}

impl CommittedInterval {
    pub fn appointment(
        id: Ulid,
        resource_id: Ulid,
        span: Span,
        service_id: Ulid,
        applied_before: Ms,
        applied_after: Ms,
    ) -> Self {
        Self {
            id,
            resource_id,
            span,
            kind: IntervalKind::Appointment {
                service_id,
                label: None,
            },
            applied_before,
            applied_after,
        }
    }

    /// Blocks carry no buffers of their own.
    pub fn block(id: Ulid, resource_id: Ulid, span: Span, reason: Option<String>) -> Self {
        Self {
            id,
            resource_id,
            span,
            kind: IntervalKind::Block { reason },
            applied_before: 0,
            applied_after: 0,
        }
    }

    pub fn is_block(&self) -> bool {
        matches!(self.kind, IntervalKind::Block { .. })
    }
}

/// An add-on service tacked onto an appointment, extending its duration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddOn {
    pub label: Option<String>,
    pub duration_min: i64,
}

/// One booking attempt. Built fresh per attempt, evaluated once, never
/// persisted by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub staff_id: Ulid,
    pub location_id: Ulid,
    pub service_id: Ulid,
    pub start: Ms,
    pub base_duration_min: i64,
    pub add_ons: Vec<AddOn>,
}

impl BookingRequest {
    pub fn total_duration_min(&self) -> i64 {
        self.base_duration_min + self.add_ons.iter().map(|a| a.duration_min).sum::<i64>()
    }

    /// The actual start–end of the booking, excluding buffers.
    pub fn core_span(&self) -> Span {
        Span::new(self.start, self.start + self.total_duration_min() * MINUTE_MS)
    }
}

/// Resolved (before, after) pair actually enforced for one booking on one
/// resource, after combining all applicable policy scopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EffectiveBuffer {
    pub before_min: i64,
    pub after_min: i64,
}

impl EffectiveBuffer {
    pub const ZERO: Self = Self {
        before_min: 0,
        after_min: 0,
    };

    pub fn before_ms(&self) -> Ms {
        self.before_min * MINUTE_MS
    }

    pub fn after_ms(&self) -> Ms {
        self.after_min * MINUTE_MS
    }
}

/// Which side of the candidate the offending neighbor sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Before,
    After,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictKind {
    /// The gap between cores is shorter than the stricter of the two sides'
    /// buffer demands.
    BufferShortfall,
    /// The candidate core overlaps a Block core.
    BlockOverlap,
}

/// One violated neighbor. Decision data surfaced to the caller, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictFinding {
    pub resource_id: Ulid,
    pub neighbor: CommittedInterval,
    pub side: Side,
    pub kind: ConflictKind,
    pub required_gap_ms: Ms,
    /// Negative when the cores themselves overlap.
    pub actual_gap_ms: Ms,
}

impl ConflictFinding {
    pub fn is_block(&self) -> bool {
        self.kind == ConflictKind::BlockOverlap
    }
}

/// Outcome of one evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchedulingDecision {
    Admitted,
    /// Conflicts exist but enforcement is advisory; the booking proceeds and
    /// the caller is informed.
    AdmittedWithWarning { findings: Vec<ConflictFinding> },
    /// Conflicts exist and the caller explicitly opted into an override.
    /// An audit record is emitted alongside this decision.
    AdmittedByOverride {
        findings: Vec<ConflictFinding>,
        justification: String,
    },
    /// `system_error` marks the fail-closed path (policy store unreachable);
    /// findings are empty in that case.
    Rejected {
        findings: Vec<ConflictFinding>,
        system_error: bool,
    },
}

impl SchedulingDecision {
    /// True for every decision under which the booking proceeds.
    pub fn admits(&self) -> bool {
        !matches!(self, SchedulingDecision::Rejected { .. })
    }

    pub fn findings(&self) -> &[ConflictFinding] {
        match self {
            SchedulingDecision::Admitted => &[],
            SchedulingDecision::AdmittedWithWarning { findings }
            | SchedulingDecision::AdmittedByOverride { findings, .. }
            | SchedulingDecision::Rejected { findings, .. } => findings,
        }
    }
}

/// Caller-supplied opt-in to override advisory conflicts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideRequest {
    pub actor: String,
    pub justification: String,
}

/// Condensed request identity carried in audit records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingSummary {
    pub staff_id: Ulid,
    pub location_id: Ulid,
    pub service_id: Ulid,
    pub span: Span,
}

impl From<&BookingRequest> for BookingSummary {
    fn from(req: &BookingRequest) -> Self {
        Self {
            staff_id: req.staff_id,
            location_id: req.location_id,
            service_id: req.service_id,
            span: req.core_span(),
        }
    }
}

/// Emitted when a conflicted booking is admitted by override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub actor: String,
    pub at: Ms,
    pub booking: BookingSummary,
    pub findings: Vec<ConflictFinding>,
    pub justification: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_basics() {
        let s = Span::new(100, 200);
        assert_eq!(s.duration_ms(), 100);
    }

    #[test]
    fn span_overlap() {
        let a = Span::new(100, 200);
        let b = Span::new(150, 250);
        let c = Span::new(200, 300);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c)); // adjacent, not overlapping
    }

    #[test]
    fn total_duration_folds_add_ons() {
        let req = BookingRequest {
            staff_id: Ulid::new(),
            location_id: Ulid::new(),
            service_id: Ulid::new(),
            start: 0,
            base_duration_min: 60,
            add_ons: vec![
                AddOn {
                    label: Some("gloss".into()),
                    duration_min: 15,
                },
                AddOn {
                    label: None,
                    duration_min: 10,
                },
            ],
        };
        assert_eq!(req.total_duration_min(), 85);
        assert_eq!(req.core_span(), Span::new(0, 85 * MINUTE_MS));
    }

    #[test]
    fn block_carries_no_buffers() {
        let b = CommittedInterval::block(Ulid::new(), Ulid::new(), Span::new(0, 100), None);
        assert!(b.is_block());
        assert_eq!(b.applied_before, 0);
        assert_eq!(b.applied_after, 0);
    }

    #[test]
    fn effective_buffer_ms_conversion() {
        let eb = EffectiveBuffer {
            before_min: 5,
            after_min: 10,
        };
        assert_eq!(eb.before_ms(), 5 * MINUTE_MS);
        assert_eq!(eb.after_ms(), 10 * MINUTE_MS);
        assert_eq!(EffectiveBuffer::ZERO.after_ms(), 0);
    }

    #[test]
    fn rejected_never_admits() {
        let d = SchedulingDecision::Rejected {
            findings: vec![],
            system_error: true,
        };
        assert!(!d.admits());
        assert!(d.findings().is_empty());

        assert!(SchedulingDecision::Admitted.admits());
        assert!(SchedulingDecision::AdmittedWithWarning { findings: vec![] }.admits());
    }

    #[test]
    fn decision_serialization_roundtrip() {
        let d = SchedulingDecision::AdmittedByOverride {
            findings: vec![],
            justification: "double-booked on purpose".into(),
        };
        let json = serde_json::to_string(&d).unwrap();
        let decoded: SchedulingDecision = serde_json::from_str(&json).unwrap();
        assert_eq!(d, decoded);
    }
}
