use crate::model::*;
use crate::timeline::Timeline;

use super::EngineError;

pub(crate) fn now_ms() -> Ms {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as Ms
}

pub(crate) fn validate_request(
    req: &BookingRequest,
    override_req: Option<&OverrideRequest>,
) -> Result<(), EngineError> {
    use crate::limits::*;

    if req.base_duration_min < 0 {
        return Err(EngineError::InvalidRequest("negative base duration"));
    }
    if req.add_ons.iter().any(|a| a.duration_min < 0) {
        return Err(EngineError::InvalidRequest("negative add-on duration"));
    }
    if req.total_duration_min() <= 0 {
        return Err(EngineError::InvalidRequest("non-positive total duration"));
    }
    if req.add_ons.len() > MAX_ADD_ONS {
        return Err(EngineError::LimitExceeded("too many add-ons"));
    }
    if req.total_duration_min() > MAX_TOTAL_DURATION_MIN {
        return Err(EngineError::LimitExceeded("appointment too long"));
    }
    // start bounds first: core_span() must not be computed on an
    // unvalidated start, or the end arithmetic can overflow
    if req.start < MIN_VALID_TIMESTAMP_MS || req.start > MAX_VALID_TIMESTAMP_MS {
        return Err(EngineError::LimitExceeded("timestamp out of range"));
    }
    if req.core_span().end > MAX_VALID_TIMESTAMP_MS {
        return Err(EngineError::LimitExceeded("timestamp out of range"));
    }
    if req.staff_id == req.location_id {
        return Err(EngineError::InvalidRequest("staff and location ids must differ"));
    }
    if let Some(o) = override_req {
        if o.justification.trim().is_empty() {
            return Err(EngineError::InvalidRequest("empty override justification"));
        }
        if o.justification.len() > MAX_JUSTIFICATION_LEN {
            return Err(EngineError::LimitExceeded("justification too long"));
        }
        if o.actor.trim().is_empty() {
            return Err(EngineError::InvalidRequest("empty override actor"));
        }
        if o.actor.len() > MAX_ACTOR_LEN {
            return Err(EngineError::LimitExceeded("actor too long"));
        }
    }
    Ok(())
}

pub(crate) fn validate_span(span: &Span) -> Result<(), EngineError> {
    use crate::limits::*;
    if span.start >= span.end {
        return Err(EngineError::InvalidRequest("span start must be before end"));
    }
    if span.start < MIN_VALID_TIMESTAMP_MS || span.end > MAX_VALID_TIMESTAMP_MS {
        return Err(EngineError::LimitExceeded("timestamp out of range"));
    }
    Ok(())
}

/// Check the candidate core against one resource timeline.
///
/// Committed intervals may legitimately overlap each other (advisory
/// admissions proceed, blocks can be laid over existing bookings), so every
/// interval overlapping the candidate core is consulted, not just the
/// nearest one per side. A block hidden behind a closer-starting
/// appointment still rejects.
///
/// The gap math is asymmetric: two adjacent bookings may each demand a
/// different margin, and the stricter of the two demands governs the real
/// gap needed. For the earlier neighbor that is
/// `max(neighbor.applied_after, candidate.before)`; for the later one
/// `max(candidate.after, neighbor.applied_before)`.
///
/// Block neighbors ignore buffers entirely: any core overlap is a
/// `BlockOverlap` finding, and a block ending exactly at the candidate start
/// requires no gap at all.
pub fn find_conflicts(
    timeline: &Timeline,
    core: &Span,
    buffer: &EffectiveBuffer,
) -> Vec<ConflictFinding> {
    let mut findings = Vec::new();

    for hit in timeline.overlapping(core) {
        let (side, actual) = if hit.span.start < core.start {
            (Side::Before, core.start - hit.span.end)
        } else {
            (Side::After, hit.span.start - core.end)
        };
        let (kind, required) = if hit.is_block() {
            (ConflictKind::BlockOverlap, 0)
        } else {
            let required = match side {
                Side::Before => hit.applied_after.max(buffer.before_ms()),
                Side::After => buffer.after_ms().max(hit.applied_before),
            };
            (ConflictKind::BufferShortfall, required)
        };
        findings.push(finding(timeline, hit, side, kind, required, actual));
    }

    // Gap checks against the nearest non-overlapping interval per side.
    let neighbors = timeline.neighbors(core);

    if let Some(prev) = neighbors.before.filter(|p| !p.span.overlaps(core)) {
        if !prev.is_block() {
            let actual = core.start - prev.span.end;
            let required = prev.applied_after.max(buffer.before_ms());
            if actual < required {
                findings.push(finding(
                    timeline,
                    prev,
                    Side::Before,
                    ConflictKind::BufferShortfall,
                    required,
                    actual,
                ));
            }
        }
    }

    if let Some(next) = neighbors.after.filter(|n| !n.span.overlaps(core)) {
        if !next.is_block() {
            let actual = next.span.start - core.end;
            let required = buffer.after_ms().max(next.applied_before);
            if actual < required {
                findings.push(finding(
                    timeline,
                    next,
                    Side::After,
                    ConflictKind::BufferShortfall,
                    required,
                    actual,
                ));
            }
        }
    }

    findings
}

fn finding(
    timeline: &Timeline,
    neighbor: &CommittedInterval,
    side: Side,
    kind: ConflictKind,
    required_gap_ms: Ms,
    actual_gap_ms: Ms,
) -> ConflictFinding {
    ConflictFinding {
        resource_id: timeline.resource_id(),
        neighbor: neighbor.clone(),
        side,
        kind,
        required_gap_ms,
        actual_gap_ms,
    }
}
