//! Top-level scheduling policy engine.
//!
//! Owns the in-memory timelines per resource (staff member or location) and
//! exposes evaluation plus a transactional evaluate-and-commit. The
//! check-then-commit unit is made atomic by holding both affected timelines'
//! write locks, acquired in sorted id order, for the whole decision.

mod conflict;
mod decision;
mod error;
mod resolve;

pub use conflict::find_conflicts;
pub use decision::apply_enforcement;
pub use error::EngineError;
pub use resolve::resolve;

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use tokio::sync::RwLock;
use ulid::Ulid;

use crate::audit::AuditHub;
use crate::limits::MAX_INTERVALS_PER_RESOURCE;
use crate::model::{
    AuditRecord, BookingRequest, BookingSummary, CommittedInterval, EffectiveBuffer,
    OverrideRequest, SchedulingDecision, Span,
};
use crate::observability;
use crate::policy::{PolicyProvider, PolicySnapshot};
use crate::timeline::Timeline;

use conflict::{now_ms, validate_request, validate_span};
use resolve::{ResourceScope, resolve_for};

pub type SharedTimeline = Arc<RwLock<Timeline>>;

/// Decision plus the booking id committed under it, if any.
#[derive(Debug, Clone)]
pub struct BookingOutcome {
    pub decision: SchedulingDecision,
    pub booking_id: Option<Ulid>,
}

pub struct Engine {
    timelines: DashMap<Ulid, SharedTimeline>,
    policies: Arc<dyn PolicyProvider>,
    pub audit: Arc<AuditHub>,
}

/// Pure evaluation against two already-locked timelines. Buffers resolve
/// per timeline: the staff side from global+service+staff, the location
/// side from global+service+location. Findings are unioned.
fn evaluate_snapshot(
    snapshot: &PolicySnapshot,
    staff: &Timeline,
    location: &Timeline,
    req: &BookingRequest,
    override_req: Option<&OverrideRequest>,
) -> (SchedulingDecision, EffectiveBuffer, EffectiveBuffer) {
    let staff_buf = resolve_for(snapshot, req.service_id, ResourceScope::Staff(req.staff_id));
    let loc_buf = resolve_for(
        snapshot,
        req.service_id,
        ResourceScope::Location(req.location_id),
    );
    let core = req.core_span();
    let mut findings = find_conflicts(staff, &core, &staff_buf);
    findings.extend(find_conflicts(location, &core, &loc_buf));
    let decision = apply_enforcement(&snapshot.enforcement, findings, override_req);
    (decision, staff_buf, loc_buf)
}

impl Engine {
    pub fn new(policies: Arc<dyn PolicyProvider>, audit: Arc<AuditHub>) -> Self {
        Self {
            timelines: DashMap::new(),
            policies,
            audit,
        }
    }

    /// Register an empty timeline for a resource.
    pub fn register_resource(&self, id: Ulid) -> Result<(), EngineError> {
        if self.timelines.contains_key(&id) {
            return Err(EngineError::AlreadyExists(id));
        }
        self.timelines
            .insert(id, Arc::new(RwLock::new(Timeline::new(id))));
        Ok(())
    }

    /// Load a resource's committed intervals from the caller's persistence
    /// layer, replacing any timeline already held for it.
    pub fn hydrate_resource(
        &self,
        id: Ulid,
        intervals: Vec<CommittedInterval>,
    ) -> Result<(), EngineError> {
        if intervals.len() > MAX_INTERVALS_PER_RESOURCE {
            return Err(EngineError::LimitExceeded("too many intervals on resource"));
        }
        self.timelines
            .insert(id, Arc::new(RwLock::new(Timeline::hydrate(id, intervals))));
        Ok(())
    }

    pub fn timeline(&self, id: &Ulid) -> Option<SharedTimeline> {
        self.timelines.get(id).map(|e| e.value().clone())
    }

    pub async fn timeline_version(&self, id: Ulid) -> Result<u64, EngineError> {
        let tl = self.timeline(&id).ok_or(EngineError::NotFound(id))?;
        let guard = tl.read().await;
        Ok(guard.version())
    }

    pub async fn list_committed(&self, id: Ulid) -> Result<Vec<CommittedInterval>, EngineError> {
        let tl = self.timeline(&id).ok_or(EngineError::NotFound(id))?;
        let guard = tl.read().await;
        Ok(guard.iter().cloned().collect())
    }

    /// Evaluate without committing. Read-only; the same request against the
    /// same timelines and policy snapshot yields the same decision.
    pub async fn evaluate(
        &self,
        req: &BookingRequest,
        override_req: Option<&OverrideRequest>,
    ) -> Result<SchedulingDecision, EngineError> {
        validate_request(req, override_req)?;
        let (staff_tl, loc_tl) = self.affected_timelines(req)?;
        let started = Instant::now();

        let snapshot = match self.snapshot_fail_closed().await {
            Ok(s) => s,
            Err(rejected) => {
                self.publish_decision(req, override_req, &rejected, started);
                return Ok(rejected);
            }
        };

        // Lock in sorted id order, same discipline as the commit path.
        let swap = req.location_id < req.staff_id;
        let (first, second) = if swap {
            (&loc_tl, &staff_tl)
        } else {
            (&staff_tl, &loc_tl)
        };
        let g1 = first.read().await;
        let g2 = second.read().await;
        let (staff, location) = if swap { (&*g2, &*g1) } else { (&*g1, &*g2) };

        let (decision, _, _) = evaluate_snapshot(&snapshot, staff, location, req, override_req);
        drop(g2);
        drop(g1);

        self.publish_decision(req, override_req, &decision, started);
        Ok(decision)
    }

    /// Evaluate and, on an admitting decision, append one committed interval
    /// to the staff timeline and one to the location timeline under a single
    /// booking id — all while holding both write locks, so two concurrent
    /// attempts at the same slot can never both be admitted.
    pub async fn evaluate_and_commit(
        &self,
        req: &BookingRequest,
        override_req: Option<&OverrideRequest>,
    ) -> Result<BookingOutcome, EngineError> {
        validate_request(req, override_req)?;
        let (staff_tl, loc_tl) = self.affected_timelines(req)?;
        let started = Instant::now();

        let snapshot = match self.snapshot_fail_closed().await {
            Ok(s) => s,
            Err(rejected) => {
                self.publish_decision(req, override_req, &rejected, started);
                return Ok(BookingOutcome {
                    decision: rejected,
                    booking_id: None,
                });
            }
        };

        let swap = req.location_id < req.staff_id;
        let (first, second) = if swap {
            (&loc_tl, &staff_tl)
        } else {
            (&staff_tl, &loc_tl)
        };
        let mut g1 = first.write().await;
        let mut g2 = second.write().await;
        let (staff, location): (&mut Timeline, &mut Timeline) = if swap {
            (&mut *g2, &mut *g1)
        } else {
            (&mut *g1, &mut *g2)
        };

        if staff.len() >= MAX_INTERVALS_PER_RESOURCE || location.len() >= MAX_INTERVALS_PER_RESOURCE
        {
            return Err(EngineError::LimitExceeded("too many intervals on resource"));
        }

        let (decision, staff_buf, loc_buf) =
            evaluate_snapshot(&snapshot, staff, location, req, override_req);

        let booking_id = if decision.admits() {
            let id = Ulid::new();
            let core = req.core_span();
            staff.commit(CommittedInterval::appointment(
                id,
                req.staff_id,
                core,
                req.service_id,
                staff_buf.before_ms(),
                staff_buf.after_ms(),
            ));
            location.commit(CommittedInterval::appointment(
                id,
                req.location_id,
                core,
                req.service_id,
                loc_buf.before_ms(),
                loc_buf.after_ms(),
            ));
            Some(id)
        } else {
            None
        };
        drop(g2);
        drop(g1);

        self.publish_decision(req, override_req, &decision, started);
        Ok(BookingOutcome {
            decision,
            booking_id,
        })
    }

    /// Optimistic commit for callers who evaluated without holding the
    /// engine's locks: refused if the timeline moved since they read
    /// `expected_version`.
    pub async fn commit(
        &self,
        resource_id: Ulid,
        interval: CommittedInterval,
        expected_version: u64,
    ) -> Result<(), EngineError> {
        if interval.resource_id != resource_id {
            return Err(EngineError::InvalidRequest("interval resource mismatch"));
        }
        validate_span(&interval.span)?;
        let tl = self
            .timeline(&resource_id)
            .ok_or(EngineError::NotFound(resource_id))?;
        let mut guard = tl.write().await;
        if guard.len() >= MAX_INTERVALS_PER_RESOURCE {
            return Err(EngineError::LimitExceeded("too many intervals on resource"));
        }
        if guard.version() != expected_version {
            metrics::counter!(observability::COMMIT_CONFLICTS_TOTAL).increment(1);
            tracing::debug!(
                resource = %resource_id,
                expected = expected_version,
                actual = guard.version(),
                "optimistic commit refused"
            );
            return Err(EngineError::ConcurrentCommitConflict { resource_id });
        }
        guard.commit(interval);
        Ok(())
    }

    /// Commit a blocked-time entry directly. Blocks are configuration, not
    /// bookings; they bypass evaluation.
    pub async fn block(
        &self,
        resource_id: Ulid,
        span: Span,
        reason: Option<String>,
    ) -> Result<Ulid, EngineError> {
        validate_span(&span)?;
        let tl = self
            .timeline(&resource_id)
            .ok_or(EngineError::NotFound(resource_id))?;
        let mut guard = tl.write().await;
        if guard.len() >= MAX_INTERVALS_PER_RESOURCE {
            return Err(EngineError::LimitExceeded("too many intervals on resource"));
        }
        let id = Ulid::new();
        guard.commit(CommittedInterval::block(id, resource_id, span, reason));
        Ok(id)
    }

    /// Remove a committed interval (cancellation).
    pub async fn cancel(
        &self,
        resource_id: Ulid,
        interval_id: Ulid,
    ) -> Result<CommittedInterval, EngineError> {
        let tl = self
            .timeline(&resource_id)
            .ok_or(EngineError::NotFound(resource_id))?;
        let mut guard = tl.write().await;
        guard
            .remove(interval_id)
            .ok_or(EngineError::NotFound(interval_id))
    }

    fn affected_timelines(
        &self,
        req: &BookingRequest,
    ) -> Result<(SharedTimeline, SharedTimeline), EngineError> {
        let staff = self
            .timeline(&req.staff_id)
            .ok_or(EngineError::NotFound(req.staff_id))?;
        let location = self
            .timeline(&req.location_id)
            .ok_or(EngineError::NotFound(req.location_id))?;
        Ok((staff, location))
    }

    async fn snapshot_fail_closed(&self) -> Result<PolicySnapshot, SchedulingDecision> {
        match self.policies.snapshot().await {
            Ok(s) => Ok(s),
            Err(e) => {
                tracing::error!("policy store unreachable, failing closed: {e}");
                metrics::counter!(observability::POLICY_UNAVAILABLE_TOTAL).increment(1);
                Err(SchedulingDecision::Rejected {
                    findings: vec![],
                    system_error: true,
                })
            }
        }
    }

    fn publish_decision(
        &self,
        req: &BookingRequest,
        override_req: Option<&OverrideRequest>,
        decision: &SchedulingDecision,
        started: Instant,
    ) {
        metrics::histogram!(observability::EVALUATION_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());
        metrics::counter!(
            observability::EVALUATIONS_TOTAL,
            "outcome" => observability::decision_label(decision)
        )
        .increment(1);
        for f in decision.findings() {
            metrics::counter!(
                observability::FINDINGS_TOTAL,
                "kind" => observability::finding_label(&f.kind)
            )
            .increment(1);
        }

        if let SchedulingDecision::AdmittedByOverride {
            findings,
            justification,
        } = decision
        {
            let actor = override_req.map(|o| o.actor.clone()).unwrap_or_default();
            let record = AuditRecord {
                actor,
                at: now_ms(),
                booking: BookingSummary::from(req),
                findings: findings.clone(),
                justification: justification.clone(),
            };
            self.audit.publish(&record);
            metrics::counter!(observability::OVERRIDES_TOTAL).increment(1);
        } else {
            tracing::debug!(
                staff = %req.staff_id,
                location = %req.location_id,
                outcome = observability::decision_label(decision),
                findings = decision.findings().len(),
                "evaluated booking request"
            );
        }
    }
}
