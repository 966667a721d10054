//! slotguard — appointment buffer-time resolution and scheduling-conflict
//! detection for salon/spa booking.
//!
//! Given a salon's configured buffer policies (global, per-service,
//! per-staff, per-location) and an enforcement mode, the [`engine::Engine`]
//! decides whether a candidate appointment may be booked against a staff
//! member's and a location's existing timeline of appointments and blocked
//! time. Buffers are frozen onto each committed interval at booking time;
//! the gap required between two adjacent bookings is always the stricter of
//! the two sides' demands.
//!
//! The engine computes; it does not own storage. Callers hydrate timelines
//! from their persistence layer, and persist new intervals after an
//! admitting decision.

pub mod audit;
pub mod engine;
pub mod limits;
pub mod model;
pub mod observability;
pub mod policy;
pub mod timeline;

pub use engine::{BookingOutcome, Engine, EngineError};
pub use model::{
    AddOn, AuditRecord, BookingRequest, CommittedInterval, ConflictFinding, ConflictKind,
    EffectiveBuffer, IntervalKind, Ms, OverrideRequest, SchedulingDecision, Side, Span,
};
pub use policy::{BufferRule, EnforcementSettings, PolicyProvider, PolicySnapshot};
