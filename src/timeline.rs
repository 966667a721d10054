//! Per-resource ordered view of committed intervals.
//!
//! The index is a query structure only: it trusts its callers. The
//! no-core-overlap invariant between appointments is established by the
//! engine's admission decisions, never re-validated on insert.

use ulid::Ulid;

use crate::model::{CommittedInterval, Span};

/// Nearest committed intervals on each side of a candidate core span.
#[derive(Debug, Clone, Copy)]
pub struct Neighbors<'a> {
    pub before: Option<&'a CommittedInterval>,
    pub after: Option<&'a CommittedInterval>,
}

/// One resource's timeline: appointments and blocks sorted by core start,
/// plus a version counter for optimistic commits.
#[derive(Debug, Clone)]
pub struct Timeline {
    resource_id: Ulid,
    intervals: Vec<CommittedInterval>,
    version: u64,
}

impl Timeline {
    pub fn new(resource_id: Ulid) -> Self {
        Self {
            resource_id,
            intervals: Vec::new(),
            version: 0,
        }
    }

    /// Bulk-load from the caller's persistence layer. Input order is not
    /// trusted.
    pub fn hydrate(resource_id: Ulid, mut intervals: Vec<CommittedInterval>) -> Self {
        intervals.sort_by_key(|i| i.span.start);
        Self {
            resource_id,
            intervals,
            version: 0,
        }
    }

    pub fn resource_id(&self) -> Ulid {
        self.resource_id
    }

    /// Bumped on every mutation. Callers who evaluated outside the engine's
    /// locks compare this before committing.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CommittedInterval> {
        self.intervals.iter()
    }

    /// Insert maintaining sort order by core start.
    pub fn commit(&mut self, interval: CommittedInterval) {
        debug_assert_eq!(interval.resource_id, self.resource_id);
        let pos = self
            .intervals
            .binary_search_by_key(&interval.span.start, |i| i.span.start)
            .unwrap_or_else(|e| e);
        self.intervals.insert(pos, interval);
        self.version += 1;
    }

    /// Remove by id (cancellation). Returns the removed interval.
    pub fn remove(&mut self, id: Ulid) -> Option<CommittedInterval> {
        let pos = self.intervals.iter().position(|i| i.id == id)?;
        self.version += 1;
        Some(self.intervals.remove(pos))
    }

    /// Nearest neighbors of a candidate core span, partitioned by interval
    /// start: the last interval starting before `core.start` and the first
    /// starting at or after it. Intervals overlapping the core therefore
    /// still surface as a neighbor with a negative gap, which is what the
    /// conflict checks need for blocks and warned-through bookings.
    pub fn neighbors(&self, core: &Span) -> Neighbors<'_> {
        let idx = self.intervals.partition_point(|i| i.span.start < core.start);
        Neighbors {
            before: idx.checked_sub(1).map(|p| &self.intervals[p]),
            after: self.intervals.get(idx),
        }
    }

    /// Intervals whose span overlaps the query window. Binary search skips
    /// everything starting at or after `query.end`.
    pub fn overlapping(&self, query: &Span) -> impl Iterator<Item = &CommittedInterval> {
        let right_bound = self.intervals.partition_point(|i| i.span.start < query.end);
        self.intervals[..right_bound]
            .iter()
            .filter(move |i| i.span.end > query.start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MINUTE_MS;

    fn appt(resource_id: Ulid, start: i64, end: i64) -> CommittedInterval {
        CommittedInterval::appointment(
            Ulid::new(),
            resource_id,
            Span::new(start, end),
            Ulid::new(),
            0,
            10 * MINUTE_MS,
        )
    }

    #[test]
    fn commit_keeps_start_order() {
        let rid = Ulid::new();
        let mut tl = Timeline::new(rid);
        tl.commit(appt(rid, 300, 400));
        tl.commit(appt(rid, 100, 200));
        tl.commit(appt(rid, 200, 300));
        let starts: Vec<_> = tl.iter().map(|i| i.span.start).collect();
        assert_eq!(starts, vec![100, 200, 300]);
        assert_eq!(tl.version(), 3);
    }

    #[test]
    fn hydrate_sorts_unordered_input() {
        let rid = Ulid::new();
        let tl = Timeline::hydrate(rid, vec![appt(rid, 500, 600), appt(rid, 100, 200)]);
        let starts: Vec<_> = tl.iter().map(|i| i.span.start).collect();
        assert_eq!(starts, vec![100, 500]);
        assert_eq!(tl.version(), 0);
    }

    #[test]
    fn neighbors_between_two_intervals() {
        let rid = Ulid::new();
        let mut tl = Timeline::new(rid);
        tl.commit(appt(rid, 100, 200));
        tl.commit(appt(rid, 500, 600));

        let n = tl.neighbors(&Span::new(300, 400));
        assert_eq!(n.before.unwrap().span, Span::new(100, 200));
        assert_eq!(n.after.unwrap().span, Span::new(500, 600));
    }

    #[test]
    fn neighbors_empty_timeline() {
        let tl = Timeline::new(Ulid::new());
        let n = tl.neighbors(&Span::new(0, 100));
        assert!(n.before.is_none());
        assert!(n.after.is_none());
    }

    #[test]
    fn neighbors_only_one_side() {
        let rid = Ulid::new();
        let mut tl = Timeline::new(rid);
        tl.commit(appt(rid, 100, 200));

        let n = tl.neighbors(&Span::new(300, 400));
        assert!(n.before.is_some());
        assert!(n.after.is_none());

        let n = tl.neighbors(&Span::new(0, 50));
        assert!(n.before.is_none());
        assert_eq!(n.after.unwrap().span, Span::new(100, 200));
    }

    #[test]
    fn overlapping_interval_surfaces_as_neighbor() {
        // A block spanning the whole candidate starts before it, so it must
        // come back on the before side with a negative gap.
        let rid = Ulid::new();
        let mut tl = Timeline::new(rid);
        tl.commit(CommittedInterval::block(
            Ulid::new(),
            rid,
            Span::new(100, 500),
            None,
        ));
        let n = tl.neighbors(&Span::new(200, 300));
        let before = n.before.unwrap();
        assert!(before.is_block());
        assert!(before.span.end > 200);
    }

    #[test]
    fn interval_starting_at_core_start_is_after_neighbor() {
        let rid = Ulid::new();
        let mut tl = Timeline::new(rid);
        tl.commit(appt(rid, 300, 400));
        let n = tl.neighbors(&Span::new(300, 350));
        assert!(n.before.is_none());
        assert_eq!(n.after.unwrap().span.start, 300);
    }

    #[test]
    fn remove_bumps_version() {
        let rid = Ulid::new();
        let mut tl = Timeline::new(rid);
        let i = appt(rid, 100, 200);
        let id = i.id;
        tl.commit(i);
        assert_eq!(tl.version(), 1);
        assert!(tl.remove(id).is_some());
        assert_eq!(tl.version(), 2);
        assert!(tl.is_empty());
        // unknown id: no bump
        assert!(tl.remove(Ulid::new()).is_none());
        assert_eq!(tl.version(), 2);
    }

    #[test]
    fn overlapping_skips_disjoint() {
        let rid = Ulid::new();
        let mut tl = Timeline::new(rid);
        tl.commit(appt(rid, 100, 200));
        tl.commit(appt(rid, 450, 600));
        tl.commit(appt(rid, 1000, 1100));

        let hits: Vec<_> = tl.overlapping(&Span::new(500, 800)).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].span, Span::new(450, 600));

        // ends exactly at query start: half-open, not overlapping
        let hits: Vec<_> = tl.overlapping(&Span::new(200, 300)).collect();
        assert!(hits.is_empty());
    }
}
