//! Hard input limits, checked before evaluation ever touches a timeline.

use crate::model::Ms;

/// 2000-01-01T00:00:00Z. Anything earlier is a caller bug.
pub const MIN_VALID_TIMESTAMP_MS: Ms = 946_684_800_000;

/// 2100-01-01T00:00:00Z.
pub const MAX_VALID_TIMESTAMP_MS: Ms = 4_102_444_800_000;

/// A single appointment (base + add-ons) may not exceed 24h.
pub const MAX_TOTAL_DURATION_MIN: i64 = 24 * 60;

/// A buffer longer than a day is a configuration error.
pub const MAX_BUFFER_MIN: i64 = 24 * 60;

pub const MAX_ADD_ONS: usize = 16;

pub const MAX_INTERVALS_PER_RESOURCE: usize = 100_000;

pub const MAX_JUSTIFICATION_LEN: usize = 1024;

pub const MAX_ACTOR_LEN: usize = 256;
