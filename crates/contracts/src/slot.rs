//! Slot - quantized position on the shared alignment grid.
//!
//! Slots are integers so grouping never depends on floating-point equality:
//! `index` counts grid steps and `width_ns` is the grid step in nanoseconds.
//! Two samples share a slot iff both fields are equal.

use serde::{Deserialize, Serialize};
use std::fmt;

const NANOS_PER_SEC: f64 = 1_000_000_000.0;

/// A slot on an alignment grid of width `width_ns`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Slot {
    index: i64,
    width_ns: i64,
}

impl Slot {
    /// Build a slot from a grid index and the grid precision in seconds.
    pub fn new(index: i64, precision_s: f64) -> Self {
        Self {
            index,
            width_ns: precision_to_nanos(precision_s),
        }
    }

    /// Build from raw parts (used by range queries and tests).
    pub const fn from_parts(index: i64, width_ns: i64) -> Self {
        Self { index, width_ns }
    }

    #[inline]
    pub fn index(&self) -> i64 {
        self.index
    }

    #[inline]
    pub fn width_ns(&self) -> i64 {
        self.width_ns
    }

    /// Grid step in seconds.
    #[inline]
    pub fn precision_s(&self) -> f64 {
        self.width_ns as f64 / NANOS_PER_SEC
    }

    /// Start of the slot on the grid, in nanoseconds.
    #[inline]
    pub fn start_ns(&self) -> i64 {
        self.index.saturating_mul(self.width_ns)
    }

    /// Start of the slot on the grid, in seconds.
    #[inline]
    pub fn as_secs(&self) -> f64 {
        self.start_ns() as f64 / NANOS_PER_SEC
    }

    /// Neighbouring slot `steps` away on the same grid.
    #[inline]
    pub fn offset(&self, steps: i64) -> Self {
        Self {
            index: self.index + steps,
            width_ns: self.width_ns,
        }
    }

    #[inline]
    pub fn same_grid(&self, other: &Slot) -> bool {
        self.width_ns == other.width_ns
    }

    /// Number of grid steps between two slots, `None` across different grids.
    pub fn distance(&self, other: &Slot) -> Option<u64> {
        self.same_grid(other).then(|| self.index.abs_diff(other.index))
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.as_secs())
    }
}

/// Convert a precision in seconds to a whole number of nanoseconds (>= 1).
pub fn precision_to_nanos(precision_s: f64) -> i64 {
    ((precision_s * NANOS_PER_SEC).round() as i64).max(1)
}

/// Result of aligning one raw timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    /// The sample belongs to this slot
    Slot(Slot),
    /// The sample must not enter the join engine
    Discard(DiscardReason),
}

impl Alignment {
    pub fn slot(&self) -> Option<Slot> {
        match self {
            Alignment::Slot(slot) => Some(*slot),
            Alignment::Discard(_) => None,
        }
    }
}

/// Why a sample never reached a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscardReason {
    /// Negative sentinel or non-finite timestamp
    InvalidTimestamp,
    /// Inside the configured warm-up window at stream start
    Warmup,
    /// Stream is not part of the required set
    UnknownStream,
}

impl DiscardReason {
    /// Stable label for metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscardReason::InvalidTimestamp => "invalid_timestamp",
            DiscardReason::Warmup => "warmup",
            DiscardReason::UnknownStream => "unknown_stream",
        }
    }
}
