//! SyncedGroup - Sync Engine output
//!
//! One completed slot holding exactly one sample per required stream.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::{Sample, Slot, StreamId};

/// Completed synchronization group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncedGroup {
    /// Emission sequence number (monotonically increasing)
    pub group_id: u64,

    /// Slot the group was emitted for
    pub slot: Slot,

    /// One sample per required stream (stream_id -> sample)
    pub entries: HashMap<StreamId, Sample>,
}

impl SyncedGroup {
    /// Slot start on the grid in seconds
    pub fn slot_seconds(&self) -> f64 {
        self.slot.as_secs()
    }

    /// Largest raw-timestamp spread between two members (seconds)
    pub fn skew(&self) -> f64 {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for sample in self.entries.values() {
            lo = lo.min(sample.raw_timestamp());
            hi = hi.max(sample.raw_timestamp());
        }
        if lo.is_finite() && hi.is_finite() {
            hi - lo
        } else {
            0.0
        }
    }

    pub fn get(&self, stream_id: &str) -> Option<&Sample> {
        self.entries.get(stream_id)
    }
}

/// Incomplete group discarded after aging past the eviction horizon
#[derive(Debug, Clone)]
pub struct EvictedGroup {
    /// Slot of the discarded group
    pub slot: Slot,

    /// Streams that had arrived
    pub present: Vec<StreamId>,

    /// Wall-clock age at eviction
    pub age: Duration,
}

/// Engine counters (for diagnostics)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineStats {
    /// Groups emitted
    pub groups_emitted: u64,

    /// Incomplete groups evicted
    pub groups_evicted: u64,

    /// Samples discarded for an invalid/unknown timestamp
    pub discarded_invalid: u64,

    /// Samples discarded during warm-up
    pub discarded_warmup: u64,

    /// Samples from streams outside the required set
    pub discarded_unknown: u64,

    /// Second sample for an already-filled stream+slot
    pub duplicates: u64,

    /// Samples for a slot that was already emitted or retired
    pub late: u64,

    /// Samples re-targeted to a neighbouring slot
    pub boundary_corrections: u64,

    /// Groups completed through nearest-match within tolerance
    pub tolerance_matches: u64,

    /// Groups currently buffered
    pub pending_groups: usize,

    /// Oldest buffered slot, if any
    pub oldest_pending_slot: Option<Slot>,
}

impl EngineStats {
    /// Total samples that never reached a group
    pub fn total_discarded(&self) -> u64 {
        self.discarded_invalid + self.discarded_warmup + self.discarded_unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Payload;
    use bytes::Bytes;

    #[test]
    fn test_group_skew() {
        let mut entries = HashMap::new();
        entries.insert(
            StreamId::from("video"),
            Sample::new("video", 3.26, Payload::Raw(Bytes::new()), 4),
        );
        entries.insert(
            StreamId::from("meta"),
            Sample::new("meta", 3.24, Payload::Raw(Bytes::new()), 3),
        );
        let group = SyncedGroup {
            group_id: 1,
            slot: Slot::new(13, 0.25),
            entries,
        };

        assert!((group.skew() - 0.02).abs() < 1e-9);
        assert!((group.slot_seconds() - 3.25).abs() < 1e-12);
        assert_eq!(group.get("meta").map(|s| s.arrival_sequence()), Some(3));
    }
}
