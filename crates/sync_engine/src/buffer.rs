//! Slot-keyed group buffer.
//!
//! Holds the pending (incomplete) groups and remembers which slots have
//! already been emitted. Slots are integer keys, so lookups are exact.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::{Duration, Instant};

use contracts::{EvictedGroup, Sample, Slot, StreamId};

/// A group waiting for its remaining streams
#[derive(Debug)]
pub(crate) struct PendingGroup {
    entries: HashMap<StreamId, Sample>,
    created_at: Instant,
}

impl PendingGroup {
    fn new(created_at: Instant) -> Self {
        Self {
            entries: HashMap::new(),
            created_at,
        }
    }

    pub(crate) fn contains(&self, stream_id: &str) -> bool {
        self.entries.contains_key(stream_id)
    }

    pub(crate) fn get(&self, stream_id: &str) -> Option<&Sample> {
        self.entries.get(stream_id)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Earliest-arrived sample in the group
    pub(crate) fn earliest(&self) -> Option<&Sample> {
        self.entries.values().min_by_key(|s| s.arrival_sequence())
    }

    /// Earliest-arrived sample from a stream other than `stream_id`
    pub(crate) fn earliest_other(&self, stream_id: &str) -> Option<&Sample> {
        self.entries
            .values()
            .filter(|s| s.stream_id().as_str() != stream_id)
            .min_by_key(|s| s.arrival_sequence())
    }

    pub(crate) fn is_complete(&self, required: &[StreamId]) -> bool {
        required.iter().all(|id| self.entries.contains_key(id))
    }

    fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.created_at)
    }

    fn present(&self) -> Vec<StreamId> {
        let mut present: Vec<StreamId> = self.entries.keys().cloned().collect();
        present.sort();
        present
    }
}

/// Result of storing one sample
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum StoreResult {
    Stored,
    Duplicate,
}

/// Pending groups plus emission history
#[derive(Debug)]
pub(crate) struct SlotBuffer {
    pending: BTreeMap<Slot, PendingGroup>,
    emitted: BTreeSet<Slot>,
    history_limit: usize,
    /// Slots starting at or before this instant on the grid (ns) are retired
    retired_through_ns: Option<i64>,
}

impl SlotBuffer {
    pub(crate) fn new(history_limit: usize) -> Self {
        Self {
            pending: BTreeMap::new(),
            emitted: BTreeSet::new(),
            history_limit: history_limit.max(1),
            retired_through_ns: None,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn get(&self, slot: &Slot) -> Option<&PendingGroup> {
        self.pending.get(slot)
    }

    /// Pending slots in key order
    pub(crate) fn slots(&self) -> impl Iterator<Item = Slot> + '_ {
        self.pending.keys().copied()
    }

    /// Whether `slot` was emitted already or is older than the retained history
    pub(crate) fn is_retired(&self, slot: &Slot) -> bool {
        self.emitted.contains(slot)
            || self
                .retired_through_ns
                .is_some_and(|watermark| slot.start_ns() <= watermark)
    }

    /// Store a sample, creating the group lazily. First arrival wins.
    pub(crate) fn store(&mut self, slot: Slot, sample: Sample, now: Instant) -> StoreResult {
        let group = self
            .pending
            .entry(slot)
            .or_insert_with(|| PendingGroup::new(now));
        if group.contains(sample.stream_id()) {
            return StoreResult::Duplicate;
        }
        group.entries.insert(sample.stream_id().clone(), sample);
        StoreResult::Stored
    }

    /// Remove a sample from a pending group, dropping the group if it empties
    pub(crate) fn take_sample(&mut self, slot: &Slot, stream_id: &str) -> Option<Sample> {
        let group = self.pending.get_mut(slot)?;
        let sample = group.entries.remove(stream_id);
        if group.is_empty() {
            self.pending.remove(slot);
        }
        sample
    }

    /// Remove a group for emission and record the slot as emitted
    pub(crate) fn take_for_emit(&mut self, slot: &Slot) -> Option<HashMap<StreamId, Sample>> {
        let group = self.pending.remove(slot)?;
        self.mark_emitted(*slot);
        Some(group.entries)
    }

    fn mark_emitted(&mut self, slot: Slot) {
        self.emitted.insert(slot);
        while self.emitted.len() > self.history_limit {
            let Some(oldest) = self
                .emitted
                .iter()
                .min_by_key(|s| s.start_ns())
                .copied()
            else {
                break;
            };
            self.emitted.remove(&oldest);
            let watermark = self.retired_through_ns.unwrap_or(i64::MIN);
            self.retired_through_ns = Some(watermark.max(oldest.start_ns()));
        }
    }

    /// Pending slots on the same grid within `radius` steps of `anchor`, excluding it
    pub(crate) fn neighbours(&self, anchor: Slot, radius: u32) -> Vec<Slot> {
        let radius = i64::from(radius);
        let lo = anchor.offset(-radius);
        let hi = anchor.offset(radius);
        self.pending
            .range(lo..=hi)
            .map(|(slot, _)| *slot)
            .filter(|slot| *slot != anchor && slot.same_grid(&anchor))
            .collect()
    }

    /// Evict groups older than `horizon`
    pub(crate) fn evict_older_than(
        &mut self,
        now: Instant,
        horizon: Duration,
    ) -> Vec<EvictedGroup> {
        let stale: Vec<Slot> = self
            .pending
            .iter()
            .filter(|(_, g)| g.age(now) > horizon)
            .map(|(slot, _)| *slot)
            .collect();

        stale
            .into_iter()
            .filter_map(|slot| self.evict(slot, now))
            .collect()
    }

    /// Evict the group with the earliest slot start when over `limit`
    pub(crate) fn evict_over_capacity(&mut self, now: Instant, limit: usize) -> Vec<EvictedGroup> {
        let mut evicted = Vec::new();
        while self.pending.len() > limit.max(1) {
            let Some(oldest) = self.pending.keys().min_by_key(|s| s.start_ns()).copied() else {
                break;
            };
            evicted.extend(self.evict(oldest, now));
        }
        evicted
    }

    fn evict(&mut self, slot: Slot, now: Instant) -> Option<EvictedGroup> {
        let group = self.pending.remove(&slot)?;
        Some(EvictedGroup {
            slot,
            present: group.present(),
            age: group.age(now),
        })
    }

    /// Oldest pending slot by grid position
    pub(crate) fn oldest_slot(&self) -> Option<Slot> {
        self.pending.keys().min_by_key(|s| s.start_ns()).copied()
    }

    pub(crate) fn clear(&mut self) -> usize {
        let n = self.pending.len();
        self.pending.clear();
        n
    }
}
