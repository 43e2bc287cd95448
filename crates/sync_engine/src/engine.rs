//! Join engine: groups aligned samples by slot and emits complete groups.

use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use contracts::{
    AlignerState, Alignment, DiscardReason, EngineStats, EvictedGroup, Sample, Slot, StreamId,
    SyncEngineConfig, SyncedGroup,
};
use tracing::{debug, info, instrument, trace, warn};

use crate::aligner::Aligner;
use crate::buffer::{SlotBuffer, StoreResult};

/// What happened to one inserted sample
#[derive(Debug)]
pub enum InsertOutcome {
    /// The sample completed a group, which is handed back for emission
    Emitted(SyncedGroup),
    /// Stored; the group at `slot` is still waiting for other streams
    Buffered { slot: Slot },
    /// The stream already has a sample in that slot (first arrival kept)
    Duplicate,
    /// The slot was already emitted or retired
    Late,
    /// Never entered a group
    Discarded(DiscardReason),
}

impl InsertOutcome {
    pub fn is_emitted(&self) -> bool {
        matches!(self, InsertOutcome::Emitted(_))
    }

    /// Take the emitted group, if any
    pub fn into_group(self) -> Option<SyncedGroup> {
        match self {
            InsertOutcome::Emitted(group) => Some(group),
            _ => None,
        }
    }
}

/// Multi-stream synchronized join engine
///
/// Owns one [`Aligner`] per required stream and the pending groups. Not
/// thread-safe by itself: a single consumer owns it (see `SyncWorker`).
#[derive(Debug)]
pub struct SyncEngine {
    /// Configuration
    config: SyncEngineConfig,
    /// Per-stream aligners, created on first use
    aligners: HashMap<StreamId, Aligner>,
    /// Pending groups and emission history
    buffer: SlotBuffer,
    /// Next emitted group id
    next_group_id: u64,
    /// Evicted groups not yet collected by the caller
    evicted_backlog: Vec<EvictedGroup>,
    /// Groups completed by nearest-match, waiting for [`take_ready`](Self::take_ready)
    ready: VecDeque<SyncedGroup>,
    /// Latest slot start (ns) each stream has stored into
    progress: HashMap<StreamId, i64>,
    /// Counters
    stats: EngineStats,
}

impl SyncEngine {
    /// Create a new sync engine with the given configuration
    pub fn new(mut config: SyncEngineConfig) -> Self {
        let mut seen = Vec::with_capacity(config.required_streams.len());
        config.required_streams.retain(|id| {
            let fresh = !seen.contains(id);
            if fresh {
                seen.push(id.clone());
            }
            fresh
        });

        let buffer = SlotBuffer::new(config.buffer.emitted_history);
        info!(
            required_streams = ?config.required_streams,
            tolerance_slots = config.tolerance_slots,
            eviction_horizon_s = config.eviction_horizon_s,
            mode = ?config.aligner.mode,
            rounding = ?config.aligner.rounding,
            "sync engine created"
        );

        Self {
            config,
            aligners: HashMap::new(),
            buffer,
            next_group_id: 0,
            evicted_backlog: Vec::new(),
            ready: VecDeque::new(),
            progress: HashMap::new(),
            stats: EngineStats::default(),
        }
    }

    pub fn config(&self) -> &SyncEngineConfig {
        &self.config
    }

    /// Whether `stream_id` is one of the required streams
    pub fn is_required(&self, stream_id: &str) -> bool {
        self.config
            .required_streams
            .iter()
            .any(|id| id.as_str() == stream_id)
    }

    /// Feed a frame-rate hint to a stream's aligner.
    ///
    /// Returns the detected precision when this hint completes detection.
    pub fn observe_rate(&mut self, stream_id: &str, fps: f64) -> Option<f64> {
        if !self.is_required(stream_id) {
            trace!(stream_id, "rate hint for unknown stream ignored");
            return None;
        }
        let precision = self.aligner_mut(stream_id).observe_rate(fps)?;
        info!(stream_id, fps, precision_s = precision, "stream precision detected");
        observability::record_precision_detected(stream_id, precision);
        Some(precision)
    }

    /// Align a sample with its stream's aligner, then insert it.
    ///
    /// With `tolerance_slots > 0` a sample can also complete groups it is not
    /// part of; collect those with [`take_ready`](Self::take_ready).
    pub fn push(&mut self, sample: Sample) -> InsertOutcome {
        self.push_at(sample, Instant::now())
    }

    /// [`push`](Self::push) with an explicit wall-clock instant
    pub fn push_at(&mut self, sample: Sample, now: Instant) -> InsertOutcome {
        if !self.is_required(sample.stream_id()) {
            self.sweep(now);
            return self.discard(&sample, DiscardReason::UnknownStream);
        }
        let alignment = self
            .aligner_mut(sample.stream_id())
            .align(sample.raw_timestamp());
        self.insert_at(sample, alignment, now)
    }

    /// Insert a sample aligned elsewhere (e.g. on the producer thread)
    pub fn insert(&mut self, sample: Sample, alignment: Alignment) -> InsertOutcome {
        self.insert_at(sample, alignment, Instant::now())
    }

    /// Insert with an explicit wall-clock instant
    #[instrument(
        level = "trace",
        name = "sync_engine_insert",
        skip(self, sample, now),
        fields(stream_id = %sample.stream_id(), raw_ts = sample.raw_timestamp())
    )]
    pub fn insert_at(
        &mut self,
        sample: Sample,
        alignment: Alignment,
        now: Instant,
    ) -> InsertOutcome {
        self.sweep(now);

        let slot = match alignment {
            Alignment::Discard(reason) => return self.discard(&sample, reason),
            Alignment::Slot(slot) => slot,
        };
        if !self.is_required(sample.stream_id()) {
            return self.discard(&sample, DiscardReason::UnknownStream);
        }
        if sample.has_unknown_timestamp() {
            return self.discard(&sample, DiscardReason::InvalidTimestamp);
        }
        if self.buffer.is_retired(&slot) {
            return self.late(&sample, slot);
        }

        let stream_id = sample.stream_id().clone();
        let target = self.resolve_slot(&sample, slot);

        if self.buffer.store(target, sample, now) == StoreResult::Duplicate {
            self.stats.duplicates += 1;
            observability::record_duplicate(&stream_id);
            debug!(stream_id = %stream_id, slot = %target, "duplicate sample dropped");
            return InsertOutcome::Duplicate;
        }
        self.advance(&stream_id, target);

        let complete = self
            .buffer
            .get(&target)
            .is_some_and(|g| g.is_complete(&self.config.required_streams));

        let outcome = if complete {
            self.emit(target)
                .map(InsertOutcome::Emitted)
                .unwrap_or(InsertOutcome::Buffered { slot: target })
        } else {
            trace!(stream_id = %stream_id, slot = %target, "sample buffered");
            InsertOutcome::Buffered { slot: target }
        };
        if self.config.tolerance_slots > 0 {
            self.match_within_tolerance(now);
        }

        let overflow = self
            .buffer
            .evict_over_capacity(now, self.config.buffer.max_pending_groups);
        self.note_evicted(overflow);
        observability::record_buffer_groups(self.buffer.len());

        outcome
    }

    /// Evict incomplete groups older than the eviction horizon.
    ///
    /// Returns every group evicted since the last call, including those
    /// evicted implicitly during inserts.
    pub fn evict_stale(&mut self, now: Instant) -> Vec<EvictedGroup> {
        self.sweep(now);
        observability::record_buffer_groups(self.buffer.len());
        self.take_evicted()
    }

    /// Collect groups completed by nearest-match, oldest first
    pub fn take_ready(&mut self) -> Vec<SyncedGroup> {
        self.ready.drain(..).collect()
    }

    /// Collect groups evicted during inserts
    pub fn take_evicted(&mut self) -> Vec<EvictedGroup> {
        std::mem::take(&mut self.evicted_backlog)
    }

    /// Drop every pending group (shutdown); returns how many were dropped
    pub fn clear_pending(&mut self) -> usize {
        let dropped = self.buffer.clear();
        observability::record_buffer_groups(0);
        dropped
    }

    /// Snapshot of the engine counters
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            pending_groups: self.buffer.len(),
            oldest_pending_slot: self.buffer.oldest_slot(),
            ..self.stats.clone()
        }
    }

    /// Alignment state of one stream, once it has seen a sample or hint
    pub fn aligner_state(&self, stream_id: &str) -> Option<&AlignerState> {
        self.aligners.get(stream_id).map(Aligner::state)
    }

    /// Number of pending groups
    pub fn pending_groups(&self) -> usize {
        self.buffer.len()
    }

    fn aligner_mut(&mut self, stream_id: &str) -> &mut Aligner {
        let config = &self.config.aligner;
        self.aligners
            .entry(StreamId::from(stream_id))
            .or_insert_with(|| Aligner::new(stream_id, config))
    }

    /// Boundary correction for asymmetric path latency.
    ///
    /// Compares against the earliest-arrived sample of another stream in the
    /// natural slot. More than half a slot apart moves the sample one slot
    /// towards it, unless that slot is retired or already holds this stream.
    fn resolve_slot(&mut self, sample: &Sample, slot: Slot) -> Slot {
        if !self.config.boundary_correction {
            return slot;
        }
        let stream_id = sample.stream_id();
        let Some(group) = self.buffer.get(&slot) else {
            return slot;
        };
        if group.contains(stream_id) {
            return slot;
        }
        let Some(reference) = group.earliest_other(stream_id) else {
            return slot;
        };

        let half = slot.precision_s() / 2.0;
        let delta = reference.raw_timestamp() - sample.raw_timestamp();
        let step = if delta > half {
            -1
        } else if -delta > half {
            1
        } else {
            return slot;
        };

        let target = slot.offset(step);
        let occupied = self
            .buffer
            .get(&target)
            .is_some_and(|g| g.contains(stream_id));
        if occupied || self.buffer.is_retired(&target) {
            return slot;
        }

        self.stats.boundary_corrections += 1;
        observability::record_boundary_correction(stream_id, step);
        debug!(
            stream_id = %stream_id,
            from = %slot,
            to = %target,
            delta_s = delta,
            "boundary correction"
        );
        target
    }

    fn advance(&mut self, stream_id: &StreamId, slot: Slot) {
        let latest = self.progress.entry(stream_id.clone()).or_insert(i64::MIN);
        *latest = (*latest).max(slot.start_ns());
    }

    /// Whether no exact partner can still arrive for the group at `slot`.
    ///
    /// Every stream missing from it must already have stored into a later
    /// slot. With boundary correction a stream may still step back one slot,
    /// so it has to be two slots past.
    fn is_settled(&self, slot: Slot) -> bool {
        let Some(group) = self.buffer.get(&slot) else {
            return false;
        };
        let margin = if self.config.boundary_correction { 1 } else { 0 };
        let past = slot.offset(margin).start_ns();
        self.config
            .required_streams
            .iter()
            .filter(|id| !group.contains(id))
            .all(|id| self.progress.get(id).is_some_and(|&latest| latest > past))
    }

    /// Nearest-match completion across neighbouring slots.
    ///
    /// Only settled groups take part, so a sample is never borrowed away from
    /// a slot that could still complete exactly. Each round picks the anchor
    /// whose worst raw-timestamp delta is smallest (ties go to the earliest
    /// arrival) and moves the chosen samples into it.
    fn match_within_tolerance(&mut self, now: Instant) {
        while let Some((anchor, picks)) = self.best_tolerance_match() {
            for (slot, stream_id) in picks {
                if let Some(sample) = self.buffer.take_sample(&slot, &stream_id) {
                    trace!(stream_id = %stream_id, from = %slot, to = %anchor, "tolerance match");
                    self.buffer.store(anchor, sample, now);
                }
            }
            self.stats.tolerance_matches += 1;
            match self.emit(anchor) {
                Some(group) => self.ready.push_back(group),
                None => break,
            }
        }
    }

    fn best_tolerance_match(&self) -> Option<(Slot, Vec<(Slot, StreamId)>)> {
        let settled: Vec<Slot> = self
            .buffer
            .slots()
            .filter(|slot| self.is_settled(*slot))
            .collect();

        let mut best: Option<(f64, u64, Slot, Vec<(Slot, StreamId)>)> = None;
        for &anchor in &settled {
            let Some(group) = self.buffer.get(&anchor) else {
                continue;
            };
            let Some(reference) = group.earliest().map(Sample::raw_timestamp) else {
                continue;
            };
            let neighbours: Vec<Slot> = self
                .buffer
                .neighbours(anchor, self.config.tolerance_slots)
                .into_iter()
                .filter(|slot| settled.contains(slot))
                .collect();

            let mut cost = 0.0_f64;
            let mut first_arrival = u64::MAX;
            let mut picks = Vec::new();
            for stream_id in &self.config.required_streams {
                if group.contains(stream_id) {
                    continue;
                }
                let candidate = neighbours
                    .iter()
                    .filter_map(|slot| {
                        let sample = self.buffer.get(slot)?.get(stream_id)?;
                        Some((
                            *slot,
                            (sample.raw_timestamp() - reference).abs(),
                            sample.arrival_sequence(),
                        ))
                    })
                    .min_by(|a, b| a.1.total_cmp(&b.1).then(a.2.cmp(&b.2)));
                let Some((slot, delta, seq)) = candidate else {
                    picks.clear();
                    break;
                };
                cost = cost.max(delta);
                first_arrival = first_arrival.min(seq);
                picks.push((slot, stream_id.clone()));
            }
            if picks.is_empty() {
                continue;
            }

            let better = match &best {
                None => true,
                Some((best_cost, best_seq, _, _)) => cost
                    .total_cmp(best_cost)
                    .then(first_arrival.cmp(best_seq))
                    .is_lt(),
            };
            if better {
                best = Some((cost, first_arrival, anchor, picks));
            }
        }
        best.map(|(_, _, anchor, picks)| (anchor, picks))
    }

    fn emit(&mut self, slot: Slot) -> Option<SyncedGroup> {
        let entries = self.buffer.take_for_emit(&slot)?;
        let group = SyncedGroup {
            group_id: self.next_group_id,
            slot,
            entries,
        };
        self.next_group_id += 1;
        self.stats.groups_emitted += 1;

        observability::record_group_emitted(&group);
        debug!(
            group_id = group.group_id,
            slot = %slot,
            skew_ms = group.skew() * 1000.0,
            "group emitted"
        );
        Some(group)
    }

    fn discard(&mut self, sample: &Sample, reason: DiscardReason) -> InsertOutcome {
        match reason {
            DiscardReason::InvalidTimestamp => self.stats.discarded_invalid += 1,
            DiscardReason::Warmup => self.stats.discarded_warmup += 1,
            DiscardReason::UnknownStream => self.stats.discarded_unknown += 1,
        }
        observability::record_sample_discarded(sample.stream_id(), reason);
        trace!(
            stream_id = %sample.stream_id(),
            raw_ts = sample.raw_timestamp(),
            reason = reason.as_str(),
            "sample discarded"
        );
        InsertOutcome::Discarded(reason)
    }

    fn late(&mut self, sample: &Sample, slot: Slot) -> InsertOutcome {
        self.stats.late += 1;
        observability::record_late(sample.stream_id());
        debug!(stream_id = %sample.stream_id(), slot = %slot, "late sample dropped");
        InsertOutcome::Late
    }

    fn sweep(&mut self, now: Instant) {
        let evicted = self
            .buffer
            .evict_older_than(now, self.config.eviction_horizon());
        self.note_evicted(evicted);
    }

    fn note_evicted(&mut self, evicted: Vec<EvictedGroup>) {
        for group in &evicted {
            self.stats.groups_evicted += 1;
            observability::record_group_evicted(group);
            warn!(
                slot = %group.slot,
                present = ?group.present,
                age_ms = group.age.as_millis() as u64,
                "incomplete group evicted"
            );
        }
        self.evicted_backlog.extend(evicted);

        // Callers that never collect evictions must not grow this without bound
        let cap = self.config.buffer.max_pending_groups.max(1);
        if self.evicted_backlog.len() > cap {
            let excess = self.evicted_backlog.len() - cap;
            self.evicted_backlog.drain(..excess);
        }
    }
}
