//! Per-stream aligner.
//!
//! Maps a stream's raw presentation timestamps onto the shared slot grid:
//!
//! ```text
//! slot = q((raw - offset) / precision)
//! ```
//!
//! where `q` is `floor` or `round` per [`RoundingPolicy`]. The offset is
//! seeded from the first valid sample so that sample sits exactly on a slot
//! start; in adaptive mode it then follows drift through a damped blend
//! that is applied only above a hysteresis threshold.

use contracts::{
    precision_to_nanos, AlignMode, AlignerConfig, AlignerState, Alignment, DiscardReason,
    RoundingPolicy, Slot, StreamId,
};
use tracing::{debug, trace};

use crate::rate::mode_rate;

/// Absorbs representation error so `3.25 / 0.25` does not floor to 12.
const FLOOR_EPSILON: f64 = 1e-9;

/// Per-stream timestamp aligner
#[derive(Debug, Clone)]
pub struct Aligner {
    stream_id: StreamId,
    config: AlignerConfig,
    state: AlignerState,
    /// Grid width the offset was seeded against
    seeded_width_ns: Option<i64>,
}

impl Aligner {
    /// Create an aligner; precision is frozen immediately when configured.
    pub fn new(stream_id: impl Into<StreamId>, config: &AlignerConfig) -> Self {
        let (precision_s, precision_frozen) = match config.precision_s {
            Some(p) => (p, true),
            None => (config.default_precision_s, false),
        };

        Self {
            stream_id: stream_id.into(),
            config: config.clone(),
            state: AlignerState {
                precision_s,
                offset_s: 0.0,
                mode: config.mode,
                observed_rate_samples: Vec::with_capacity(config.rate_hint_count),
                precision_frozen,
                converged: false,
            },
            seeded_width_ns: None,
        }
    }

    pub fn stream_id(&self) -> &StreamId {
        &self.stream_id
    }

    pub fn state(&self) -> &AlignerState {
        &self.state
    }

    /// Precision currently in effect (seconds per slot)
    pub fn precision_s(&self) -> f64 {
        self.state.precision_s
    }

    /// Feed one frame-rate hint.
    ///
    /// Returns the detected precision once enough hints have been seen;
    /// afterwards precision is frozen and further hints are ignored.
    pub fn observe_rate(&mut self, fps: f64) -> Option<f64> {
        if self.state.precision_frozen || !fps.is_finite() || fps <= 0.0 {
            return None;
        }

        self.state.observed_rate_samples.push(fps);
        if self.state.observed_rate_samples.len() < self.config.rate_hint_count.max(1) {
            return None;
        }

        let fps = mode_rate(&self.state.observed_rate_samples)?;
        self.state.precision_s = 1.0 / fps;
        self.state.precision_frozen = true;
        debug!(
            stream_id = %self.stream_id,
            fps,
            precision_s = self.state.precision_s,
            "precision detected"
        );
        Some(self.state.precision_s)
    }

    /// Map a raw timestamp onto the grid.
    pub fn align(&mut self, raw_ts: f64) -> Alignment {
        if !raw_ts.is_finite() || raw_ts < 0.0 {
            return Alignment::Discard(DiscardReason::InvalidTimestamp);
        }
        if self.config.warmup_s > 0.0 && raw_ts <= self.config.warmup_s {
            return Alignment::Discard(DiscardReason::Warmup);
        }

        let precision = self.state.precision_s;
        let width_ns = precision_to_nanos(precision);

        if self.seeded_width_ns != Some(width_ns) {
            self.seed(raw_ts, precision, width_ns);
        } else if self.state.mode == AlignMode::Adaptive {
            self.adapt(raw_ts, precision);
        }

        let index = self.quantize((raw_ts - self.state.offset_s) / precision);
        trace!(stream_id = %self.stream_id, raw_ts, index, "aligned");
        Alignment::Slot(Slot::from_parts(index, width_ns))
    }

    /// Seed (or re-seed after precision detection) the offset.
    fn seed(&mut self, raw_ts: f64, precision: f64, width_ns: i64) {
        let offset = raw_ts - self.quantize(raw_ts / precision) as f64 * precision;
        debug!(
            stream_id = %self.stream_id,
            raw_ts,
            offset_s = offset,
            reseed = self.state.converged,
            "offset seeded"
        );
        self.state.offset_s = offset;
        self.state.converged = true;
        self.seeded_width_ns = Some(width_ns);
        observability::record_aligner_offset(&self.stream_id, offset);
    }

    /// Damped offset update with hysteresis.
    ///
    /// The candidate is taken relative to the current grid, so it lies within
    /// half a slot of the current offset and one update moves the offset by at
    /// most `smoothing * precision / 2`.
    fn adapt(&mut self, raw_ts: f64, precision: f64) {
        let current = self.state.offset_s;
        let candidate = raw_ts - ((raw_ts - current) / precision).round() * precision;
        let smoothing = self.config.smoothing.clamp(0.0, 1.0);
        let blended = (1.0 - smoothing) * current + smoothing * candidate;

        if (blended - current).abs() > self.config.drift_update_threshold_s {
            trace!(
                stream_id = %self.stream_id,
                from = current,
                to = blended,
                "offset adjusted"
            );
            self.state.offset_s = blended;
            observability::record_aligner_offset(&self.stream_id, blended);
        }
    }

    fn quantize(&self, x: f64) -> i64 {
        match self.config.rounding {
            RoundingPolicy::Floor => (x + FLOOR_EPSILON).floor() as i64,
            RoundingPolicy::Nearest => x.round() as i64,
        }
    }
}
