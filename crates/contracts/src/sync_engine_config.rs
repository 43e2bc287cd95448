//! Sync engine configuration contracts that can be shared across crates.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::StreamId;

/// Sync engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncEngineConfig {
    /// Streams that must all contribute a sample before a group is emitted
    pub required_streams: Vec<StreamId>,

    /// Slots two members of a group may be apart (0 = strict slot equality)
    #[serde(default)]
    pub tolerance_slots: u32,

    /// Maximum wall-clock age of an incomplete group (seconds)
    #[serde(default = "default_eviction_horizon_s")]
    pub eviction_horizon_s: f64,

    /// Re-target samples across a slot boundary on asymmetric path latency
    #[serde(default = "default_boundary_correction")]
    pub boundary_correction: bool,

    /// Per-stream aligner configuration
    #[serde(default)]
    pub aligner: AlignerConfig,

    /// Group buffer configuration
    #[serde(default)]
    pub buffer: BufferConfig,

    /// Ingest queue configuration
    #[serde(default)]
    pub ingest: IngestConfig,
}

impl Default for SyncEngineConfig {
    fn default() -> Self {
        Self {
            required_streams: Vec::new(),
            tolerance_slots: 0,
            eviction_horizon_s: default_eviction_horizon_s(),
            boundary_correction: default_boundary_correction(),
            aligner: AlignerConfig::default(),
            buffer: BufferConfig::default(),
            ingest: IngestConfig::default(),
        }
    }
}

impl SyncEngineConfig {
    /// Config with the given required streams and defaults elsewhere
    pub fn with_streams<I, S>(streams: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<StreamId>,
    {
        Self {
            required_streams: streams.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Eviction horizon as a `Duration`
    ///
    /// Saturates at `Duration::MAX`, so an infinite horizon never evicts.
    pub fn eviction_horizon(&self) -> Duration {
        Duration::try_from_secs_f64(self.eviction_horizon_s.max(0.0)).unwrap_or(Duration::MAX)
    }
}

fn default_eviction_horizon_s() -> f64 {
    2.0
}

fn default_boundary_correction() -> bool {
    true
}

/// Offset update policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignMode {
    /// Offset frozen after the first valid sample
    #[default]
    Fixed,
    /// Offset follows drift through bounded smoothing with hysteresis
    Adaptive,
}

/// Quantization applied when mapping a corrected timestamp onto the grid
///
/// `Floor` (default) keeps each slot on `[start, start + precision)`, so a
/// sample that runs slightly ahead of its partner stays one slot behind it:
/// at 0.25s, meta 3.24 lands in slot 3.00 next to video 3.26 in slot 3.25.
/// Choose `Nearest` when paired streams jitter around the slot boundaries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingPolicy {
    /// `floor`: a slot covers `[start, start + precision)`
    #[default]
    Floor,
    /// `round`: a slot covers `[start - precision/2, start + precision/2)`
    Nearest,
}

/// Per-stream aligner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignerConfig {
    /// Explicit seconds per slot; `None` enables rate-hint detection
    pub precision_s: Option<f64>,

    /// Precision used until detection completes
    pub default_precision_s: f64,

    /// Offset update policy
    pub mode: AlignMode,

    /// Grid quantization
    pub rounding: RoundingPolicy,

    /// Minimum blended offset change applied in adaptive mode (seconds)
    pub drift_update_threshold_s: f64,

    /// Weight of the candidate offset in the adaptive blend (0, 1]
    pub smoothing: f64,

    /// Samples at or before this raw timestamp are discarded (seconds, 0 = off)
    pub warmup_s: f64,

    /// Rate hints needed before precision is detected
    pub rate_hint_count: usize,
}

impl Default for AlignerConfig {
    fn default() -> Self {
        Self {
            precision_s: None,
            default_precision_s: 0.25,
            mode: AlignMode::Fixed,
            rounding: RoundingPolicy::Floor,
            drift_update_threshold_s: 0.01,
            smoothing: 0.2,
            warmup_s: 0.0,
            rate_hint_count: 3,
        }
    }
}

/// Group buffer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Hard cap on incomplete groups; the oldest slot is evicted beyond it
    pub max_pending_groups: usize,

    /// Emitted slots remembered to reject late duplicates
    pub emitted_history: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            max_pending_groups: 1024,
            emitted_history: 4096,
        }
    }
}

/// Ingest queue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Queue capacity
    pub capacity: usize,

    /// Policy when the queue is full
    pub drop_policy: DropPolicy,

    /// Consumer poll timeout (milliseconds)
    pub poll_interval_ms: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            capacity: 256,
            drop_policy: DropPolicy::DropOldest,
            poll_interval_ms: 100,
        }
    }
}

impl IngestConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// Backpressure drop policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropPolicy {
    /// 丢弃最旧的样本
    #[default]
    DropOldest,
    /// 丢弃最新的样本
    DropNewest,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_minimal_json() {
        let config: SyncEngineConfig =
            serde_json::from_str(r#"{ "required_streams": ["video", "meta"] }"#).unwrap();
        assert_eq!(config.required_streams.len(), 2);
        assert_eq!(config.tolerance_slots, 0);
        assert!(config.boundary_correction);
        assert_eq!(config.aligner.mode, AlignMode::Fixed);
        assert_eq!(config.aligner.rounding, RoundingPolicy::Floor);
        assert!(config.aligner.precision_s.is_none());
        assert_eq!(config.ingest.drop_policy, DropPolicy::DropOldest);
        assert_eq!(config.eviction_horizon(), Duration::from_secs(2));
    }

    #[test]
    fn test_eviction_horizon_saturates() {
        let mut config = SyncEngineConfig::with_streams(["video"]);
        for horizon in [1e20, f64::INFINITY] {
            config.eviction_horizon_s = horizon;
            assert_eq!(config.eviction_horizon(), Duration::MAX);
        }
        config.eviction_horizon_s = f64::NAN;
        assert_eq!(config.eviction_horizon(), Duration::ZERO);
        config.eviction_horizon_s = -3.0;
        assert_eq!(config.eviction_horizon(), Duration::ZERO);
    }

    #[test]
    fn test_enum_spelling() {
        let config: AlignerConfig =
            serde_json::from_str(r#"{ "mode": "adaptive", "rounding": "nearest" }"#).unwrap();
        assert_eq!(config.mode, AlignMode::Adaptive);
        assert_eq!(config.rounding, RoundingPolicy::Nearest);
        assert_eq!(config.rate_hint_count, 3);
    }
}
