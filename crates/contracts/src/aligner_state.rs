//! AlignerState - per-stream alignment snapshot (diagnostics / stats)

use serde::{Deserialize, Serialize};

use crate::AlignMode;

/// Per-stream alignment state
///
/// Owned by exactly one aligner and mutated only by that stream's samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignerState {
    /// Seconds per slot currently in effect
    pub precision_s: f64,

    /// Phase correction mapping this stream's clock onto the grid (seconds)
    pub offset_s: f64,

    /// Offset update policy
    pub mode: AlignMode,

    /// Rate hints (frames per second) collected for precision detection
    pub observed_rate_samples: Vec<f64>,

    /// Precision frozen (configured or detected)
    pub precision_frozen: bool,

    /// Offset seeded by a first valid sample
    pub converged: bool,
}
