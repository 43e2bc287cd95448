//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Each stream carries its own monotonic presentation clock (seconds, f64)
//! - A negative timestamp is the "unknown" sentinel and is never aligned
//! - Alignment maps a raw timestamp onto an integer [`Slot`] so grouping is exact

mod aligner_state;
mod error;
mod sample;
mod sink;
mod slot;
mod stream_id;
mod stream_source;
mod sync;
mod sync_engine_config;

pub use aligner_state::AlignerState;
pub use error::*;
pub use sample::*;
pub use sink::GroupSink;
pub use slot::*;
pub use stream_id::StreamId;
pub use stream_source::{SourceCallback, SourceEvent, StreamSource};
pub use sync::*;
pub use sync_engine_config::*;
