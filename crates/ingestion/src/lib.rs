//! # Ingestion Pipeline
//!
//! Sample ingestion module.
//!
//! Responsibilities:
//! - Register stream sources (synthetic or real media pipelines)
//! - Stamp every sample with a process-wide `arrival_sequence`
//! - Turn capability strings into frame-rate hints
//! - Bounded, non-blocking hand-off to the single sync consumer
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{IngestionPipeline, SyntheticSource};
//!
//! let mut pipeline = IngestionPipeline::new(&config.ingest);
//! pipeline.register_source(Box::new(SyntheticSource::video("video", 4.0)))?;
//! pipeline.register_source(Box::new(SyntheticSource::metadata("meta", 4.0)))?;
//!
//! let rx = pipeline.take_receiver().unwrap();
//! pipeline.start_all()?;
//! while let Ok(Some(item)) = rx.next(config.ingest.poll_interval()).await {
//!     // Feed the sync engine
//! }
//! ```
//!
//! ## Direct producers
//!
//! ```ignore
//! let (tx, rx) = IngestQueue::bounded(&config.ingest);
//! let sequencer = SampleSequencer::new();
//! tx.submit_sample(sequencer.sample("meta", pts, payload));
//! ```

mod caps;
mod config;
mod error;
mod pipeline;
mod queue;
mod sequencer;
mod synthetic;

// Re-exports
pub use caps::parse_framerate;
pub use config::{DropPolicy, IngestConfig, IngestionMetrics, MetricsSnapshot};
pub use error::{IngestionError, Result};
pub use pipeline::IngestionPipeline;
pub use queue::{IngestItem, IngestQueue, IngestReceiver, IngestSender, SubmitOutcome};
pub use sequencer::SampleSequencer;
pub use synthetic::{SyntheticConfig, SyntheticKind, SyntheticSource};
