//! # Sync Engine
//!
//! 多流时间戳对齐与同步组装引擎。
//!
//! 负责：
//! - 每流对齐器：原始时间戳 -> 整数槽位 (FIXED / ADAPTIVE 偏移)
//! - 帧率提示检测槽宽
//! - 按槽位分组、边界修正、容差最近匹配
//! - 超龄未完成组驱逐
//! - 单消费者 worker，输出 `SyncedGroup`
//!
//! ## 使用示例
//!
//! ```ignore
//! use sync_engine::{InsertOutcome, SyncEngine, SyncEngineConfig};
//!
//! let config = SyncEngineConfig {
//!     tolerance_slots: 0,
//!     ..SyncEngineConfig::with_streams(["video", "meta"])
//! };
//!
//! let mut engine = SyncEngine::new(config);
//!
//! // Push samples as they arrive
//! if let InsertOutcome::Emitted(group) = engine.push(sample) {
//!     // Handle synchronized group
//! }
//! // Groups completed by nearest-match (tolerance_slots > 0)
//! for group in engine.take_ready() {
//!     // ...
//! }
//! ```
//!
//! With a queue and a worker task:
//!
//! ```ignore
//! let (tx, rx) = IngestQueue::bounded(&config.ingest);
//! let handle = SyncWorker::spawn(SyncEngine::new(config), rx, LogSink::new());
//! // producers call tx.submit(...)
//! let stats = handle.shutdown().await?;
//! ```

mod aligner;
mod buffer;
mod engine;
mod error;
mod rate;
mod sinks;
mod worker;

pub use aligner::Aligner;
pub use engine::{InsertOutcome, SyncEngine};
pub use error::SyncEngineError;
pub use sinks::{ChannelSink, FanOutSink, LogSink};
pub use worker::{SyncWorker, WorkerHandle};

// Re-export contracts types
pub use contracts::{
    AlignMode, AlignerConfig, AlignerState, Alignment, BufferConfig, DiscardReason, EngineStats,
    EvictedGroup, GroupSink, RoundingPolicy, Sample, Slot, SyncEngineConfig, SyncedGroup,
};
