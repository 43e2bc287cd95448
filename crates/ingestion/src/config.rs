//! Ingest queue counters

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

pub use contracts::{DropPolicy, IngestConfig};

/// Ingestion metrics
///
/// Shared by every producer callback and the consumer; all counters are
/// relaxed atomics.
#[derive(Debug, Default)]
pub struct IngestionMetrics {
    /// Samples accepted into the queue
    pub samples_received: AtomicU64,

    /// Items dropped by the backpressure policy
    pub samples_dropped: AtomicU64,

    /// Rate hints forwarded to the consumer
    pub rate_hints: AtomicU64,

    /// Capability strings without a usable frame rate
    pub caps_unparsed: AtomicU64,

    /// Queue length observed at the last dequeue
    pub queue_len: AtomicUsize,
}

impl IngestionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_received(&self) {
        self.samples_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.samples_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rate_hint(&self) {
        self.rate_hints.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_caps_unparsed(&self) {
        self.caps_unparsed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn update_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            samples_received: self.samples_received.load(Ordering::Relaxed),
            samples_dropped: self.samples_dropped.load(Ordering::Relaxed),
            rate_hints: self.rate_hints.load(Ordering::Relaxed),
            caps_unparsed: self.caps_unparsed.load(Ordering::Relaxed),
            queue_len: self.queue_len.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub samples_received: u64,
    pub samples_dropped: u64,
    pub rate_hints: u64,
    pub caps_unparsed: u64,
    pub queue_len: usize,
}
