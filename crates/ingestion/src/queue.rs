//! Sample ingest queue
//!
//! Bounded multi-producer / single-consumer hand-off between source delivery
//! threads and the sync worker. `submit` never blocks: when the queue is
//! full the configured [`DropPolicy`] decides which item is lost.

use std::sync::Arc;
use std::time::Duration;

use async_channel::{bounded, Receiver, Sender, TrySendError};
use contracts::{Alignment, DropPolicy, IngestConfig, Sample, StreamId};
use tracing::{trace, warn};

use crate::config::IngestionMetrics;
use crate::error::{IngestionError, Result};

/// Item carried by the ingest queue
#[derive(Debug, Clone)]
pub enum IngestItem {
    /// A sample, optionally already aligned on the producer thread
    Sample {
        sample: Sample,
        alignment: Option<Alignment>,
    },

    /// A frame-rate hint for one stream's aligner
    RateHint { stream_id: StreamId, fps: f64 },
}

impl IngestItem {
    /// Sample to be aligned by the consumer
    pub fn sample(sample: Sample) -> Self {
        IngestItem::Sample {
            sample,
            alignment: None,
        }
    }

    pub fn stream_id(&self) -> &StreamId {
        match self {
            IngestItem::Sample { sample, .. } => sample.stream_id(),
            IngestItem::RateHint { stream_id, .. } => stream_id,
        }
    }
}

/// Result of a `submit` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Enqueued without loss
    Queued,
    /// Enqueued after discarding the oldest queued item
    DroppedOldest,
    /// The submitted item itself was discarded
    DroppedNewest,
    /// The consumer is gone
    Closed,
}

/// Constructor for the queue pair
pub struct IngestQueue;

impl IngestQueue {
    /// Create a bounded queue
    pub fn bounded(config: &IngestConfig) -> (IngestSender, IngestReceiver) {
        Self::with_metrics(config, Arc::new(IngestionMetrics::new()))
    }

    /// Create a bounded queue reporting into shared metrics
    pub fn with_metrics(
        config: &IngestConfig,
        metrics: Arc<IngestionMetrics>,
    ) -> (IngestSender, IngestReceiver) {
        let (tx, rx) = bounded(config.capacity.max(1));
        let sender = IngestSender {
            tx,
            evict: rx.clone(),
            policy: config.drop_policy,
            metrics: metrics.clone(),
        };
        let receiver = IngestReceiver { rx, metrics };
        (sender, receiver)
    }
}

/// Producer side; cheap to clone, one clone per delivery thread.
///
/// Holds a receiver handle only to pop the oldest item under
/// `DropPolicy::DropOldest`. The queue closes once every sender is dropped.
#[derive(Clone)]
pub struct IngestSender {
    tx: Sender<IngestItem>,
    evict: Receiver<IngestItem>,
    policy: DropPolicy,
    metrics: Arc<IngestionMetrics>,
}

impl IngestSender {
    /// Submit an item without blocking
    pub fn submit(&self, item: IngestItem) -> SubmitOutcome {
        let is_sample = matches!(item, IngestItem::Sample { .. });
        let outcome = match self.tx.try_send(item) {
            Ok(()) => SubmitOutcome::Queued,
            Err(TrySendError::Closed(_)) => SubmitOutcome::Closed,
            Err(TrySendError::Full(item)) => self.on_full(item),
        };

        match outcome {
            SubmitOutcome::Queued | SubmitOutcome::DroppedOldest if is_sample => {
                self.metrics.record_received()
            }
            SubmitOutcome::Closed => trace!("ingest queue closed, item discarded"),
            _ => {}
        }
        outcome
    }

    /// Convenience wrapper for an unaligned sample
    pub fn submit_sample(&self, sample: Sample) -> SubmitOutcome {
        self.submit(IngestItem::sample(sample))
    }

    fn on_full(&self, item: IngestItem) -> SubmitOutcome {
        match self.policy {
            DropPolicy::DropNewest => {
                self.record_drop(item.stream_id(), "drop_newest");
                SubmitOutcome::DroppedNewest
            }
            DropPolicy::DropOldest => {
                if let Ok(oldest) = self.evict.try_recv() {
                    self.record_drop(oldest.stream_id(), "drop_oldest");
                }
                // Another producer may have refilled the slot in between.
                match self.tx.try_send(item) {
                    Ok(()) => SubmitOutcome::DroppedOldest,
                    Err(TrySendError::Full(item)) => {
                        self.record_drop(item.stream_id(), "drop_newest");
                        SubmitOutcome::DroppedNewest
                    }
                    Err(TrySendError::Closed(_)) => SubmitOutcome::Closed,
                }
            }
        }
    }

    fn record_drop(&self, stream_id: &StreamId, policy: &'static str) {
        self.metrics.record_dropped();
        observability::record_ingest_dropped(stream_id, policy);
        warn!(stream_id = %stream_id, policy, "ingest queue full, item dropped");
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    pub fn metrics(&self) -> Arc<IngestionMetrics> {
        self.metrics.clone()
    }
}

/// Consumer side; owned by the sync worker.
pub struct IngestReceiver {
    rx: Receiver<IngestItem>,
    metrics: Arc<IngestionMetrics>,
}

impl IngestReceiver {
    /// Wait up to `timeout` for the next item
    ///
    /// `Ok(None)` means the timeout elapsed with the queue empty.
    /// `Err(QueueClosed)` means every sender is gone and the queue is drained.
    pub async fn next(&self, timeout: Duration) -> Result<Option<IngestItem>> {
        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Ok(Ok(item)) => {
                self.metrics.update_queue_len(self.rx.len());
                Ok(Some(item))
            }
            Ok(Err(_)) => Err(IngestionError::QueueClosed),
            Err(_elapsed) => Ok(None),
        }
    }

    /// Non-blocking dequeue
    pub fn try_next(&self) -> Option<IngestItem> {
        self.rx.try_recv().ok()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn metrics(&self) -> Arc<IngestionMetrics> {
        self.metrics.clone()
    }
}

impl Drop for IngestReceiver {
    fn drop(&mut self) {
        // Senders keep a receiver handle; close explicitly so they observe it.
        self.rx.close();
    }
}
