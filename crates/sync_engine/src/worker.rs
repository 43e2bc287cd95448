//! Single-consumer sync worker.
//!
//! Drains the ingest queue into the engine and hands completed groups to a
//! [`GroupSink`]. All aligner and group mutation happens on this task.
//! Pending groups are dropped on shutdown; they are not flushed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use contracts::{EngineStats, GroupSink};
use ingestion::{IngestItem, IngestReceiver};
use tokio::task::JoinHandle;
use tracing::{info, instrument};

use crate::engine::{InsertOutcome, SyncEngine};
use crate::error::SyncEngineError;

/// Spawns the consumer task
pub struct SyncWorker;

impl SyncWorker {
    /// Spawn the worker on the current tokio runtime.
    ///
    /// The loop ends when [`WorkerHandle::stop`] is called (checked after every
    /// poll timeout) or when every producer has dropped its sender.
    pub fn spawn<S>(engine: SyncEngine, receiver: IngestReceiver, sink: S) -> WorkerHandle
    where
        S: GroupSink + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let poll_interval = engine.config().ingest.poll_interval();
        let task = tokio::spawn(run(engine, receiver, sink, running.clone(), poll_interval));
        WorkerHandle { running, task }
    }
}

/// Handle to a running worker
#[derive(Debug)]
pub struct WorkerHandle {
    running: Arc<AtomicBool>,
    task: JoinHandle<EngineStats>,
}

impl WorkerHandle {
    /// Ask the worker to stop after its current poll
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the worker; returns the final engine counters
    pub async fn join(self) -> Result<EngineStats, SyncEngineError> {
        Ok(self.task.await?)
    }

    /// `stop` then `join`
    pub async fn shutdown(self) -> Result<EngineStats, SyncEngineError> {
        self.stop();
        self.join().await
    }
}

#[instrument(name = "sync_worker", skip_all)]
async fn run<S: GroupSink>(
    mut engine: SyncEngine,
    receiver: IngestReceiver,
    mut sink: S,
    running: Arc<AtomicBool>,
    poll_interval: Duration,
) -> EngineStats {
    info!(poll_interval_ms = poll_interval.as_millis() as u64, "sync worker started");

    let reason = loop {
        if !running.load(Ordering::Acquire) {
            break "stopped";
        }
        match receiver.next(poll_interval).await {
            Ok(Some(item)) => handle_item(&mut engine, &mut sink, item),
            Ok(None) => {}
            Err(_) => break "end of stream",
        }
        for evicted in engine.evict_stale(Instant::now()) {
            sink.on_group_evicted(&evicted);
        }
    };

    let stats = engine.stats();
    let dropped = engine.clear_pending();
    sink.close();
    info!(
        reason,
        groups_emitted = stats.groups_emitted,
        groups_evicted = stats.groups_evicted,
        dropped_pending = dropped,
        "sync worker stopped"
    );
    stats
}

fn handle_item<S: GroupSink>(engine: &mut SyncEngine, sink: &mut S, item: IngestItem) {
    let outcome = match item {
        IngestItem::Sample {
            sample,
            alignment: Some(alignment),
        } => engine.insert(sample, alignment),
        IngestItem::Sample {
            sample,
            alignment: None,
        } => engine.push(sample),
        IngestItem::RateHint { stream_id, fps } => {
            engine.observe_rate(&stream_id, fps);
            return;
        }
    };

    if let InsertOutcome::Emitted(group) = outcome {
        sink.on_group_ready(group);
    }
    for group in engine.take_ready() {
        sink.on_group_ready(group);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use contracts::{
        AlignerConfig, Alignment, IngestConfig, Payload, Slot, SyncEngineConfig, SyncedGroup,
    };
    use ingestion::{IngestQueue, SampleSequencer};
    use std::sync::Mutex;

    fn config() -> SyncEngineConfig {
        SyncEngineConfig {
            aligner: AlignerConfig {
                precision_s: Some(0.5),
                ..Default::default()
            },
            ingest: IngestConfig {
                poll_interval_ms: 10,
                ..Default::default()
            },
            ..SyncEngineConfig::with_streams(["video", "meta"])
        }
    }

    fn collector() -> (Arc<Mutex<Vec<SyncedGroup>>>, impl FnMut(SyncedGroup) + Send + 'static) {
        let groups = Arc::new(Mutex::new(Vec::new()));
        let sink_groups = groups.clone();
        (groups, move |group| sink_groups.lock().unwrap().push(group))
    }

    #[tokio::test]
    async fn test_worker_drains_until_end_of_stream() {
        let config = config();
        let (tx, rx) = IngestQueue::bounded(&config.ingest);
        let (groups, sink) = collector();
        let handle = SyncWorker::spawn(SyncEngine::new(config), rx, sink);

        let sequencer = SampleSequencer::new();
        for i in 0..5 {
            let t = 10.0 + i as f64 * 0.5;
            tx.submit_sample(sequencer.sample("meta", t, Payload::Raw(Bytes::new())));
            tx.submit_sample(sequencer.sample("video", t + 0.02, Payload::Raw(Bytes::new())));
        }
        drop(tx);

        let stats = handle.join().await.unwrap();
        assert_eq!(stats.groups_emitted, 5);

        let groups = groups.lock().unwrap();
        let ids: Vec<u64> = groups.iter().map(|g| g.group_id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_producer_side_alignment_is_honoured() {
        let config = config();
        let (tx, rx) = IngestQueue::bounded(&config.ingest);
        let (groups, sink) = collector();
        let handle = SyncWorker::spawn(SyncEngine::new(config), rx, sink);

        let slot = Alignment::Slot(Slot::new(42, 0.5));
        for (seq, stream) in ["meta", "video"].into_iter().enumerate() {
            let payload = Payload::Raw(Bytes::new());
            let sample = contracts::Sample::new(stream, 21.1, payload, seq as u64);
            tx.submit(IngestItem::Sample {
                sample,
                alignment: Some(slot),
            });
        }
        drop(tx);

        handle.join().await.unwrap();
        let groups = groups.lock().unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].slot.index(), 42);
    }

    #[tokio::test]
    async fn test_stop_flag_ends_idle_worker() {
        let config = config();
        let (_tx, rx) = IngestQueue::bounded(&config.ingest);
        let (_groups, sink) = collector();
        let handle = SyncWorker::spawn(SyncEngine::new(config), rx, sink);

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!handle.is_finished());

        let stats = tokio::time::timeout(Duration::from_secs(1), handle.shutdown())
            .await
            .expect("worker did not stop")
            .unwrap();
        assert_eq!(stats.groups_emitted, 0);
    }

    #[tokio::test]
    async fn test_tolerance_groups_reach_sink() {
        let mut config = config();
        config.tolerance_slots = 1;
        config.boundary_correction = false;
        let (tx, rx) = IngestQueue::bounded(&config.ingest);
        let (groups, sink) = collector();
        let handle = SyncWorker::spawn(SyncEngine::new(config), rx, sink);

        // meta skips slot 21, video never reaches slot 20
        let sequencer = SampleSequencer::new();
        tx.submit_sample(sequencer.sample("meta", 10.0, Payload::Raw(Bytes::new())));
        tx.submit_sample(sequencer.sample("video", 10.5, Payload::Raw(Bytes::new())));
        tx.submit_sample(sequencer.sample("meta", 11.0, Payload::Raw(Bytes::new())));
        drop(tx);

        let stats = handle.join().await.unwrap();
        assert_eq!(stats.tolerance_matches, 1);
        let groups = groups.lock().unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].slot.index(), 21);
        assert_eq!(groups[0].get("meta").unwrap().raw_timestamp(), 10.0);
        assert_eq!(groups[0].get("video").unwrap().raw_timestamp(), 10.5);
    }

    #[tokio::test]
    async fn test_rate_hints_reach_engine() {
        let mut config = config();
        config.aligner.precision_s = None;
        let (tx, rx) = IngestQueue::bounded(&config.ingest);
        let (groups, sink) = collector();
        let handle = SyncWorker::spawn(SyncEngine::new(config), rx, sink);

        for stream in ["video", "meta"] {
            for _ in 0..3 {
                tx.submit(IngestItem::RateHint {
                    stream_id: stream.into(),
                    fps: 10.0,
                });
            }
        }
        let sequencer = SampleSequencer::new();
        tx.submit_sample(sequencer.sample("video", 5.0, Payload::Raw(Bytes::new())));
        tx.submit_sample(sequencer.sample("meta", 5.01, Payload::Raw(Bytes::new())));
        drop(tx);

        handle.join().await.unwrap();
        let groups = groups.lock().unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].slot.width_ns(), 100_000_000);
    }
}
