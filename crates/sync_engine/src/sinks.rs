//! Built-in `GroupSink` implementations.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use contracts::{EvictedGroup, GroupSink, SyncedGroup};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{info, warn};

/// Hands groups off to an async consumer through a bounded channel.
///
/// Never blocks the sync worker: when the channel is full the group is
/// dropped and counted.
#[derive(Debug)]
pub struct ChannelSink {
    tx: mpsc::Sender<SyncedGroup>,
    dropped: Arc<AtomicU64>,
    closed: bool,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<SyncedGroup>) -> Self {
        Self {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
            closed: false,
        }
    }

    /// Create a sink together with its receiving end
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<SyncedGroup>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }

    /// Groups lost because the receiver lagged or went away
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Shared drop counter, readable after the sink moved into the worker
    pub fn dropped_counter(&self) -> Arc<AtomicU64> {
        self.dropped.clone()
    }

    fn record_drop(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }
}

impl GroupSink for ChannelSink {
    fn on_group_ready(&mut self, group: SyncedGroup) {
        match self.tx.try_send(group) {
            Ok(()) => {}
            Err(TrySendError::Full(group)) => {
                self.record_drop();
                warn!(
                    group_id = group.group_id,
                    slot = %group.slot,
                    "group channel full, group dropped"
                );
            }
            Err(TrySendError::Closed(_)) => {
                self.record_drop();
                if !self.closed {
                    self.closed = true;
                    warn!("group receiver closed");
                }
            }
        }
    }
}

/// Writes one log line per group
#[derive(Debug, Default)]
pub struct LogSink {
    groups: u64,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Groups logged so far
    pub fn groups(&self) -> u64 {
        self.groups
    }
}

impl GroupSink for LogSink {
    fn on_group_ready(&mut self, group: SyncedGroup) {
        self.groups += 1;
        let mut streams: Vec<&str> = group.entries.keys().map(|id| id.as_str()).collect();
        streams.sort_unstable();
        info!(
            group_id = group.group_id,
            slot_s = group.slot_seconds(),
            skew_ms = group.skew() * 1000.0,
            streams = ?streams,
            "group ready"
        );
    }

    fn on_group_evicted(&mut self, evicted: &EvictedGroup) {
        warn!(
            slot_s = evicted.slot.as_secs(),
            present = ?evicted.present,
            "group evicted incomplete"
        );
    }

    fn close(&mut self) {
        info!(groups = self.groups, "log sink closed");
    }
}

/// Forwards every event to two sinks, `primary` first
#[derive(Debug)]
pub struct FanOutSink<A, B> {
    primary: A,
    secondary: B,
}

impl<A, B> FanOutSink<A, B> {
    pub fn new(primary: A, secondary: B) -> Self {
        Self { primary, secondary }
    }

    pub fn into_inner(self) -> (A, B) {
        (self.primary, self.secondary)
    }
}

impl<A: GroupSink, B: GroupSink> GroupSink for FanOutSink<A, B> {
    fn on_group_ready(&mut self, group: SyncedGroup) {
        self.secondary.on_group_ready(group.clone());
        self.primary.on_group_ready(group);
    }

    fn on_group_evicted(&mut self, evicted: &EvictedGroup) {
        self.primary.on_group_evicted(evicted);
        self.secondary.on_group_evicted(evicted);
    }

    fn close(&mut self) {
        self.primary.close();
        self.secondary.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::Slot;
    use std::collections::HashMap;

    fn group(group_id: u64) -> SyncedGroup {
        SyncedGroup {
            group_id,
            slot: Slot::new(group_id as i64, 0.25),
            entries: HashMap::new(),
        }
    }

    #[test]
    fn test_channel_sink_drops_when_full() {
        let (mut sink, mut rx) = ChannelSink::channel(1);
        sink.on_group_ready(group(0));
        sink.on_group_ready(group(1));

        assert_eq!(sink.dropped(), 1);
        assert_eq!(rx.try_recv().unwrap().group_id, 0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_channel_sink_after_receiver_dropped() {
        let (mut sink, rx) = ChannelSink::channel(4);
        let counter = sink.dropped_counter();
        drop(rx);
        sink.on_group_ready(group(0));
        sink.on_group_ready(group(1));
        assert_eq!(sink.dropped(), 2);
        assert_eq!(counter.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_fan_out_feeds_both_sinks() {
        let (channel, mut rx) = ChannelSink::channel(4);
        let mut sink = FanOutSink::new(channel, LogSink::new());
        sink.on_group_ready(group(0));
        sink.on_group_ready(group(1));
        sink.on_group_evicted(&EvictedGroup {
            slot: Slot::new(2, 0.25),
            present: vec!["meta".into()],
            age: std::time::Duration::from_secs(3),
        });
        sink.close();

        let (channel, log) = sink.into_inner();
        assert_eq!(log.groups(), 2);
        assert_eq!(channel.dropped(), 0);
        assert_eq!(rx.try_recv().unwrap().group_id, 0);
        assert_eq!(rx.try_recv().unwrap().group_id, 1);
    }
}
