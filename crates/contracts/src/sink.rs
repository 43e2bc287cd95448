//! GroupSink trait - Output Emitter interface
//!
//! Implemented by the caller. Called from the consumer context, once per
//! completed group, in order of completion.

use crate::{EvictedGroup, SyncedGroup};

/// Receiver of completed groups
///
/// `on_group_ready` runs on the consumer task: it must be fast or hand the
/// group off (see `ChannelSink` in `sync_engine`).
pub trait GroupSink: Send {
    /// Called exactly once per completed group
    fn on_group_ready(&mut self, group: SyncedGroup);

    /// Called for each incomplete group dropped by eviction
    fn on_group_evicted(&mut self, _evicted: &EvictedGroup) {}

    /// Called once when the consumer stops
    fn close(&mut self) {}
}

impl<F> GroupSink for F
where
    F: FnMut(SyncedGroup) + Send,
{
    fn on_group_ready(&mut self, group: SyncedGroup) {
        self(group)
    }
}
