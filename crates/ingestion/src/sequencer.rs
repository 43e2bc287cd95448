//! Process-wide arrival ordering

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use contracts::{Payload, Sample, StreamId};

/// Hands out monotonically increasing `arrival_sequence` numbers.
///
/// Clones share the same counter, so one sequencer can be handed to every
/// producer thread and arrival order stays comparable across streams.
#[derive(Debug, Clone, Default)]
pub struct SampleSequencer {
    next: Arc<AtomicU64>,
}

impl SampleSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the next sequence number
    #[inline]
    pub fn next_sequence(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// Build a sample stamped with the next sequence number
    pub fn sample(
        &self,
        stream_id: impl Into<StreamId>,
        raw_timestamp: f64,
        payload: Payload,
    ) -> Sample {
        Sample::new(stream_id, raw_timestamp, payload, self.next_sequence())
    }

    /// Numbers handed out so far
    pub fn issued(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_shared_counter_across_clones() {
        let a = SampleSequencer::new();
        let b = a.clone();

        let s0 = a.sample("video", 0.1, Payload::Raw(Bytes::new()));
        let s1 = b.sample("meta", 0.1, Payload::Raw(Bytes::new()));
        let s2 = a.sample("video", 0.2, Payload::Raw(Bytes::new()));

        assert_eq!(s0.arrival_sequence(), 0);
        assert_eq!(s1.arrival_sequence(), 1);
        assert_eq!(s2.arrival_sequence(), 2);
        assert_eq!(b.issued(), 3);
    }

    #[test]
    fn test_unique_across_threads() {
        let sequencer = SampleSequencer::new();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let sequencer = sequencer.clone();
                std::thread::spawn(move || {
                    (0..250).map(|_| sequencer.next_sequence()).collect::<Vec<_>>()
                })
            })
            .collect();

        let mut all: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 1000);
    }
}
