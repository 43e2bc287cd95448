//! Ingestion Pipeline main entry

use std::collections::HashMap;
use std::sync::Arc;

use contracts::{IngestConfig, SourceCallback, SourceEvent, StreamId, StreamSource};
use tracing::{debug, info, instrument, trace};

use crate::caps::parse_framerate;
use crate::config::IngestionMetrics;
use crate::error::{IngestionError, Result};
use crate::queue::{IngestItem, IngestQueue, IngestReceiver, IngestSender};
use crate::sequencer::SampleSequencer;

/// Ingestion Pipeline
///
/// Owns the registered sources and the ingest queue; every source delivers
/// into the same queue through its own callback.
pub struct IngestionPipeline {
    /// Registered sources
    sources: HashMap<StreamId, Box<dyn StreamSource>>,

    /// Shared metrics
    metrics: Arc<IngestionMetrics>,

    /// Arrival sequence shared by all sources
    sequencer: SampleSequencer,

    /// Producer handle (released once sources are running)
    tx: Option<IngestSender>,

    /// Consumer handle
    rx: Option<IngestReceiver>,
}

impl IngestionPipeline {
    /// Create new Ingestion Pipeline
    pub fn new(config: &IngestConfig) -> Self {
        let metrics = Arc::new(IngestionMetrics::new());
        let (tx, rx) = IngestQueue::with_metrics(config, metrics.clone());

        Self {
            sources: HashMap::new(),
            metrics,
            sequencer: SampleSequencer::new(),
            tx: Some(tx),
            rx: Some(rx),
        }
    }

    /// Register a stream source
    #[instrument(
        name = "ingestion_register_source",
        skip(self, source),
        fields(stream_id = %source.stream_id())
    )]
    pub fn register_source(&mut self, source: Box<dyn StreamSource>) -> Result<()> {
        let stream_id = StreamId::from(source.stream_id());
        if self.sources.contains_key(&stream_id) {
            return Err(IngestionError::AlreadyRegistered {
                stream_id: stream_id.to_string(),
            });
        }
        debug!(stream_id = %stream_id, "registered stream source");
        self.sources.insert(stream_id, source);
        Ok(())
    }

    /// Start all registered sources
    #[instrument(name = "ingestion_start_all", skip(self))]
    pub fn start_all(&self) -> Result<()> {
        let tx = self.tx.as_ref().ok_or(IngestionError::QueueClosed)?;
        info!(count = self.sources.len(), "starting all stream sources");
        for (stream_id, source) in &self.sources {
            if !source.is_listening() {
                debug!(stream_id = %stream_id, "starting source");
                source.listen(self.callback_for(stream_id.clone(), tx.clone()));
            }
        }
        Ok(())
    }

    /// Start a single registered source
    pub fn start_source(&self, stream_id: &str) -> Result<()> {
        let tx = self.tx.as_ref().ok_or(IngestionError::QueueClosed)?;
        let (id, source) = self.sources.get_key_value(stream_id).ok_or_else(|| {
            IngestionError::UnknownStream {
                stream_id: stream_id.to_string(),
            }
        })?;
        source.listen(self.callback_for(id.clone(), tx.clone()));
        Ok(())
    }

    /// Stop all sources
    #[instrument(name = "ingestion_stop_all", skip(self))]
    pub fn stop_all(&self) {
        info!(count = self.sources.len(), "stopping all stream sources");
        for (stream_id, source) in &self.sources {
            if source.is_listening() {
                debug!(stream_id = %stream_id, "stopping source");
                source.stop();
            }
        }
    }

    /// Drop the pipeline's own producer handle
    ///
    /// Afterwards the queue closes as soon as every running source has
    /// finished and dropped its callback.
    pub fn release_sender(&mut self) {
        self.tx = None;
    }

    /// Get the consumer handle
    ///
    /// Note: Can only be called once, subsequent calls return None
    pub fn take_receiver(&mut self) -> Option<IngestReceiver> {
        self.rx.take()
    }

    pub fn metrics(&self) -> Arc<IngestionMetrics> {
        self.metrics.clone()
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    fn callback_for(&self, stream_id: StreamId, tx: IngestSender) -> SourceCallback {
        let sequencer = self.sequencer.clone();
        let metrics = self.metrics.clone();

        Arc::new(move |event| match event {
            SourceEvent::Sample {
                raw_timestamp,
                payload,
            } => {
                observability::record_sample_received(&stream_id);
                let sample = sequencer.sample(stream_id.clone(), raw_timestamp, payload);
                tx.submit(IngestItem::sample(sample));
            }
            SourceEvent::Caps(caps) => match parse_framerate(&caps) {
                Some(fps) => {
                    metrics.record_rate_hint();
                    tx.submit(IngestItem::RateHint {
                        stream_id: stream_id.clone(),
                        fps,
                    });
                }
                None => {
                    metrics.record_caps_unparsed();
                    trace!(stream_id = %stream_id, caps = %caps, "caps without frame rate");
                }
            },
        })
    }
}

impl Drop for IngestionPipeline {
    fn drop(&mut self) {
        self.stop_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::SyntheticSource;
    use std::time::Duration;

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut pipeline = IngestionPipeline::new(&IngestConfig::default());
        pipeline
            .register_source(Box::new(SyntheticSource::video("video", 4.0)))
            .unwrap();
        let err = pipeline
            .register_source(Box::new(SyntheticSource::metadata("video", 4.0)))
            .unwrap_err();
        assert!(matches!(err, IngestionError::AlreadyRegistered { .. }));
        assert_eq!(pipeline.source_count(), 1);
    }

    #[test]
    fn test_start_unknown_source() {
        let pipeline = IngestionPipeline::new(&IngestConfig::default());
        assert!(matches!(
            pipeline.start_source("nope"),
            Err(IngestionError::UnknownStream { .. })
        ));
    }

    #[tokio::test]
    async fn test_sources_feed_queue_until_closed() {
        let mut pipeline = IngestionPipeline::new(&IngestConfig::default());
        pipeline
            .register_source(Box::new(
                SyntheticSource::video("video", 4.0).with_max_samples(4).unpaced(),
            ))
            .unwrap();
        pipeline
            .register_source(Box::new(
                SyntheticSource::metadata("meta", 4.0).with_max_samples(4).unpaced(),
            ))
            .unwrap();

        let rx = pipeline.take_receiver().unwrap();
        pipeline.start_all().unwrap();
        pipeline.release_sender();

        let mut samples = 0;
        let mut hints = 0;
        let mut sequences = Vec::new();
        loop {
            match rx.next(Duration::from_secs(2)).await {
                Ok(Some(IngestItem::Sample { sample, .. })) => {
                    samples += 1;
                    sequences.push(sample.arrival_sequence());
                }
                Ok(Some(IngestItem::RateHint { fps, .. })) => {
                    assert_eq!(fps, 4.0);
                    hints += 1;
                }
                Ok(None) => panic!("queue stalled"),
                Err(_) => break,
            }
        }

        assert_eq!(samples, 8);
        assert_eq!(hints, 6);
        sequences.sort_unstable();
        assert_eq!(sequences, (0..8).collect::<Vec<u64>>());
        assert_eq!(pipeline.metrics().snapshot().samples_received, 8);
    }
}
