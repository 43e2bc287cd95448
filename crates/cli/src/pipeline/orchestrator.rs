//! Simulation orchestrator - wires synthetic sources, the ingest queue,
//! the sync worker and a group consumer together.

use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use contracts::{StreamId, SyncEngineConfig};
use ingestion::{IngestionPipeline, SyntheticSource};
use sync_engine::{ChannelSink, FanOutSink, LogSink, SyncEngine, SyncWorker};
use tracing::{debug, info, warn};

use super::SimulationStats;
use crate::error::Result;

/// How the synthetic source for each required stream behaves
#[derive(Debug, Clone)]
pub struct SourcePlan {
    /// Frame rate (Hz)
    pub fps: f64,

    /// Samples per source
    pub samples: u64,

    /// Clock phase added per source index (seconds)
    pub phase_step_s: f64,

    /// Uniform jitter amplitude (seconds)
    pub jitter_s: f64,

    /// Unknown-timestamp injection period (0 = never)
    pub unknown_every: u64,

    /// Pace in real time
    pub realtime: bool,
}

impl Default for SourcePlan {
    fn default() -> Self {
        Self {
            fps: 4.0,
            samples: 40,
            phase_step_s: 0.013,
            jitter_s: 0.0,
            unknown_every: 0,
            realtime: false,
        }
    }
}

impl SourcePlan {
    /// The first stream is rendered as video, the rest as metadata
    fn build(&self, index: usize, stream_id: &StreamId) -> SyntheticSource {
        let source = if index == 0 {
            SyntheticSource::video(stream_id, self.fps)
        } else {
            SyntheticSource::metadata(stream_id, self.fps)
        };

        let source = source
            .with_phase(index as f64 * self.phase_step_s)
            .with_jitter(self.jitter_s)
            .with_max_samples(self.samples)
            .with_unknown_every(self.unknown_every);

        if self.realtime {
            source
        } else {
            source.unpaced()
        }
    }
}

/// Simulation configuration
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Engine configuration
    pub engine: SyncEngineConfig,

    /// Synthetic source behaviour
    pub sources: SourcePlan,

    /// Maximum number of groups to consume (None = unlimited)
    pub max_groups: Option<u64>,

    /// Run timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Group channel capacity
    pub group_buffer: usize,

    /// Tee every group into a `LogSink` as well
    pub log_groups: bool,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main simulation orchestrator
pub struct Simulation {
    config: SimulationConfig,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Self {
        Self { config }
    }

    /// Run the simulation to completion
    pub async fn run(self) -> Result<SimulationStats> {
        let start_time = Instant::now();
        let engine_config = self.config.engine.clone();

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        // Ingestion
        info!("Setting up ingestion pipeline...");
        let mut ingestion = IngestionPipeline::new(&engine_config.ingest);
        for (index, stream_id) in engine_config.required_streams.iter().enumerate() {
            ingestion.register_source(Box::new(self.config.sources.build(index, stream_id)))?;
        }
        let receiver = ingestion
            .take_receiver()
            .ok_or_else(|| anyhow::anyhow!("ingest receiver already taken"))?;

        info!(
            sources = ingestion.source_count(),
            capacity = engine_config.ingest.capacity,
            "Ingestion pipeline configured"
        );

        // Sync worker
        let (sink, mut groups) = ChannelSink::channel(self.config.group_buffer);
        let groups_dropped = sink.dropped_counter();
        let engine = SyncEngine::new(engine_config.clone());
        let worker = if self.config.log_groups {
            SyncWorker::spawn(engine, receiver, FanOutSink::new(sink, LogSink::new()))
        } else {
            SyncWorker::spawn(engine, receiver, sink)
        };

        info!(
            required_streams = ?engine_config.required_streams,
            precision_s = ?engine_config.aligner.precision_s,
            mode = ?engine_config.aligner.mode,
            tolerance_slots = engine_config.tolerance_slots,
            "Sync worker started"
        );

        ingestion.start_all()?;
        ingestion.release_sender();

        let max_groups = self.config.max_groups;
        let mut stats = SimulationStats {
            active_sources: ingestion.source_count(),
            ..Default::default()
        };

        let consume = async {
            while let Some(group) = groups.recv().await {
                stats.sync_metrics.update(&group);

                debug!(
                    group_id = group.group_id,
                    slot_s = format!("{:.3}", group.slot_seconds()),
                    skew_ms = format!("{:.2}", group.skew() * 1000.0),
                    streams = group.entries.len(),
                    "Synced group produced"
                );

                if let Some(max) = max_groups {
                    if stats.sync_metrics.total_groups >= max {
                        info!(groups = stats.sync_metrics.total_groups, "Reached max groups limit");
                        break;
                    }
                }
            }
        };

        match self.config.timeout {
            Some(timeout) => {
                if tokio::time::timeout(timeout, consume).await.is_err() {
                    warn!(timeout_secs = timeout.as_secs(), "Simulation timed out");
                }
            }
            None => consume.await,
        }

        // Shutdown
        info!("Shutting down simulation...");
        ingestion.stop_all();
        let engine_stats = worker.shutdown().await?;

        let snapshot = ingestion.metrics().snapshot();
        stats.samples_received = snapshot.samples_received;
        stats.samples_dropped = snapshot.samples_dropped;
        stats.groups_dropped = groups_dropped.load(Ordering::Relaxed);
        stats.sync_metrics.absorb(&engine_stats);
        stats.engine = engine_stats;
        stats.duration = start_time.elapsed();

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            groups = stats.sync_metrics.total_groups,
            "Simulation complete"
        );

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::AlignerConfig;

    fn config(samples: u64) -> SimulationConfig {
        SimulationConfig {
            engine: SyncEngineConfig {
                aligner: AlignerConfig {
                    precision_s: Some(0.25),
                    ..Default::default()
                },
                ..SyncEngineConfig::with_streams(["video", "meta"])
            },
            sources: SourcePlan {
                samples,
                ..Default::default()
            },
            max_groups: None,
            timeout: Some(Duration::from_secs(10)),
            group_buffer: 256,
            log_groups: false,
            metrics_port: None,
        }
    }

    #[tokio::test]
    async fn test_simulation_groups_every_slot() {
        let stats = Simulation::new(config(20)).run().await.unwrap();

        assert_eq!(stats.samples_received, 40);
        assert_eq!(stats.sync_metrics.total_groups, 20);
        assert_eq!(stats.engine.groups_emitted, 20);
        assert_eq!(stats.engine.total_discarded(), 0);
    }

    #[tokio::test]
    async fn test_simulation_stops_at_max_groups() {
        let mut config = config(200);
        config.max_groups = Some(5);
        let stats = Simulation::new(config).run().await.unwrap();

        assert_eq!(stats.sync_metrics.total_groups, 5);
    }

    #[tokio::test]
    async fn test_simulation_with_logged_groups() {
        let mut config = config(8);
        config.log_groups = true;
        let stats = Simulation::new(config).run().await.unwrap();

        assert_eq!(stats.sync_metrics.total_groups, 8);
        assert_eq!(stats.groups_dropped, 0);
    }

    #[tokio::test]
    async fn test_lagging_consumer_counts_dropped_groups() {
        let mut config = config(20);
        config.group_buffer = 1;
        config.max_groups = Some(1);
        let stats = Simulation::new(config).run().await.unwrap();

        // at most one group can still sit in the channel
        let accounted = stats.sync_metrics.total_groups + stats.groups_dropped;
        assert_eq!(stats.sync_metrics.total_groups, 1);
        assert!(stats.engine.groups_emitted >= accounted);
        assert!(stats.engine.groups_emitted <= accounted + 1);
    }

    #[test]
    fn test_source_plan_kinds() {
        let plan = SourcePlan::default();
        let video = plan.build(0, &StreamId::from("v"));
        let meta = plan.build(1, &StreamId::from("m"));

        assert!(matches!(
            video.config().kind,
            ingestion::SyntheticKind::Video { .. }
        ));
        assert_eq!(meta.config().kind, ingestion::SyntheticKind::Metadata);
        assert!((meta.config().phase_s - 0.013).abs() < 1e-12);
        assert!(!meta.config().realtime);
    }
}
