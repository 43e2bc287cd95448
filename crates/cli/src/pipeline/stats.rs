//! Simulation statistics.

use std::time::Duration;

use contracts::EngineStats;
use observability::SyncMetricsAggregator;
use serde::Serialize;

/// Statistics from a simulation run
#[derive(Debug, Clone, Default)]
pub struct SimulationStats {
    /// Samples accepted into the ingest queue
    pub samples_received: u64,

    /// Samples the queue dropped under its overflow policy
    pub samples_dropped: u64,

    /// Groups lost because the group channel was full or closed
    pub groups_dropped: u64,

    /// Total duration of the run
    pub duration: Duration,

    /// Number of sources registered
    pub active_sources: usize,

    /// Final engine counters
    pub engine: EngineStats,

    /// Per-group statistics
    pub sync_metrics: SyncMetricsAggregator,
}

/// JSON view of a run
#[derive(Serialize)]
pub struct SimulationReport<'a> {
    duration_secs: f64,
    groups_per_sec: f64,
    samples_received: u64,
    samples_dropped: u64,
    groups_dropped: u64,
    engine: &'a EngineStats,
    skew_ms_mean: f64,
    skew_ms_max: f64,
    completion_rate: f64,
}

impl SimulationStats {
    /// Groups per second of wall-clock time
    pub fn groups_per_sec(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.sync_metrics.total_groups as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    pub fn report(&self) -> SimulationReport<'_> {
        let summary = self.sync_metrics.summary();
        SimulationReport {
            duration_secs: self.duration.as_secs_f64(),
            groups_per_sec: self.groups_per_sec(),
            samples_received: self.samples_received,
            samples_dropped: self.samples_dropped,
            groups_dropped: self.groups_dropped,
            engine: &self.engine,
            skew_ms_mean: summary.skew_ms.mean,
            skew_ms_max: summary.skew_ms.max,
            completion_rate: summary.completion_rate,
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                   Simulation Statistics                      ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Sources: {}", self.active_sources);
        println!("   ├─ Samples received: {}", self.samples_received);
        println!("   ├─ Samples dropped (queue): {}", self.samples_dropped);
        println!("   ├─ Groups dropped (consumer lag): {}", self.groups_dropped);
        println!("   └─ Groups/s: {:.2}", self.groups_per_sec());

        let engine = &self.engine;
        println!("\n📈 Engine");
        println!("   ├─ Groups emitted: {}", engine.groups_emitted);
        println!("   ├─ Groups evicted: {}", engine.groups_evicted);
        println!(
            "   ├─ Discarded: {} (invalid {}, warmup {}, unknown stream {})",
            engine.total_discarded(),
            engine.discarded_invalid,
            engine.discarded_warmup,
            engine.discarded_unknown
        );
        println!("   ├─ Duplicates: {}", engine.duplicates);
        println!("   ├─ Late: {}", engine.late);
        println!("   ├─ Boundary corrections: {}", engine.boundary_corrections);
        println!("   └─ Tolerance matches: {}", engine.tolerance_matches);

        println!("\n{}", self.sync_metrics.summary());
    }
}
