//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::SyncEngineConfig;
use tracing::info;

use crate::cli::InfoArgs;

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    match &args.config {
        Some(path) => info!(config = %path.display(), "Loading configuration info"),
        None => info!("No configuration given, showing built-in defaults"),
    }

    let config = super::load_config(args.config.as_deref()).context("Failed to load config")?;

    if args.json {
        println!("{}", config_loader::ConfigLoader::to_json(&config)?);
    } else if args.toml {
        println!("{}", config_loader::ConfigLoader::to_toml(&config)?);
    } else {
        print_config_info(&config);
    }

    Ok(())
}

fn print_config_info(config: &SyncEngineConfig) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                 Stream Sync Configuration                    ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("📡 Required Streams ({})", config.required_streams.len());
    for (i, stream) in config.required_streams.iter().enumerate() {
        let prefix = if i == config.required_streams.len() - 1 {
            "└─"
        } else {
            "├─"
        };
        println!("   {} {}", prefix, stream);
    }

    let aligner = &config.aligner;
    println!("\n📐 Aligner");
    match aligner.precision_s {
        Some(p) => println!("   ├─ Precision: {}s", p),
        None => println!(
            "   ├─ Precision: auto ({} rate hints, fallback {}s)",
            aligner.rate_hint_count, aligner.default_precision_s
        ),
    }
    println!("   ├─ Mode: {:?}", aligner.mode);
    println!("   ├─ Rounding: {:?}", aligner.rounding);
    println!("   ├─ Drift threshold: {}s", aligner.drift_update_threshold_s);
    println!("   ├─ Smoothing: {}", aligner.smoothing);
    println!("   └─ Warmup: {}s", aligner.warmup_s);

    println!("\n⚙️  Join");
    println!("   ├─ Tolerance: {} slot(s)", config.tolerance_slots);
    println!("   ├─ Boundary correction: {}", config.boundary_correction);
    println!("   ├─ Eviction horizon: {}s", config.eviction_horizon_s);
    println!("   ├─ Max pending groups: {}", config.buffer.max_pending_groups);
    println!("   └─ Emitted history: {}", config.buffer.emitted_history);

    println!("\n📥 Ingest Queue");
    println!("   ├─ Capacity: {}", config.ingest.capacity);
    println!("   ├─ Drop policy: {:?}", config.ingest.drop_policy);
    println!("   └─ Poll interval: {}ms", config.ingest.poll_interval_ms);

    println!();
}
