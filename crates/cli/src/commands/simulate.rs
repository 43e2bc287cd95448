//! `simulate` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

use crate::cli::SimulateArgs;
use crate::pipeline::{Simulation, SimulationConfig, SourcePlan};

/// Execute the `simulate` command
pub async fn run_simulate(args: &SimulateArgs) -> Result<()> {
    let mut engine = super::load_config(args.config.as_deref()).context("Failed to load config")?;

    // Apply CLI overrides
    if let Some(tolerance) = args.tolerance {
        info!(tolerance, "Overriding tolerance_slots from CLI");
        engine.tolerance_slots = tolerance;
    }
    config_loader::ConfigLoader::validate(&engine)?;

    if !(args.fps.is_finite() && args.fps > 0.0) {
        anyhow::bail!("--fps must be > 0, got {}", args.fps);
    }

    info!(
        streams = engine.required_streams.len(),
        fps = args.fps,
        samples = args.samples,
        "Configuration loaded"
    );

    let config = SimulationConfig {
        engine,
        sources: SourcePlan {
            fps: args.fps,
            samples: args.samples,
            phase_step_s: args.phase,
            jitter_s: args.jitter,
            unknown_every: args.unknown_every,
            realtime: args.realtime,
        },
        max_groups: (args.max_groups > 0).then_some(args.max_groups),
        timeout: (args.timeout > 0).then(|| Duration::from_secs(args.timeout)),
        group_buffer: args.group_buffer,
        log_groups: args.log_groups,
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
    };

    let simulation = Simulation::new(config);
    let shutdown_signal = shutdown_signal();

    info!("Starting simulation...");

    tokio::select! {
        result = simulation.run() => {
            let stats = result.context("Simulation failed")?;
            if args.json {
                let json = serde_json::to_string_pretty(&stats.report())
                    .context("Failed to serialize simulation report")?;
                println!("{}", json);
            } else {
                stats.print_summary();
            }
        }
        _ = shutdown_signal => {
            warn!("Received shutdown signal, stopping simulation...");
        }
    }

    Ok(())
}

/// Ctrl+C and SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
