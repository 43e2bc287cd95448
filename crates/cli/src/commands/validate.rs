//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{AlignMode, SyncEngineConfig};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    streams: Vec<String>,
    precision: String,
    mode: AlignMode,
    tolerance_slots: u32,
    eviction_horizon_s: f64,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    streams: config
                        .required_streams
                        .iter()
                        .map(|id| id.to_string())
                        .collect(),
                    precision: match config.aligner.precision_s {
                        Some(p) => format!("{p}s"),
                        None => "auto".to_string(),
                    },
                    mode: config.aligner.mode,
                    tolerance_slots: config.tolerance_slots,
                    eviction_horizon_s: config.eviction_horizon_s,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &SyncEngineConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.required_streams.len() == 1 {
        warnings.push(
            "Only one required stream - every aligned sample forms its own group".to_string(),
        );
    }

    if config.aligner.precision_s.is_none() {
        warnings.push(format!(
            "aligner.precision_s is unset - slot width comes from rate hints or falls back to {}s",
            config.aligner.default_precision_s
        ));
    }

    if config.eviction_horizon_s == 0.0 {
        warnings.push(
            "eviction_horizon_s is 0 - incomplete groups are evicted on the next sweep"
                .to_string(),
        );
    }

    let default_smoothing = contracts::AlignerConfig::default().smoothing;
    if config.aligner.mode == AlignMode::Fixed && config.aligner.smoothing != default_smoothing {
        warnings.push("aligner.smoothing has no effect in fixed mode".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Streams: {}", summary.streams.join(", "));
            println!("  Precision: {}", summary.precision);
            println!("  Mode: {:?}", summary.mode);
            println!("  Tolerance: {} slot(s)", summary.tolerance_slots);
            println!("  Eviction horizon: {}s", summary.eviction_horizon_s);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
