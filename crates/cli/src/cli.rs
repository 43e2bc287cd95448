//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Stream Sync - timestamp alignment and grouping for multi-stream capture
#[derive(Parser, Debug)]
#[command(
    name = "stream-sync",
    author,
    version,
    about = "Multi-stream timestamp synchronization engine",
    long_about = "Aligns samples from independent media streams onto a shared slot grid and \n\
                  emits one group per slot once every required stream is present.\n\n\
                  `simulate` drives the engine with synthetic video and metadata sources."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "STREAM_SYNC_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "STREAM_SYNC_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the engine against synthetic sources
    Simulate(SimulateArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display the effective configuration
    Info(InfoArgs),
}

/// Arguments for the `simulate` command
#[derive(Parser, Debug, Clone)]
pub struct SimulateArgs {
    /// Path to configuration file (TOML or JSON); built-in defaults when omitted
    #[arg(short, long, env = "STREAM_SYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Frame rate of every synthetic source (Hz)
    #[arg(long, default_value = "4.0")]
    pub fps: f64,

    /// Samples produced per source
    #[arg(long, default_value = "40", env = "STREAM_SYNC_SAMPLES")]
    pub samples: u64,

    /// Clock phase between consecutive sources (seconds)
    #[arg(long, default_value = "0.013")]
    pub phase: f64,

    /// Uniform timestamp jitter amplitude (seconds)
    #[arg(long, default_value = "0.0")]
    pub jitter: f64,

    /// Inject an unknown timestamp every N samples (0 = never)
    #[arg(long, default_value = "0")]
    pub unknown_every: u64,

    /// Pace sources in real time instead of as fast as possible
    #[arg(long)]
    pub realtime: bool,

    /// Override `tolerance_slots` from configuration
    #[arg(long)]
    pub tolerance: Option<u32>,

    /// Stop after this many groups (0 = unlimited)
    #[arg(long, default_value = "0", env = "STREAM_SYNC_MAX_GROUPS")]
    pub max_groups: u64,

    /// Run timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "30", env = "STREAM_SYNC_TIMEOUT")]
    pub timeout: u64,

    /// Capacity of the group channel between worker and consumer
    #[arg(long, default_value = "64")]
    pub group_buffer: usize,

    /// Also log every group from the worker (info level)
    #[arg(long)]
    pub log_groups: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "STREAM_SYNC_METRICS_PORT")]
    pub metrics_port: u16,

    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "sync.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file; built-in defaults when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Output as TOML (a ready-to-edit config file)
    #[arg(long, conflicts_with = "json")]
    pub toml: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
