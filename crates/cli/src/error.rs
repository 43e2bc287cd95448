//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Loading or validating the configuration failed
    #[error(transparent)]
    Config(#[from] contracts::ContractError),

    /// Source registration or queue wiring failed
    #[error("Ingestion error: {0}")]
    Ingestion(#[from] ingestion::IngestionError),

    /// The sync worker did not shut down cleanly
    #[error("Sync worker error: {0}")]
    Worker(#[from] sync_engine::SyncEngineError),

    /// Generic error wrapper
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
