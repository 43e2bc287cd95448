//! Layered error definitions
//!
//! Categorized by source: config / stream / queue.
//!
//! Discarded, duplicate and late samples are *not* errors; the engine reports
//! them as outcomes and counters. Only configuration and wiring problems
//! surface here.

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Stream Errors =====
    /// A stream id that is not part of the configured required set
    #[error("unknown stream '{stream_id}'")]
    UnknownStream { stream_id: String },

    /// Source registered twice
    #[error("stream '{stream_id}' is already registered")]
    DuplicateStream { stream_id: String },

    // ===== Queue Errors =====
    /// Every producer hung up
    #[error("ingest queue closed")]
    QueueClosed,

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn unknown_stream(stream_id: impl Into<String>) -> Self {
        Self::UnknownStream {
            stream_id: stream_id.into(),
        }
    }
}
