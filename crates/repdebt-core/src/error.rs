//! Core error types for repdebt-core.
//!
//! Every fallible ledger operation returns one of these as a value; nothing
//! in the core panics or unwinds for flow control. Corrupt storage is not an
//! error here: it is recovered in [`crate::storage`] and logged.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for repdebt-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A reported value was rejected before touching the ledger
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The targeted participant has never registered
    #[error("Not found: {0}")]
    NotFound(#[from] NotFoundError),

    /// Persisting the ledger failed; the mutation did not take effect
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The ledger actor is gone
    #[error("Ledger service error: {0}")]
    Service(#[from] ServiceError),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Reported repetitions must be a positive integer
    #[error("Reported count must be a positive integer, got {count}")]
    NonPositiveCount { count: i64 },
}

/// Lookups against participants that do not exist.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotFoundError {
    #[error("Participant '{id}' is not registered")]
    Participant { id: String },
}

/// Storage write failures.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Writing or renaming the snapshot file failed
    #[error("Failed to write ledger to {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The snapshot could not be encoded
    #[error("Failed to serialize ledger: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Failed to access data directory
    #[error("Failed to access data directory: {0}")]
    DataDir(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Errors talking to the ledger actor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("ledger service has stopped")]
    Stopped,
}

impl ConfigError {
    pub(crate) fn invalid(key: &str, message: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
