//! Core error types for hints-core.
//!
//! Sensor dropouts are not errors (they become sentinels in the session log),
//! so everything here is about configuration and persistence.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for hints-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Storage-related errors (session files, calibration flag)
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
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

    /// Key does not exist in the configuration tree
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

impl ConfigError {
    pub(crate) fn invalid(key: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key: key.into(),
            message: message.into(),
        }
    }
}

/// Storage-specific errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The per-user data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),

    /// Reading or writing a file failed
    #[error("IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A stored document could not be decoded
    #[error("Malformed document at {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The writer refused the request
    #[error("Persistence rejected: {0}")]
    Rejected(String),
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    fn invalid_config() -> Result<()> {
        Err(ConfigError::invalid("timing.tick_rate_hz", "must be positive"))?
    }

    fn missing_dir() -> Result<()> {
        Err(StorageError::DataDir("/nowhere".into()))?
    }

    #[test]
    fn domain_errors_convert_into_core_error() {
        let err = invalid_config().unwrap_err();
        assert!(matches!(err, CoreError::Config(ConfigError::InvalidValue { .. })));
        assert_eq!(
            err.to_string(),
            "Configuration error: Invalid configuration value for 'timing.tick_rate_hz': must be positive"
        );

        let err = missing_dir().unwrap_err();
        assert!(matches!(err, CoreError::Storage(StorageError::DataDir(_))));
    }
}
