//! Error types for CLI operations.

use contracts::ContractError;
use dispatcher::DispatcherError;
use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Configuration could not be loaded or failed validation
    #[error("Invalid configuration: {0}")]
    Config(#[from] ContractError),

    /// Sink clients could not be built
    #[error("Failed to build dispatcher: {0}")]
    Dispatcher(#[from] DispatcherError),

    /// `emit` target is not a usable address
    #[error("Invalid target '{target}': {message}")]
    InvalidTarget { target: String, message: String },

    /// Metrics exporter setup failed
    #[error("Failed to start metrics endpoint: {message}")]
    Metrics { message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn invalid_target(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidTarget {
            target: target.into(),
            message: message.into(),
        }
    }

    pub fn metrics(message: impl std::fmt::Display) -> Self {
        Self::Metrics {
            message: message.to_string(),
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
