//! Layered error definitions
//!
//! Categorized by source: config / sink construction / sink delivery

use thiserror::Error;

/// Unified error type for configuration and sink setup
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

    // ===== Sink Errors =====
    /// Sink client could not be constructed
    #[error("sink '{sink_name}' connection error: {message}")]
    SinkConnection { sink_name: String, message: String },

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

    /// Create sink connection error
    pub fn sink_connection(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkConnection {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }
}

/// Failure of a single sink invocation
///
/// Recorded per attempt in a `DispatchReport`; never propagated to sibling
/// sinks or to the listener.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkDeliveryError {
    /// The sink did not answer within the dispatch timeout
    #[error("timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    /// Connection or protocol failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Remote answered with a non-success status
    #[error("remote returned status {status}")]
    Status { status: u16 },

    /// The message could not be built
    #[error("encode error: {0}")]
    Encode(String),

    /// No connected client exists for the sink kind
    #[error("no client registered for sink")]
    Unavailable,

    /// The sink task panicked or was cancelled
    #[error("sink task aborted: {0}")]
    Aborted(String),
}

impl SinkDeliveryError {
    pub fn transport(message: impl std::fmt::Display) -> Self {
        Self::Transport(message.to_string())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
