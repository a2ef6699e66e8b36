//! Ingestion error types

use std::net::SocketAddr;

use contracts::ListenerKind;
use thiserror::Error;

/// Why a datagram was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedReason {
    #[error("payload is not valid UTF-8")]
    InvalidUtf8,

    #[error("expected at least {expected} fields, found {found}")]
    TooFewFields { expected: usize, found: usize },

    #[error("unknown session sub-type {0:?}")]
    UnknownSubType(String),
}

/// Decoder failure
///
/// A malformed datagram never yields a partial event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("malformed {listener} payload: {reason}")]
    MalformedPayload {
        listener: ListenerKind,
        reason: MalformedReason,
    },
}

impl DecodeError {
    pub fn malformed(listener: ListenerKind, reason: MalformedReason) -> Self {
        Self::MalformedPayload { listener, reason }
    }

    pub fn reason(&self) -> &MalformedReason {
        match self {
            Self::MalformedPayload { reason, .. } => reason,
        }
    }
}

/// Listener failure
#[derive(Debug, Error)]
pub enum IngestionError {
    /// The socket could not be acquired
    #[error("{listener} listener failed to bind {addr}: {source}")]
    Bind {
        listener: ListenerKind,
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Receive failed on a bound socket
    #[error("{listener} socket error on {local_addr}: {source}")]
    Socket {
        listener: ListenerKind,
        local_addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Ingestion Result type alias
pub type Result<T> = std::result::Result<T, IngestionError>;
