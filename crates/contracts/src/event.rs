//! Event - Decoder output
//!
//! A decoded, immutable representation of one received datagram or one
//! listener lifecycle transition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use thiserror::Error;

/// Listener identity, which is also the wire category of its datagrams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListenerKind {
    /// Failed reload task notifications
    TaskFailure,
    /// Session start/stop and connection open/close notifications
    SessionConnection,
}

impl ListenerKind {
    /// All listener kinds, in startup order
    pub const ALL: [ListenerKind; 2] = [ListenerKind::TaskFailure, ListenerKind::SessionConnection];

    /// Stable name used in logs and metric labels
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TaskFailure => "task_failure",
            Self::SessionConnection => "session_connection",
        }
    }
}

impl fmt::Display for ListenerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a UDP listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListenerState {
    #[default]
    Unbound,
    Bound,
    Error,
}

impl ListenerState {
    /// Whether `self -> next` is a legal transition.
    ///
    /// There is no way back to `Bound` once a listener has errored.
    pub fn can_transition_to(self, next: ListenerState) -> bool {
        matches!(
            (self, next),
            (Self::Unbound, Self::Bound) | (Self::Unbound, Self::Error) | (Self::Bound, Self::Error)
        )
    }

    /// Word published on status channels ("start" / "error")
    pub fn status_word(&self) -> &'static str {
        match self {
            Self::Unbound => "stopped",
            Self::Bound => "start",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ListenerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unbound => "unbound",
            Self::Bound => "bound",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// Second-level discriminator inside the session/connection category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionSubType {
    StartSession,
    StopSession,
    OpenConnection,
    CloseConnection,
}

impl SessionSubType {
    pub const ALL: [SessionSubType; 4] = [
        SessionSubType::StartSession,
        SessionSubType::StopSession,
        SessionSubType::OpenConnection,
        SessionSubType::CloseConnection,
    ];

    /// Literal used on the wire
    pub fn as_wire(&self) -> &'static str {
        match self {
            Self::StartSession => "Start session",
            Self::StopSession => "Stop session",
            Self::OpenConnection => "Open connection",
            Self::CloseConnection => "Close connection",
        }
    }

    /// Category this sub-type maps to
    pub fn category(&self) -> EventCategory {
        match self {
            Self::StartSession => EventCategory::SessionStart,
            Self::StopSession => EventCategory::SessionStop,
            Self::OpenConnection => EventCategory::ConnectionOpen,
            Self::CloseConnection => EventCategory::ConnectionClose,
        }
    }
}

impl fmt::Display for SessionSubType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// Error returned when a sub-type string is not one of the four literals
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown session sub-type '{0}'")]
pub struct UnknownSubType(pub String);

impl FromStr for SessionSubType {
    type Err = UnknownSubType;

    /// Exact, case-sensitive match against the wire literals
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|sub| sub.as_wire() == s)
            .ok_or_else(|| UnknownSubType(s.to_string()))
    }
}

/// Top-level event classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    TaskFailure,
    SessionStart,
    SessionStop,
    ConnectionOpen,
    ConnectionClose,
    ListenerStatus,
}

impl EventCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TaskFailure => "task_failure",
            Self::SessionStart => "session_start",
            Self::SessionStop => "session_stop",
            Self::ConnectionOpen => "connection_open",
            Self::ConnectionClose => "connection_close",
            Self::ListenerStatus => "listener_status",
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category-specific, already-labelled event content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventPayload {
    TaskFailure {
        task_name: String,
        app_name: String,
    },
    Session {
        sub_type: SessionSubType,
        user_directory: String,
        user_id: String,
    },
    ListenerStatus {
        listener: ListenerKind,
        state: ListenerState,
        local_addr: Option<SocketAddr>,
    },
}

/// A fully formed event
///
/// Either every field is populated or the event does not exist; decoders
/// never produce partial events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Emitting platform node, taken verbatim from the payload
    pub source_id: String,

    /// Decoded content
    pub payload: EventPayload,

    /// Capture time
    pub timestamp: DateTime<Utc>,
}

impl Event {
    /// Create a task-failure event stamped now
    pub fn task_failure(
        source_id: impl Into<String>,
        task_name: impl Into<String>,
        app_name: impl Into<String>,
    ) -> Self {
        Self::new(
            source_id,
            EventPayload::TaskFailure {
                task_name: task_name.into(),
                app_name: app_name.into(),
            },
        )
    }

    /// Create a session/connection event stamped now
    pub fn session(
        source_id: impl Into<String>,
        sub_type: SessionSubType,
        user_directory: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self::new(
            source_id,
            EventPayload::Session {
                sub_type,
                user_directory: user_directory.into(),
                user_id: user_id.into(),
            },
        )
    }

    /// Create a listener lifecycle event stamped now
    ///
    /// The source id is the listener's own name so status events can be told
    /// apart from platform-originated ones.
    pub fn listener_status(
        listener: ListenerKind,
        state: ListenerState,
        local_addr: Option<SocketAddr>,
    ) -> Self {
        Self::new(
            format!("butler-relay/{}", listener),
            EventPayload::ListenerStatus {
                listener,
                state,
                local_addr,
            },
        )
    }

    fn new(source_id: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            source_id: source_id.into(),
            payload,
            timestamp: Utc::now(),
        }
    }

    /// Override the capture time
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn category(&self) -> EventCategory {
        match &self.payload {
            EventPayload::TaskFailure { .. } => EventCategory::TaskFailure,
            EventPayload::Session { sub_type, .. } => sub_type.category(),
            EventPayload::ListenerStatus { .. } => EventCategory::ListenerStatus,
        }
    }

    /// Ordered category-specific fields, excluding the source id
    pub fn fields(&self) -> Vec<String> {
        self.labeled_fields()
            .into_iter()
            .map(|(_, value)| value)
            .collect()
    }

    /// Ordered fields paired with the label of their wire position
    pub fn labeled_fields(&self) -> Vec<(&'static str, String)> {
        match &self.payload {
            EventPayload::TaskFailure {
                task_name,
                app_name,
            } => vec![
                ("Task name", task_name.clone()),
                ("App name", app_name.clone()),
            ],
            EventPayload::Session {
                sub_type,
                user_directory,
                user_id,
            } => vec![
                ("Event", sub_type.as_wire().to_string()),
                ("User directory", user_directory.clone()),
                ("User id", user_id.clone()),
            ],
            EventPayload::ListenerStatus {
                listener,
                state,
                local_addr,
            } => {
                let mut fields = vec![
                    ("Listener", listener.to_string()),
                    ("State", state.to_string()),
                ];
                if let Some(addr) = local_addr {
                    fields.push(("Address", addr.to_string()));
                }
                fields
            }
        }
    }

    /// One-line human readable summary used by chat and log sinks
    pub fn summary(&self) -> String {
        match &self.payload {
            EventPayload::TaskFailure {
                task_name,
                app_name,
            } => format!("Failed task: \"{task_name}\", linked to app \"{app_name}\"."),
            EventPayload::Session {
                sub_type,
                user_directory,
                user_id,
            } => format!("{sub_type} for user {user_directory}/{user_id}"),
            EventPayload::ListenerStatus {
                listener,
                state,
                local_addr,
            } => match local_addr {
                Some(addr) => format!("UDP server {listener} on {addr}: {state}"),
                None => format!("UDP server {listener}: {state}"),
            },
        }
    }
}
