//! Routing keys and resolved sink targets

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

use crate::{Event, EventCategory, EventPayload, ListenerKind, SessionSubType};

/// Kind of downstream notification channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    /// MQTT publish/subscribe broker
    Broker,
    /// Slack incoming webhook
    Slack,
    /// Microsoft Teams incoming webhook
    Teams,
    /// New Relic custom event API
    NewRelic,
    /// Structured log line
    Log,
}

impl SinkKind {
    pub const ALL: [SinkKind; 5] = [
        SinkKind::Broker,
        SinkKind::Slack,
        SinkKind::Teams,
        SinkKind::NewRelic,
        SinkKind::Log,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Broker => "broker",
            Self::Slack => "slack",
            Self::Teams => "teams",
            Self::NewRelic => "new_relic",
            Self::Log => "log",
        }
    }
}

impl fmt::Display for SinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `(category, subType?)` pair the sink registry is keyed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteKey {
    TaskFailure,
    Session(SessionSubType),
    ListenerStatus(ListenerKind),
}

impl RouteKey {
    /// Every key the relay can route, in display order
    pub fn all() -> Vec<RouteKey> {
        let mut keys = vec![RouteKey::TaskFailure];
        keys.extend(SessionSubType::ALL.into_iter().map(RouteKey::Session));
        keys.extend(ListenerKind::ALL.into_iter().map(RouteKey::ListenerStatus));
        keys
    }

    pub fn category(&self) -> EventCategory {
        match self {
            Self::TaskFailure => EventCategory::TaskFailure,
            Self::Session(sub) => sub.category(),
            Self::ListenerStatus(_) => EventCategory::ListenerStatus,
        }
    }
}

impl From<&Event> for RouteKey {
    fn from(event: &Event) -> Self {
        match &event.payload {
            EventPayload::TaskFailure { .. } => Self::TaskFailure,
            EventPayload::Session { sub_type, .. } => Self::Session(*sub_type),
            EventPayload::ListenerStatus { listener, .. } => Self::ListenerStatus(*listener),
        }
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TaskFailure => f.write_str("task_failure"),
            Self::Session(sub) => write!(f, "{}", sub.category()),
            Self::ListenerStatus(listener) => write!(f, "listener_status/{listener}"),
        }
    }
}

/// A sink selected for one event, with its per-route target
///
/// `target` is opaque to the dispatcher: a topic for the broker, a channel
/// for Slack, a webhook URL for Teams, an event type for New Relic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSink {
    pub kind: SinkKind,
    pub target: String,
}

impl ResolvedSink {
    pub fn new(kind: SinkKind, target: impl Into<String>) -> Self {
        Self {
            kind,
            target: target.into(),
        }
    }

    /// Target safe to log or print
    pub fn display_target(&self) -> Cow<'_, str> {
        redact_target(&self.target)
    }
}

/// Strip the secret part of a webhook URL target
///
/// `https://host/first/rest?query` becomes `https://host/first/...`;
/// credentials in the authority are dropped. Non-URL targets (topics,
/// channels, event types) are returned unchanged.
pub fn redact_target(target: &str) -> Cow<'_, str> {
    let Some((scheme, rest)) = target.split_once("://") else {
        return Cow::Borrowed(target);
    };
    if !scheme.eq_ignore_ascii_case("http") && !scheme.eq_ignore_ascii_case("https") {
        return Cow::Borrowed(target);
    }

    let (authority, path) = match rest.find(['/', '?', '#']) {
        Some(i) => rest.split_at(i),
        None => (rest, ""),
    };
    let host = authority.rsplit_once('@').map_or(authority, |(_, host)| host);

    let path = path.strip_prefix('/').unwrap_or("");
    let (first, remainder) = match path.find(['/', '?', '#']) {
        Some(i) => (&path[..i], &path[i..]),
        None => (path, ""),
    };

    let mut redacted = format!("{scheme}://{host}");
    if !first.is_empty() {
        redacted.push('/');
        redacted.push_str(first);
    }
    if !remainder.is_empty() {
        redacted.push_str("/...");
    }
    Cow::Owned(redacted)
}
