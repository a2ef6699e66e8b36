//! RelayBlueprint - Config Loader output
//!
//! Describes the complete relay configuration: UDP listeners, dispatch
//! timeout, and one section per sink kind with its per-route targets.
//! Immutable once loaded.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{ListenerKind, RouteKey, SessionSubType};

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete relay configuration blueprint
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct RelayBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// UDP listener settings
    #[serde(default)]
    #[validate(nested)]
    pub udp: UdpServerConfig,

    /// Fan-out settings
    #[serde(default)]
    #[validate(nested)]
    pub dispatch: DispatchConfig,

    /// MQTT broker sink
    #[serde(default)]
    #[validate(nested)]
    pub mqtt: MqttConfig,

    /// Slack webhook sink
    #[serde(default)]
    #[validate(nested)]
    pub slack: SlackConfig,

    /// Microsoft Teams webhook sink
    #[serde(default)]
    #[validate(nested)]
    pub teams: TeamsConfig,

    /// New Relic custom event sink
    #[serde(default)]
    #[validate(nested)]
    pub new_relic: NewRelicConfig,

    /// Structured log sink
    #[serde(default)]
    pub log_sink: LogSinkConfig,
}

/// UDP listener settings: one host, one port per listener
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UdpServerConfig {
    /// Start the listeners at all
    #[serde(default = "default_true")]
    pub enable: bool,

    /// Bind host shared by both listeners
    #[serde(default = "default_udp_host")]
    #[validate(length(min = 1))]
    pub host: String,

    /// Port for task-failure datagrams
    #[serde(default = "default_task_failure_port")]
    #[validate(range(min = 1))]
    pub task_failure_port: u16,

    /// Port for session/connection datagrams
    #[serde(default = "default_session_port")]
    #[validate(range(min = 1))]
    pub session_connection_port: u16,
}

impl UdpServerConfig {
    /// Port configured for a listener
    pub fn port_for(&self, listener: ListenerKind) -> u16 {
        match listener {
            ListenerKind::TaskFailure => self.task_failure_port,
            ListenerKind::SessionConnection => self.session_connection_port,
        }
    }
}

impl Default for UdpServerConfig {
    fn default() -> Self {
        Self {
            enable: true,
            host: default_udp_host(),
            task_failure_port: default_task_failure_port(),
            session_connection_port: default_session_port(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_udp_host() -> String {
    "0.0.0.0".to_string()
}

fn default_task_failure_port() -> u16 {
    9998
}

fn default_session_port() -> u16 {
    9997
}

/// Fan-out settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DispatchConfig {
    /// Upper bound for a single sink call, in milliseconds
    #[serde(default = "default_sink_timeout_ms")]
    #[validate(range(min = 1, max = 60000))]
    pub sink_timeout_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            sink_timeout_ms: default_sink_timeout_ms(),
        }
    }
}

fn default_sink_timeout_ms() -> u64 {
    5000
}

/// MQTT broker sink
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MqttConfig {
    #[serde(default)]
    pub enable: bool,

    #[serde(default = "default_broker_host")]
    #[validate(length(min = 1))]
    pub broker_host: String,

    #[serde(default = "default_broker_port")]
    #[validate(range(min = 1))]
    pub broker_port: u16,

    #[serde(default = "default_client_id")]
    #[validate(length(min = 1, max = 23))]
    pub client_id: String,

    #[serde(default = "default_keep_alive_secs")]
    #[validate(range(min = 5))]
    pub keep_alive_secs: u64,

    /// Topic per route; a missing topic disables the broker for that route
    #[serde(default)]
    pub topics: MqttTopics,
}

impl MqttConfig {
    pub fn topic_for(&self, key: RouteKey) -> Option<&str> {
        let topics = &self.topics;
        let topic = match key {
            RouteKey::TaskFailure => &topics.task_failure,
            RouteKey::Session(SessionSubType::StartSession) => &topics.session_start,
            RouteKey::Session(SessionSubType::StopSession) => &topics.session_stop,
            RouteKey::Session(SessionSubType::OpenConnection) => &topics.connection_open,
            RouteKey::Session(SessionSubType::CloseConnection) => &topics.connection_close,
            RouteKey::ListenerStatus(ListenerKind::TaskFailure) => {
                &topics.task_failure_server_status
            }
            RouteKey::ListenerStatus(ListenerKind::SessionConnection) => {
                &topics.session_server_status
            }
        };
        topic.as_deref().filter(|t| !t.is_empty())
    }
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            enable: false,
            broker_host: default_broker_host(),
            broker_port: default_broker_port(),
            client_id: default_client_id(),
            keep_alive_secs: default_keep_alive_secs(),
            topics: MqttTopics::default(),
        }
    }
}

fn default_broker_host() -> String {
    "localhost".to_string()
}

fn default_broker_port() -> u16 {
    1883
}

fn default_client_id() -> String {
    "butler-relay".to_string()
}

fn default_keep_alive_secs() -> u64 {
    30
}

/// Broker topic names
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MqttTopics {
    pub task_failure: Option<String>,
    pub session_start: Option<String>,
    pub session_stop: Option<String>,
    pub connection_open: Option<String>,
    pub connection_close: Option<String>,
    pub task_failure_server_status: Option<String>,
    pub session_server_status: Option<String>,
}

/// Slack webhook sink
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct SlackConfig {
    #[serde(default)]
    pub enable: bool,

    #[validate(url)]
    pub webhook_url: Option<String>,

    /// Channel for task-failure messages
    pub task_failure_channel: Option<String>,

    /// Channel for session/connection messages
    pub login_notification_channel: Option<String>,

    /// Channel for listener start/error messages
    pub status_channel: Option<String>,

    /// Emoji shown as the message icon
    pub icon_emoji: Option<String>,
}

impl SlackConfig {
    pub fn channel_for(&self, key: RouteKey) -> Option<&str> {
        let channel = match key {
            RouteKey::TaskFailure => &self.task_failure_channel,
            RouteKey::Session(_) => &self.login_notification_channel,
            RouteKey::ListenerStatus(_) => &self.status_channel,
        };
        channel.as_deref().filter(|c| !c.is_empty())
    }
}

/// Microsoft Teams webhook sink; each route posts to its own webhook
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct TeamsConfig {
    #[serde(default)]
    pub enable: bool,

    #[serde(default)]
    #[validate(nested)]
    pub task_failure: TeamsWebhook,

    #[serde(default)]
    #[validate(nested)]
    pub user_session: TeamsWebhook,

    #[serde(default)]
    #[validate(nested)]
    pub listener_status: TeamsWebhook,
}

impl TeamsConfig {
    pub fn webhook_for(&self, key: RouteKey) -> Option<&str> {
        let hook = match key {
            RouteKey::TaskFailure => &self.task_failure,
            RouteKey::Session(_) => &self.user_session,
            RouteKey::ListenerStatus(_) => &self.listener_status,
        };
        hook.active_url()
    }
}

/// One Teams incoming webhook
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct TeamsWebhook {
    #[serde(default)]
    pub enable: bool,

    #[validate(url)]
    pub webhook_url: Option<String>,
}

impl TeamsWebhook {
    /// Webhook URL when this route is enabled
    pub fn active_url(&self) -> Option<&str> {
        if self.enable {
            self.webhook_url.as_deref().filter(|u| !u.is_empty())
        } else {
            None
        }
    }
}

/// New Relic custom event sink
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewRelicConfig {
    #[serde(default)]
    pub enable: bool,

    /// Event API base URL
    #[serde(default = "default_new_relic_url")]
    #[validate(url)]
    pub url: String,

    #[serde(default)]
    pub account_id: String,

    #[serde(default)]
    pub insert_api_key: String,

    /// Event type per route; a missing entry disables New Relic for it
    #[serde(default)]
    pub event_types: NewRelicEventTypes,

    /// Attributes added to every event
    #[serde(default)]
    pub attributes: Vec<NameValue>,

    /// Extra HTTP headers
    #[serde(default)]
    pub headers: Vec<NameValue>,
}

impl NewRelicConfig {
    pub fn event_type_for(&self, key: RouteKey) -> Option<&str> {
        let event_type = match key {
            RouteKey::TaskFailure => &self.event_types.task_failure,
            RouteKey::Session(_) => &self.event_types.session,
            RouteKey::ListenerStatus(_) => &self.event_types.listener_status,
        };
        event_type.as_deref().filter(|t| !t.is_empty())
    }
}

impl Default for NewRelicConfig {
    fn default() -> Self {
        Self {
            enable: false,
            url: default_new_relic_url(),
            account_id: String::new(),
            insert_api_key: String::new(),
            event_types: NewRelicEventTypes::default(),
            attributes: Vec::new(),
            headers: Vec::new(),
        }
    }
}

fn default_new_relic_url() -> String {
    "https://insights-collector.newrelic.com/".to_string()
}

/// New Relic `eventType` names
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewRelicEventTypes {
    pub task_failure: Option<String>,
    pub session: Option<String>,
    pub listener_status: Option<String>,
}

/// Name/value pair used for static attributes and headers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameValue {
    pub name: String,
    pub value: String,
}

/// Structured log sink
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogSinkConfig {
    #[serde(default)]
    pub enable: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let bp = RelayBlueprint::default();
        assert!(bp.udp.enable);
        assert_eq!(bp.udp.port_for(ListenerKind::TaskFailure), 9998);
        assert_eq!(bp.udp.port_for(ListenerKind::SessionConnection), 9997);
        assert_eq!(bp.dispatch.sink_timeout_ms, 5000);
        assert!(!bp.mqtt.enable);
        assert!(bp.validate().is_ok());
    }

    #[test]
    fn test_topic_for_each_sub_type() {
        let mqtt = MqttConfig {
            enable: true,
            topics: MqttTopics {
                session_start: Some("qs/session/start".into()),
                session_stop: Some("qs/session/stop".into()),
                connection_open: Some("qs/conn/open".into()),
                connection_close: Some(String::new()),
                ..Default::default()
            },
            ..Default::default()
        };

        assert_eq!(
            mqtt.topic_for(RouteKey::Session(SessionSubType::StartSession)),
            Some("qs/session/start")
        );
        assert_eq!(
            mqtt.topic_for(RouteKey::Session(SessionSubType::OpenConnection)),
            Some("qs/conn/open")
        );
        // empty topic counts as absent
        assert_eq!(
            mqtt.topic_for(RouteKey::Session(SessionSubType::CloseConnection)),
            None
        );
        assert_eq!(mqtt.topic_for(RouteKey::TaskFailure), None);
    }

    #[test]
    fn test_teams_route_requires_enable() {
        let teams = TeamsConfig {
            enable: true,
            task_failure: TeamsWebhook {
                enable: false,
                webhook_url: Some("https://example.com/hook".into()),
            },
            ..Default::default()
        };
        assert_eq!(teams.webhook_for(RouteKey::TaskFailure), None);
    }

    #[test]
    fn test_invalid_slack_url_fails_validation() {
        let bp = RelayBlueprint {
            slack: SlackConfig {
                enable: true,
                webhook_url: Some("not a url".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(bp.validate().is_err());
    }
}
