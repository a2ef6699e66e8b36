//! Sink implementations
//!
//! One `NotificationSink` per sink kind: MQTT broker, Slack, Teams,
//! New Relic and the log sink.

mod http;
mod log;
mod mqtt;
mod new_relic;
mod slack;
mod teams;

pub use self::http::build_http_client;
pub use self::log::LogSink;
pub use self::mqtt::{broker_payload, MqttSink};
pub use self::new_relic::NewRelicSink;
pub use self::slack::{SlackMessage, SlackSink};
pub use self::teams::{CardFact, CardSection, MessageCard, TeamsSink};
