//! # Dispatcher
//!
//! Event fan-out.
//!
//! Responsibilities:
//! - Resolve the sinks that apply to an event (`SinkRegistry`)
//! - Deliver to each of them concurrently under a timeout
//! - Isolate failures: one sink's error never touches another attempt
//! - Build the MQTT / Slack / Teams / New Relic / log clients from config

pub mod dispatcher;
pub mod error;
pub mod metrics;
pub mod registry;
pub mod sinks;

pub use contracts::{DispatchReport, EventDispatch, NotificationSink};
pub use dispatcher::{Dispatcher, DispatcherBuilder};
pub use error::DispatcherError;
pub use metrics::{MetricsSnapshot, SinkMetrics};
pub use registry::{SinkRegistry, LOG_TARGET};
pub use sinks::{
    broker_payload, LogSink, MessageCard, MqttSink, NewRelicSink, SlackMessage, SlackSink,
    TeamsSink,
};
