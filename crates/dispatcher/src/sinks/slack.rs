//! SlackSink - posts to a Slack incoming webhook

use async_trait::async_trait;
use contracts::{Event, EventCategory, NotificationSink, SinkDeliveryError, SinkKind, SlackConfig};
use serde::Serialize;
use tracing::instrument;

use super::http::post_json;
use crate::error::DispatcherError;

const TASK_FAILURE_ICON: &str = ":ghost:";

/// Incoming-webhook body
#[derive(Debug, Serialize)]
pub struct SlackMessage {
    pub text: String,
    pub channel: String,
    pub username: String,
    pub icon_emoji: String,
}

pub struct SlackSink {
    client: reqwest::Client,
    webhook_url: String,
    icon_emoji: Option<String>,
}

impl SlackSink {
    pub fn new(client: reqwest::Client, config: &SlackConfig) -> Result<Self, DispatcherError> {
        let webhook_url = config
            .webhook_url
            .clone()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| DispatcherError::sink_creation("slack", "webhook_url is not set"))?;

        Ok(Self {
            client,
            webhook_url,
            icon_emoji: config.icon_emoji.clone(),
        })
    }

    /// Message posted for `event` to `channel`
    ///
    /// The emitting node shows up as the message author.
    pub fn message(&self, event: &Event, channel: &str) -> SlackMessage {
        let icon_emoji = match (&self.icon_emoji, event.category()) {
            (Some(icon), _) => icon.clone(),
            (None, EventCategory::TaskFailure) => TASK_FAILURE_ICON.to_string(),
            (None, _) => String::new(),
        };

        SlackMessage {
            text: event.summary(),
            channel: channel.to_string(),
            username: event.source_id.clone(),
            icon_emoji,
        }
    }
}

#[async_trait]
impl NotificationSink for SlackSink {
    fn kind(&self) -> SinkKind {
        SinkKind::Slack
    }

    #[instrument(name = "slack_sink_send", skip(self, event), fields(channel = %target))]
    async fn send(&self, event: &Event, target: &str) -> Result<(), SinkDeliveryError> {
        let message = self.message(event, target);
        post_json(self.client.post(&self.webhook_url), &message).await
    }
}
