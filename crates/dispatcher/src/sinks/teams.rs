//! TeamsSink - posts MessageCards to Microsoft Teams incoming webhooks
//!
//! Each route carries its own webhook URL as the target.

use async_trait::async_trait;
use contracts::{Event, EventPayload, NotificationSink, SinkDeliveryError, SinkKind};
use serde::Serialize;
use tracing::instrument;

use super::http::post_json;

const THEME_COLOR: &str = "0078D7";

#[derive(Debug, Serialize)]
pub struct MessageCard {
    #[serde(rename = "@type")]
    pub card_type: &'static str,
    #[serde(rename = "@context")]
    pub context: &'static str,
    pub summary: String,
    #[serde(rename = "themeColor")]
    pub theme_color: &'static str,
    pub title: String,
    pub sections: Vec<CardSection>,
}

#[derive(Debug, Serialize)]
pub struct CardSection {
    #[serde(rename = "activityTitle")]
    pub activity_title: String,
    pub facts: Vec<CardFact>,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct CardFact {
    pub name: String,
    pub value: String,
}

impl MessageCard {
    pub fn for_event(event: &Event) -> Self {
        let (summary, title, text) = match &event.payload {
            EventPayload::TaskFailure {
                task_name,
                app_name,
            } => (
                "A reload task has failed".to_string(),
                format!("Failed task: {task_name}, app name \"{app_name}\""),
                "Please refer to the QMC for further details".to_string(),
            ),
            EventPayload::Session { sub_type, .. } => (
                format!("User {}", sub_type.as_wire().to_lowercase()),
                event.summary(),
                String::new(),
            ),
            EventPayload::ListenerStatus { .. } => (
                "Relay listener status".to_string(),
                event.summary(),
                String::new(),
            ),
        };

        let facts = event
            .labeled_fields()
            .into_iter()
            .map(|(name, value)| CardFact {
                name: name.to_string(),
                value,
            })
            .collect();

        Self {
            card_type: "MessageCard",
            context: "https://schema.org/extensions",
            summary,
            theme_color: THEME_COLOR,
            title,
            sections: vec![CardSection {
                activity_title: event.source_id.clone(),
                facts,
                text,
            }],
        }
    }
}

pub struct TeamsSink {
    client: reqwest::Client,
}

impl TeamsSink {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl NotificationSink for TeamsSink {
    fn kind(&self) -> SinkKind {
        SinkKind::Teams
    }

    #[instrument(name = "teams_sink_send", skip_all, fields(category = %event.category()))]
    async fn send(&self, event: &Event, target: &str) -> Result<(), SinkDeliveryError> {
        let card = MessageCard::for_event(event);
        post_json(self.client.post(target), &card).await
    }
}
