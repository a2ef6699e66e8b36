//! NewRelicSink - posts custom events to the New Relic Event API
//!
//! `POST {url}/v1/accounts/{account}/events` with an `Api-Key` header.
//! The route target is the `eventType`.

use async_trait::async_trait;
use contracts::{
    Event, EventPayload, NameValue, NewRelicConfig, NotificationSink, SinkDeliveryError, SinkKind,
};
use serde_json::{Map, Value};
use tracing::instrument;

use super::http::post_json;

pub struct NewRelicSink {
    client: reqwest::Client,
    events_url: String,
    insert_api_key: String,
    attributes: Vec<NameValue>,
    headers: Vec<NameValue>,
}

impl NewRelicSink {
    pub fn new(client: reqwest::Client, config: &NewRelicConfig) -> Self {
        let base = config.url.trim_end_matches('/');
        Self {
            client,
            events_url: format!("{base}/v1/accounts/{}/events", config.account_id),
            insert_api_key: config.insert_api_key.clone(),
            attributes: config.attributes.clone(),
            headers: config.headers.clone(),
        }
    }

    pub fn events_url(&self) -> &str {
        &self.events_url
    }

    /// Event body: timestamp, type, static attributes, then event attributes
    pub fn event_body(&self, event: &Event, event_type: &str) -> Value {
        let mut body = Map::new();
        body.insert(
            "timestamp".into(),
            Value::from(event.timestamp.timestamp_millis()),
        );
        body.insert("eventType".into(), Value::from(event_type));

        for attr in &self.attributes {
            body.insert(attr.name.clone(), Value::from(attr.value.as_str()));
        }

        body.insert("sourceId".into(), Value::from(event.source_id.as_str()));
        body.insert("category".into(), Value::from(event.category().as_str()));

        match &event.payload {
            EventPayload::TaskFailure {
                task_name,
                app_name,
            } => {
                body.insert("taskName".into(), Value::from(task_name.as_str()));
                body.insert("appName".into(), Value::from(app_name.as_str()));
            }
            EventPayload::Session {
                sub_type,
                user_directory,
                user_id,
            } => {
                body.insert("subType".into(), Value::from(sub_type.as_wire()));
                body.insert("userDirectory".into(), Value::from(user_directory.as_str()));
                body.insert("userId".into(), Value::from(user_id.as_str()));
            }
            EventPayload::ListenerStatus {
                listener,
                state,
                local_addr,
            } => {
                body.insert("listener".into(), Value::from(listener.as_str()));
                body.insert("state".into(), Value::from(state.to_string()));
                if let Some(addr) = local_addr {
                    body.insert("address".into(), Value::from(addr.to_string()));
                }
            }
        }

        Value::Object(body)
    }
}

#[async_trait]
impl NotificationSink for NewRelicSink {
    fn kind(&self) -> SinkKind {
        SinkKind::NewRelic
    }

    #[instrument(name = "new_relic_sink_send", skip(self, event), fields(event_type = %target))]
    async fn send(&self, event: &Event, target: &str) -> Result<(), SinkDeliveryError> {
        let mut request = self
            .client
            .post(&self.events_url)
            .header("Api-Key", &self.insert_api_key);
        for header in &self.headers {
            request = request.header(header.name.as_str(), header.value.as_str());
        }

        post_json(request, &self.event_body(event, target)).await
    }
}
