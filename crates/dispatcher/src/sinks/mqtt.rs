//! MqttSink - publishes plain-text messages to an MQTT broker
//!
//! One connection per process. `AsyncClient` queues publishes into the
//! event loop task, which is the single writer on the socket, so
//! concurrent `send` calls are safe. Publishes are refused while the
//! broker connection is down so the bounded request queue never fills.

use std::time::Duration;

use async_trait::async_trait;
use contracts::{Event, EventPayload, MqttConfig, NotificationSink, SinkDeliveryError, SinkKind};
use rumqttc::{AsyncClient, EventLoop, MqttOptions, Packet, QoS};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::error::DispatcherError;

/// Capacity of the client-to-event-loop request queue
const REQUEST_QUEUE_CAPACITY: usize = 64;

const RECONNECT_DELAY: Duration = Duration::from_secs(2);

pub struct MqttSink {
    client: AsyncClient,
    broker: String,
    connected: watch::Receiver<bool>,
    event_loop: JoinHandle<()>,
}

impl MqttSink {
    /// Create the client and start driving its connection
    ///
    /// The connection is established in the background; publishes issued
    /// before the broker acknowledges it fail with a transport error.
    ///
    /// # Errors
    /// An empty client id, or one starting with a space
    #[instrument(
        name = "mqtt_sink_connect",
        skip(config),
        fields(host = %config.broker_host, port = config.broker_port)
    )]
    pub fn connect(config: &MqttConfig) -> Result<Self, DispatcherError> {
        if config.client_id.is_empty() || config.client_id.starts_with(' ') {
            return Err(DispatcherError::sink_creation(
                "mqtt",
                format!("invalid client id {:?}", config.client_id),
            ));
        }

        let mut options = MqttOptions::new(
            config.client_id.clone(),
            config.broker_host.clone(),
            config.broker_port,
        );
        options.set_keep_alive(Duration::from_secs(config.keep_alive_secs));

        let (client, event_loop) = AsyncClient::new(options, REQUEST_QUEUE_CAPACITY);
        let broker = format!("{}:{}", config.broker_host, config.broker_port);
        let (connected_tx, connected) = watch::channel(false);
        let event_loop = tokio::spawn(drive_event_loop(event_loop, broker.clone(), connected_tx));

        debug!(broker = %broker, "MQTT client created");

        Ok(Self {
            client,
            broker,
            connected,
            event_loop,
        })
    }

    /// Whether the broker has acknowledged the current connection
    pub fn is_connected(&self) -> bool {
        *self.connected.borrow()
    }

    /// Wait up to `within` for the broker to acknowledge the connection
    pub async fn wait_connected(&self, within: Duration) -> bool {
        let mut connected = self.connected.clone();
        let up = matches!(
            tokio::time::timeout(within, connected.wait_for(|up| *up)).await,
            Ok(Ok(_))
        );
        up
    }
}

async fn drive_event_loop(
    mut event_loop: EventLoop,
    broker: String,
    connected: watch::Sender<bool>,
) {
    loop {
        match event_loop.poll().await {
            Ok(rumqttc::Event::Incoming(Packet::ConnAck(ack))) => {
                connected.send_replace(true);
                info!(broker = %broker, code = ?ack.code, "connected to MQTT broker");
            }
            Ok(_) => {}
            Err(e) => {
                connected.send_replace(false);
                warn!(broker = %broker, error = %e, "MQTT connection error, reconnecting");
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}

impl Drop for MqttSink {
    fn drop(&mut self) {
        self.event_loop.abort();
    }
}

/// Plain-text message published for an event
pub fn broker_payload(event: &Event) -> String {
    match &event.payload {
        EventPayload::TaskFailure {
            task_name,
            app_name,
        } => format!("{}: {} / {}", event.source_id, task_name, app_name),
        EventPayload::Session {
            user_directory,
            user_id,
            ..
        } => format!("{}: {}/{}", event.source_id, user_directory, user_id),
        EventPayload::ListenerStatus { state, .. } => state.status_word().to_string(),
    }
}

#[async_trait]
impl NotificationSink for MqttSink {
    fn kind(&self) -> SinkKind {
        SinkKind::Broker
    }

    #[instrument(
        name = "mqtt_sink_send",
        skip(self, event),
        fields(broker = %self.broker, topic = %target)
    )]
    async fn send(&self, event: &Event, target: &str) -> Result<(), SinkDeliveryError> {
        if !self.is_connected() {
            return Err(SinkDeliveryError::transport(format!(
                "not connected to broker {}",
                self.broker
            )));
        }
        self.client
            .publish(target, QoS::AtMostOnce, false, broker_payload(event))
            .await
            .map_err(SinkDeliveryError::transport)
    }
}
