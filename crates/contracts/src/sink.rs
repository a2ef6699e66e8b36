//! NotificationSink / EventDispatch traits
//!
//! `NotificationSink` is the dispatcher's output interface, one
//! implementation per sink kind. `EventDispatch` is what producers
//! (listeners, REST handlers) call to fan an event out.

use async_trait::async_trait;
use std::net::SocketAddr;

use crate::{DispatchReport, Event, ListenerKind, ListenerState, SinkDeliveryError, SinkKind};

/// A connected, long-lived handle to one downstream channel
///
/// Implementations must tolerate concurrent `send` calls from many
/// in-flight dispatches.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Sink kind this client serves
    fn kind(&self) -> SinkKind;

    /// Deliver one event to `target`
    ///
    /// `target` comes from the sink registry's route for the event.
    ///
    /// # Errors
    /// Any transport failure or non-success response
    async fn send(&self, event: &Event, target: &str) -> Result<(), SinkDeliveryError>;
}

/// Fan-out entry point shared by every event producer
#[async_trait]
pub trait EventDispatch: Send + Sync {
    /// Deliver `event` to every enabled, applicable sink
    async fn dispatch(&self, event: Event) -> DispatchReport;

    /// Publish a listener lifecycle transition through the same pipeline
    async fn publish_status(
        &self,
        listener: ListenerKind,
        state: ListenerState,
        local_addr: Option<SocketAddr>,
    ) -> DispatchReport {
        self.dispatch(Event::listener_status(listener, state, local_addr))
            .await
    }
}
