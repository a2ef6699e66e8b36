//! LogSink - writes each event as a structured tracing line

use async_trait::async_trait;
use contracts::{redact_target, Event, NotificationSink, SinkDeliveryError, SinkKind};
use tracing::{info, instrument};

/// Sink that logs events
///
/// Also stands in for other sink kinds in dry-run mode, so routing can be
/// checked without touching any remote service.
pub struct LogSink {
    kind: SinkKind,
}

impl LogSink {
    pub fn new() -> Self {
        Self {
            kind: SinkKind::Log,
        }
    }

    /// Log in place of `kind`
    pub fn stand_in(kind: SinkKind) -> Self {
        Self { kind }
    }

    fn log_event(&self, event: &Event, target: &str) {
        let fields = event
            .labeled_fields()
            .into_iter()
            .map(|(label, value)| format!("{label}={value}"))
            .collect::<Vec<_>>()
            .join(", ");

        info!(
            sink = %self.kind,
            target = %redact_target(target),
            source_id = %event.source_id,
            category = %event.category(),
            timestamp = %event.timestamp.to_rfc3339(),
            fields = %fields,
            "{}",
            event.summary()
        );
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationSink for LogSink {
    fn kind(&self) -> SinkKind {
        self.kind
    }

    #[instrument(
        name = "log_sink_send",
        skip(self, event, target),
        fields(sink = %self.kind, category = %event.category())
    )]
    async fn send(&self, event: &Event, target: &str) -> Result<(), SinkDeliveryError> {
        self.log_event(event, target);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_sink_send() {
        let sink = LogSink::new();
        let event = Event::task_failure("srv01", "ReloadJob", "SalesApp");
        assert!(sink.send(&event, "tracing").await.is_ok());
        assert_eq!(sink.kind(), SinkKind::Log);
    }

    #[test]
    fn test_stand_in_reports_kind() {
        assert_eq!(LogSink::stand_in(SinkKind::Teams).kind(), SinkKind::Teams);
    }
}
