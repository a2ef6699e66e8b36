//! Dispatcher - fans one event out to every applicable sink
//!
//! Each resolved sink runs on its own task under a timeout, so a slow or
//! failing sink is recorded as a failed attempt and nothing more.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use contracts::{
    redact_target, DispatchReport, Event, EventDispatch, NotificationSink, RelayBlueprint,
    ResolvedSink, RouteKey, SinkAttempt, SinkDeliveryError, SinkKind,
};

use crate::error::DispatcherError;
use crate::metrics::{MetricsSnapshot, SinkMetrics};
use crate::registry::SinkRegistry;
use crate::sinks::{build_http_client, LogSink, MqttSink, NewRelicSink, SlackSink, TeamsSink};

/// Builder creating a Dispatcher and its sink clients from a blueprint
pub struct DispatcherBuilder {
    blueprint: RelayBlueprint,
    dry_run: bool,
}

impl DispatcherBuilder {
    pub fn new(blueprint: RelayBlueprint) -> Self {
        Self {
            blueprint,
            dry_run: false,
        }
    }

    /// Replace every remote sink with a log line
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Connect a client for each sink kind that has at least one route
    #[instrument(name = "dispatcher_builder_build", skip(self), fields(dry_run = self.dry_run))]
    pub async fn build(self) -> Result<Dispatcher, DispatcherError> {
        let registry = SinkRegistry::from_blueprint(&self.blueprint);
        let sink_timeout = Duration::from_millis(self.blueprint.dispatch.sink_timeout_ms);
        let kinds = registry.enabled_kinds();

        let mut dispatcher = Dispatcher::new(registry, sink_timeout);

        let needs_http = kinds
            .iter()
            .any(|k| matches!(k, SinkKind::Slack | SinkKind::Teams | SinkKind::NewRelic));
        let http = if needs_http && !self.dry_run {
            Some(build_http_client(sink_timeout)?)
        } else {
            None
        };

        for kind in kinds {
            let sink = self.create_sink(kind, http.as_ref(), sink_timeout).await?;
            info!(sink = %kind, dry_run = self.dry_run, "sink client ready");
            dispatcher = dispatcher.with_sink(sink);
        }

        Ok(dispatcher)
    }

    async fn create_sink(
        &self,
        kind: SinkKind,
        http: Option<&reqwest::Client>,
        connect_wait: Duration,
    ) -> Result<Arc<dyn NotificationSink>, DispatcherError> {
        if self.dry_run {
            return Ok(Arc::new(LogSink::stand_in(kind)));
        }

        let http_client = || {
            http.cloned()
                .ok_or_else(|| DispatcherError::sink_creation(kind.as_str(), "no HTTP client"))
        };

        let bp = &self.blueprint;
        let sink: Arc<dyn NotificationSink> = match kind {
            SinkKind::Broker => {
                let mqtt = MqttSink::connect(&bp.mqtt)?;
                if !mqtt.wait_connected(connect_wait).await {
                    warn!(
                        host = %bp.mqtt.broker_host,
                        port = bp.mqtt.broker_port,
                        "MQTT broker not reachable yet, publishes fail until it is"
                    );
                }
                Arc::new(mqtt)
            }
            SinkKind::Slack => Arc::new(SlackSink::new(http_client()?, &bp.slack)?),
            SinkKind::Teams => Arc::new(TeamsSink::new(http_client()?)),
            SinkKind::NewRelic => Arc::new(NewRelicSink::new(http_client()?, &bp.new_relic)),
            SinkKind::Log => Arc::new(LogSink::new()),
        };
        Ok(sink)
    }
}

/// Fan-out engine
///
/// Shared by every listener; all state is read-only after construction
/// apart from the counters.
pub struct Dispatcher {
    registry: SinkRegistry,
    clients: HashMap<SinkKind, Arc<dyn NotificationSink>>,
    sink_timeout: Duration,
    metrics: HashMap<SinkKind, SinkMetrics>,
}

impl Dispatcher {
    /// Create a dispatcher with no sink clients attached
    pub fn new(registry: SinkRegistry, sink_timeout: Duration) -> Self {
        Self {
            registry,
            clients: HashMap::new(),
            sink_timeout,
            metrics: SinkKind::ALL
                .into_iter()
                .map(|kind| (kind, SinkMetrics::new()))
                .collect(),
        }
    }

    /// Attach the client for `sink.kind()`, replacing any previous one
    pub fn with_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.clients.insert(sink.kind(), sink);
        self
    }

    pub fn registry(&self) -> &SinkRegistry {
        &self.registry
    }

    pub fn sink_timeout(&self) -> Duration {
        self.sink_timeout
    }

    /// Counters for every sink kind that has been attempted at least once
    pub fn metrics(&self) -> Vec<(SinkKind, MetricsSnapshot)> {
        SinkKind::ALL
            .into_iter()
            .filter_map(|kind| {
                let snapshot = self.metrics.get(&kind)?.snapshot();
                (snapshot.attempts > 0).then_some((kind, snapshot))
            })
            .collect()
    }

    #[instrument(
        name = "dispatcher_dispatch",
        skip(self, event),
        fields(category = %event.category(), source_id = %event.source_id)
    )]
    async fn dispatch_event(&self, event: Event) -> DispatchReport {
        let key = RouteKey::from(&event);
        let mut report = DispatchReport::new(event.category());

        let targets = self.registry.sinks_for(key);
        if targets.is_empty() {
            debug!(route = %key, "no sink routed for event");
            observability::record_dispatch_report(&report);
            return report;
        }

        let started = Instant::now();
        let event = Arc::new(event);
        let mut tasks = JoinSet::new();
        let mut in_flight: HashMap<tokio::task::Id, ResolvedSink> = HashMap::new();

        for resolved in targets {
            let Some(client) = self.clients.get(&resolved.kind).cloned() else {
                self.finish(
                    &mut report,
                    &event,
                    resolved.clone(),
                    Err(SinkDeliveryError::Unavailable),
                    Duration::ZERO,
                );
                continue;
            };

            let event = event.clone();
            let target = resolved.target.clone();
            let timeout = self.sink_timeout;
            let handle = tasks.spawn(async move {
                let attempt_started = Instant::now();
                let outcome = match tokio::time::timeout(timeout, client.send(&event, &target)).await
                {
                    Ok(result) => result,
                    Err(_) => Err(SinkDeliveryError::Timeout {
                        after_ms: timeout.as_millis() as u64,
                    }),
                };
                (outcome, attempt_started.elapsed())
            });
            in_flight.insert(handle.id(), resolved.clone());
        }

        while let Some(joined) = tasks.join_next_with_id().await {
            let (id, outcome, elapsed) = match joined {
                Ok((id, (outcome, elapsed))) => (id, outcome, elapsed),
                Err(e) => (
                    e.id(),
                    Err(SinkDeliveryError::Aborted(e.to_string())),
                    started.elapsed(),
                ),
            };

            if let Some(resolved) = in_flight.remove(&id) {
                self.finish(&mut report, &event, resolved, outcome, elapsed);
            }
        }

        observability::record_dispatch_report(&report);
        debug!(
            succeeded = report.success_count(),
            failed = report.failure_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "event dispatched"
        );
        report
    }

    /// Count, log and record one attempt
    fn finish(
        &self,
        report: &mut DispatchReport,
        event: &Event,
        resolved: ResolvedSink,
        outcome: Result<(), SinkDeliveryError>,
        elapsed: Duration,
    ) {
        let attempt = SinkAttempt {
            kind: resolved.kind,
            target: resolved.target,
            outcome,
            elapsed,
        };

        if let Some(metrics) = self.metrics.get(&attempt.kind) {
            metrics.record(&attempt);
        }

        match &attempt.outcome {
            Ok(()) => debug!(
                sink = %attempt.kind,
                target = %redact_target(&attempt.target),
                elapsed_ms = elapsed.as_millis() as u64,
                "sink delivery succeeded"
            ),
            Err(e) => warn!(
                sink = %attempt.kind,
                target = %redact_target(&attempt.target),
                category = %event.category(),
                source_id = %event.source_id,
                error = %e,
                elapsed_ms = elapsed.as_millis() as u64,
                "sink delivery failed"
            ),
        }

        report.push(attempt);
    }
}

#[async_trait]
impl EventDispatch for Dispatcher {
    async fn dispatch(&self, event: Event) -> DispatchReport {
        self.dispatch_event(event).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ListenerKind, ListenerState, MqttTopics, SessionSubType};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Sink that records calls and behaves as configured
    struct ScriptedSink {
        kind: SinkKind,
        behaviour: Behaviour,
        calls: Mutex<Vec<(Event, String)>>,
    }

    #[derive(Clone, Copy)]
    enum Behaviour {
        Succeed,
        Fail,
        Hang,
        Panic,
    }

    impl ScriptedSink {
        fn new(kind: SinkKind, behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self {
                kind,
                behaviour,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl NotificationSink for ScriptedSink {
        fn kind(&self) -> SinkKind {
            self.kind
        }

        async fn send(&self, event: &Event, target: &str) -> Result<(), SinkDeliveryError> {
            self.calls
                .lock()
                .unwrap()
                .push((event.clone(), target.to_string()));
            match self.behaviour {
                Behaviour::Succeed => Ok(()),
                Behaviour::Fail => Err(SinkDeliveryError::Status { status: 500 }),
                Behaviour::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(())
                }
                Behaviour::Panic => panic!("sink exploded"),
            }
        }
    }

    fn registry_for(kinds: &[(SinkKind, &str)]) -> SinkRegistry {
        SinkRegistry::from_routes(
            RouteKey::all()
                .into_iter()
                .flat_map(|key| {
                    kinds
                        .iter()
                        .map(move |(kind, target)| (key, ResolvedSink::new(*kind, *target)))
                })
                .collect::<Vec<_>>(),
        )
    }

    #[tokio::test]
    async fn test_single_enabled_sink_called_once() {
        let broker = ScriptedSink::new(SinkKind::Broker, Behaviour::Succeed);
        let slack = ScriptedSink::new(SinkKind::Slack, Behaviour::Succeed);

        let dispatcher = Dispatcher::new(
            registry_for(&[(SinkKind::Broker, "task/failure")]),
            Duration::from_secs(1),
        )
        .with_sink(broker.clone())
        .with_sink(slack.clone());

        let report = dispatcher
            .dispatch(Event::task_failure("srv01", "Job", "App"))
            .await;

        assert_eq!(report.attempts.len(), 1);
        assert_eq!(broker.call_count(), 1);
        assert_eq!(slack.call_count(), 0);
        assert_eq!(broker.calls.lock().unwrap()[0].1, "task/failure");
    }

    #[tokio::test]
    async fn test_failure_does_not_affect_sibling() {
        let broker = ScriptedSink::new(SinkKind::Broker, Behaviour::Fail);
        let slack = ScriptedSink::new(SinkKind::Slack, Behaviour::Succeed);

        let dispatcher = Dispatcher::new(
            registry_for(&[(SinkKind::Broker, "t"), (SinkKind::Slack, "#c")]),
            Duration::from_secs(1),
        )
        .with_sink(broker.clone())
        .with_sink(slack.clone());

        let report = dispatcher
            .dispatch(Event::task_failure("srv01", "Job", "App"))
            .await;

        assert_eq!(report.success_count(), 1);
        assert_eq!(report.failure_count(), 1);
        assert!(report.attempt(SinkKind::Slack).unwrap().is_success());
        assert!(matches!(
            report.attempt(SinkKind::Broker).unwrap().outcome,
            Err(SinkDeliveryError::Status { status: 500 })
        ));
    }

    #[tokio::test]
    async fn test_hanging_sink_times_out() {
        let broker = ScriptedSink::new(SinkKind::Broker, Behaviour::Hang);
        let slack = ScriptedSink::new(SinkKind::Slack, Behaviour::Succeed);

        let dispatcher = Dispatcher::new(
            registry_for(&[(SinkKind::Broker, "t"), (SinkKind::Slack, "#c")]),
            Duration::from_millis(100),
        )
        .with_sink(broker)
        .with_sink(slack);

        let started = Instant::now();
        let report = dispatcher
            .dispatch(Event::task_failure("srv01", "Job", "App"))
            .await;

        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(report.attempt(SinkKind::Slack).unwrap().is_success());
        assert!(matches!(
            report.attempt(SinkKind::Broker).unwrap().outcome,
            Err(SinkDeliveryError::Timeout { after_ms: 100 })
        ));

        let metrics: HashMap<_, _> = dispatcher.metrics().into_iter().collect();
        assert_eq!(metrics[&SinkKind::Broker].timed_out, 1);
        assert_eq!(metrics[&SinkKind::Slack].delivered, 1);
    }

    #[tokio::test]
    async fn test_panicking_sink_is_isolated() {
        let teams = ScriptedSink::new(SinkKind::Teams, Behaviour::Panic);
        let log = ScriptedSink::new(SinkKind::Log, Behaviour::Succeed);

        let dispatcher = Dispatcher::new(
            registry_for(&[(SinkKind::Teams, "https://hook"), (SinkKind::Log, "tracing")]),
            Duration::from_secs(1),
        )
        .with_sink(teams)
        .with_sink(log);

        let report = dispatcher
            .dispatch(Event::task_failure("srv01", "Job", "App"))
            .await;

        assert!(report.attempt(SinkKind::Log).unwrap().is_success());
        assert!(matches!(
            report.attempt(SinkKind::Teams).unwrap().outcome,
            Err(SinkDeliveryError::Aborted(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_client_is_unavailable() {
        let dispatcher = Dispatcher::new(
            registry_for(&[(SinkKind::NewRelic, "ButlerEvent")]),
            Duration::from_secs(1),
        );

        let report = dispatcher
            .dispatch(Event::task_failure("srv01", "Job", "App"))
            .await;

        assert!(matches!(
            report.attempt(SinkKind::NewRelic).unwrap().outcome,
            Err(SinkDeliveryError::Unavailable)
        ));
    }

    #[tokio::test]
    async fn test_unrouted_event_yields_empty_report() {
        let broker = ScriptedSink::new(SinkKind::Broker, Behaviour::Succeed);
        let dispatcher = Dispatcher::new(
            SinkRegistry::from_routes([(
                RouteKey::TaskFailure,
                ResolvedSink::new(SinkKind::Broker, "t"),
            )]),
            Duration::from_secs(1),
        )
        .with_sink(broker.clone());

        let report = dispatcher
            .dispatch(Event::session("srv01", SessionSubType::StartSession, "D", "u"))
            .await;

        assert!(report.is_empty());
        assert_eq!(broker.call_count(), 0);
    }

    #[tokio::test]
    async fn test_publish_status_uses_status_route() {
        let broker = ScriptedSink::new(SinkKind::Broker, Behaviour::Succeed);
        let dispatcher = Dispatcher::new(
            SinkRegistry::from_routes([(
                RouteKey::ListenerStatus(ListenerKind::TaskFailure),
                ResolvedSink::new(SinkKind::Broker, "status/task_failure"),
            )]),
            Duration::from_secs(1),
        )
        .with_sink(broker.clone());

        let report = dispatcher
            .publish_status(ListenerKind::TaskFailure, ListenerState::Bound, None)
            .await;

        assert_eq!(report.success_count(), 1);
        let calls = broker.calls.lock().unwrap();
        assert_eq!(calls[0].1, "status/task_failure");
    }

    #[tokio::test]
    async fn test_concurrent_dispatches_share_clients() {
        let counter = Arc::new(AtomicUsize::new(0));

        struct Counting(Arc<AtomicUsize>);

        #[async_trait]
        impl NotificationSink for Counting {
            fn kind(&self) -> SinkKind {
                SinkKind::Broker
            }

            async fn send(&self, _: &Event, _: &str) -> Result<(), SinkDeliveryError> {
                tokio::time::sleep(Duration::from_millis(5)).await;
                self.0.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }

        let dispatcher = Arc::new(
            Dispatcher::new(
                registry_for(&[(SinkKind::Broker, "t")]),
                Duration::from_secs(1),
            )
            .with_sink(Arc::new(Counting(counter.clone()))),
        );

        let mut tasks = JoinSet::new();
        for i in 0..20 {
            let dispatcher = dispatcher.clone();
            tasks.spawn(async move {
                dispatcher
                    .dispatch(Event::task_failure("srv01", format!("Job{i}"), "App"))
                    .await
            });
        }
        while let Some(report) = tasks.join_next().await {
            assert_eq!(report.unwrap().success_count(), 1);
        }

        assert_eq!(counter.load(Ordering::SeqCst), 20);
    }

    #[tokio::test]
    async fn test_builder_dry_run_uses_log_stand_ins() {
        let mut bp = RelayBlueprint::default();
        bp.mqtt.enable = true;
        bp.mqtt.topics = MqttTopics {
            task_failure: Some("task/failure".into()),
            ..Default::default()
        };

        let dispatcher = DispatcherBuilder::new(bp).dry_run(true).build().await.unwrap();
        let report = dispatcher
            .dispatch(Event::task_failure("srv01", "Job", "App"))
            .await;

        assert_eq!(report.attempts.len(), 1);
        assert!(report.attempt(SinkKind::Broker).unwrap().is_success());
    }

    #[tokio::test]
    async fn test_builder_without_sinks() {
        let dispatcher = DispatcherBuilder::new(RelayBlueprint::default())
            .build()
            .await
            .unwrap();
        assert!(dispatcher.registry().is_empty());
        assert_eq!(dispatcher.sink_timeout(), Duration::from_millis(5000));
    }
}
