//! # Integration Tests
//!
//! Cross-crate scenarios run over real loopback UDP sockets:
//! - datagram -> listener -> dispatcher -> sink
//! - failure isolation between sinks
//! - configuration file -> running relay

#[cfg(test)]
mod contract_tests {
    #[test]
    fn test_contracts_compile() {
        let _ = contracts::ConfigVersion::V1;
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use contracts::{
        DispatchReport, Event, EventCategory, EventDispatch, ListenerKind, MqttConfig,
        MqttTopics, NotificationSink, RelayBlueprint, SinkDeliveryError, SinkKind, SlackConfig,
    };
    use dispatcher::{broker_payload, Dispatcher, SinkRegistry, SlackSink};
    use ingestion::{ListenerHandle, ListenerManager};
    use tokio::net::UdpSocket;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Broker stand-in recording `(topic, body)` per publish
    #[derive(Default)]
    struct RecordingBroker {
        published: Mutex<Vec<(String, String)>>,
        delay: Option<Duration>,
    }

    impl RecordingBroker {
        fn hanging(delay: Duration) -> Self {
            Self {
                delay: Some(delay),
                ..Default::default()
            }
        }

        fn published(&self) -> Vec<(String, String)> {
            self.published.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl NotificationSink for RecordingBroker {
        fn kind(&self) -> SinkKind {
            SinkKind::Broker
        }

        async fn send(&self, event: &Event, target: &str) -> Result<(), SinkDeliveryError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.published
                .lock()
                .unwrap()
                .push((target.to_string(), broker_payload(event)));
            Ok(())
        }
    }

    /// Keeps every report the dispatcher returns
    struct ReportTap {
        inner: Dispatcher,
        reports: Mutex<Vec<DispatchReport>>,
    }

    impl ReportTap {
        fn new(inner: Dispatcher) -> Arc<Self> {
            Arc::new(Self {
                inner,
                reports: Mutex::new(Vec::new()),
            })
        }

        fn reports_for(&self, category: EventCategory) -> Vec<DispatchReport> {
            self.reports
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.category == category)
                .cloned()
                .collect()
        }
    }

    #[async_trait]
    impl EventDispatch for ReportTap {
        async fn dispatch(&self, event: Event) -> DispatchReport {
            let report = self.inner.dispatch(event).await;
            self.reports.lock().unwrap().push(report.clone());
            report
        }
    }

    fn base_blueprint() -> RelayBlueprint {
        let mut bp = RelayBlueprint::default();
        bp.udp.host = "127.0.0.1".into();
        bp.log_sink.enable = false;
        bp
    }

    fn broker_blueprint() -> RelayBlueprint {
        RelayBlueprint {
            mqtt: MqttConfig {
                enable: true,
                topics: MqttTopics {
                    task_failure: Some("task/failure".into()),
                    ..Default::default()
                },
                ..Default::default()
            },
            ..base_blueprint()
        }
    }

    fn slack_blueprint(webhook_url: String) -> RelayBlueprint {
        RelayBlueprint {
            slack: SlackConfig {
                enable: true,
                webhook_url: Some(webhook_url),
                task_failure_channel: Some("#alerts".into()),
                login_notification_channel: Some("#logins".into()),
                ..Default::default()
            },
            ..base_blueprint()
        }
    }

    async fn start(dispatch: Arc<dyn EventDispatch>, kind: ListenerKind) -> ListenerHandle {
        ListenerManager::new(dispatch)
            .start_listener(kind, "127.0.0.1", 0)
            .await
            .unwrap()
    }

    async fn send(to: SocketAddr, payload: &[u8]) {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        socket.send_to(payload, to).await.unwrap();
    }

    /// Poll `condition` every 10ms for up to two seconds
    async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
        for _ in 0..200 {
            if condition() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        condition()
    }

    #[tokio::test]
    async fn test_task_failure_reaches_broker_topic() {
        let broker = Arc::new(RecordingBroker::default());
        let dispatcher = Dispatcher::new(
            SinkRegistry::from_blueprint(&broker_blueprint()),
            Duration::from_secs(1),
        )
        .with_sink(broker.clone());

        let handle = start(Arc::new(dispatcher), ListenerKind::TaskFailure).await;
        send(handle.local_addr(), b"srv01;ReloadJob;SalesApp").await;

        assert!(eventually(|| !broker.published().is_empty()).await);
        let published = broker.published();
        assert_eq!(published.len(), 1);
        let (topic, body) = &published[0];
        assert_eq!(topic, "task/failure");
        assert!(body.contains("ReloadJob"));
        assert!(body.contains("SalesApp"));

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_session_start_posts_one_webhook() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let blueprint = slack_blueprint(format!("{}/hook", server.uri()));
        let slack = SlackSink::new(reqwest::Client::new(), &blueprint.slack).unwrap();
        let broker = Arc::new(RecordingBroker::default());
        let dispatcher = Dispatcher::new(
            SinkRegistry::from_blueprint(&blueprint),
            Duration::from_secs(2),
        )
        .with_sink(Arc::new(slack))
        .with_sink(broker.clone());

        let handle = start(Arc::new(dispatcher), ListenerKind::SessionConnection).await;
        send(handle.local_addr(), b"srv01;Start session;DOMAIN;alice").await;

        let mut posted = false;
        for _ in 0..200 {
            if server
                .received_requests()
                .await
                .is_some_and(|requests| !requests.is_empty())
            {
                posted = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(posted);
        tokio::time::sleep(Duration::from_millis(100)).await;

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["channel"], "#logins");
        let text = body["text"].as_str().unwrap();
        assert!(text.contains("DOMAIN"));
        assert!(text.contains("alice"));
        assert!(broker.published().is_empty());

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_malformed_datagram_counted_as_decode_failure_and_reaches_no_sink() {
        let broker = Arc::new(RecordingBroker::default());
        let dispatcher = Dispatcher::new(
            SinkRegistry::from_blueprint(&broker_blueprint()),
            Duration::from_secs(1),
        )
        .with_sink(broker.clone());
        let dispatch: Arc<dyn EventDispatch> = Arc::new(dispatcher);

        let failure = start(dispatch.clone(), ListenerKind::TaskFailure).await;
        let session = start(dispatch, ListenerKind::SessionConnection).await;
        send(failure.local_addr(), b"onlyonefield").await;
        send(session.local_addr(), b"onlyonefield").await;

        // decode_failures is bumped on the same path that logs the drop warning
        assert!(eventually(|| failure.metrics().decode_failures == 1
            && session.metrics().decode_failures == 1)
        .await);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(broker.published().is_empty());
        assert_eq!(failure.metrics().events_dispatched, 0);
        assert_eq!(session.metrics().events_dispatched, 0);

        failure.shutdown().await;
        session.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_completes_slow_webhook_delivery() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(800)))
            .mount(&server)
            .await;

        let blueprint = slack_blueprint(format!("{}/hook", server.uri()));
        let slack = SlackSink::new(reqwest::Client::new(), &blueprint.slack).unwrap();
        let dispatcher = Dispatcher::new(
            SinkRegistry::from_blueprint(&blueprint),
            Duration::from_secs(2),
        )
        .with_sink(Arc::new(slack));
        let tap = ReportTap::new(dispatcher);

        let handle = start(tap.clone(), ListenerKind::TaskFailure).await;
        send(handle.local_addr(), b"srv01;ReloadJob;SalesApp").await;
        assert!(eventually(|| handle.metrics().events_dispatched == 1).await);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(tap.reports_for(EventCategory::TaskFailure).is_empty());

        handle.shutdown().await;

        let reports = tap.reports_for(EventCategory::TaskFailure);
        assert_eq!(reports.len(), 1);
        let attempt = reports[0].attempt(SinkKind::Slack).unwrap();
        assert!(attempt.is_success());
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_broker_timeout_does_not_block_slack() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let mut blueprint = slack_blueprint(format!("{}/hook", server.uri()));
        blueprint.mqtt = broker_blueprint().mqtt;

        let slack = SlackSink::new(reqwest::Client::new(), &blueprint.slack).unwrap();
        let dispatcher = Dispatcher::new(
            SinkRegistry::from_blueprint(&blueprint),
            Duration::from_millis(200),
        )
        .with_sink(Arc::new(slack))
        .with_sink(Arc::new(RecordingBroker::hanging(Duration::from_secs(30))));
        let tap = ReportTap::new(dispatcher);

        let handle = start(tap.clone(), ListenerKind::TaskFailure).await;
        send(handle.local_addr(), b"srv01;ReloadJob;SalesApp").await;

        assert!(eventually(|| !tap.reports_for(EventCategory::TaskFailure).is_empty()).await);
        let report = &tap.reports_for(EventCategory::TaskFailure)[0];

        assert_eq!(report.attempts.len(), 2);
        assert_eq!(report.success_count(), 1);
        assert_eq!(report.failure_count(), 1);
        let broker = report.attempt(SinkKind::Broker).unwrap();
        assert!(matches!(
            broker.outcome,
            Err(SinkDeliveryError::Timeout { after_ms: 200 })
        ));
        assert!(report.attempt(SinkKind::Slack).unwrap().is_success());

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_bind_success_and_failure_publish_status() {
        let occupied = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let taken_port = occupied.local_addr().unwrap().port();

        let mut blueprint = broker_blueprint();
        blueprint.mqtt.topics.task_failure_server_status = Some("butler/task_failure".into());
        blueprint.mqtt.topics.session_server_status = Some("butler/session".into());

        let broker = Arc::new(RecordingBroker::default());
        let dispatcher = Dispatcher::new(
            SinkRegistry::from_blueprint(&blueprint),
            Duration::from_secs(1),
        )
        .with_sink(broker.clone());
        let manager = ListenerManager::new(Arc::new(dispatcher));

        let bound = manager
            .start_listener(ListenerKind::TaskFailure, "127.0.0.1", 0)
            .await
            .unwrap();
        let failed = manager
            .start_listener(ListenerKind::SessionConnection, "127.0.0.1", taken_port)
            .await;
        assert!(failed.is_err());

        let published = broker.published();
        assert_eq!(
            published,
            vec![
                ("butler/task_failure".to_string(), "start".to_string()),
                ("butler/session".to_string(), "error".to_string()),
            ]
        );

        bound.shutdown().await;
    }
}

#[cfg(test)]
mod config_tests {
    use std::io::Write;
    use std::sync::Arc;
    use std::time::Duration;

    use config_loader::ConfigLoader;
    use contracts::{ListenerKind, RouteKey, SessionSubType, SinkKind};
    use dispatcher::{DispatcherBuilder, SinkRegistry};
    use ingestion::ListenerManager;
    use tokio::net::UdpSocket;

    const RELAY_TOML: &str = r##"
[udp]
host = "127.0.0.1"
task_failure_port = 19998
session_connection_port = 19997

[dispatch]
sink_timeout_ms = 1500

[mqtt]
enable = true
broker_host = "mqtt.local"
[mqtt.topics]
task_failure = "qliksense/task_failure"
session_start = "qliksense/session_start"

[slack]
enable = true
webhook_url = "https://hooks.slack.com/services/T/B/X"
login_notification_channel = "#logins"

[log_sink]
enable = true
"##;

    #[test]
    fn test_config_file_to_routing_table() {
        let file = tempfile_with(RELAY_TOML);
        let blueprint = ConfigLoader::load_from_path(file.path()).unwrap();
        let registry = SinkRegistry::from_blueprint(&blueprint);

        let start_kinds: Vec<SinkKind> = registry
            .sinks_for(RouteKey::Session(SessionSubType::StartSession))
            .iter()
            .map(|s| s.kind)
            .collect();
        assert!(start_kinds.contains(&SinkKind::Broker));
        assert!(start_kinds.contains(&SinkKind::Slack));
        assert!(start_kinds.contains(&SinkKind::Log));

        let stop_kinds: Vec<SinkKind> = registry
            .sinks_for(RouteKey::Session(SessionSubType::StopSession))
            .iter()
            .map(|s| s.kind)
            .collect();
        assert_eq!(stop_kinds, vec![SinkKind::Slack, SinkKind::Log]);
    }

    #[tokio::test]
    async fn test_dry_run_relay_from_config_file() {
        let file = tempfile_with(RELAY_TOML);
        let blueprint = ConfigLoader::load_from_path(file.path()).unwrap();

        let dispatcher = DispatcherBuilder::new(blueprint)
            .dry_run(true)
            .build()
            .await
            .unwrap();
        assert_eq!(dispatcher.sink_timeout(), Duration::from_millis(1500));
        let dispatcher = Arc::new(dispatcher);

        let handle = ListenerManager::new(dispatcher.clone())
            .start_listener(ListenerKind::TaskFailure, "127.0.0.1", 0)
            .await
            .unwrap();

        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        socket
            .send_to(b"srv01;ReloadJob;SalesApp", handle.local_addr())
            .await
            .unwrap();

        let broker_delivered = || {
            dispatcher
                .metrics()
                .into_iter()
                .find(|(kind, _)| *kind == SinkKind::Broker)
                .map_or(0, |(_, snapshot)| snapshot.delivered)
        };
        let mut delivered = false;
        for _ in 0..200 {
            if broker_delivered() == 1 {
                delivered = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(delivered);
        assert_eq!(handle.metrics().events_dispatched, 1);

        handle.shutdown().await;
    }

    fn tempfile_with(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(file, "{content}").unwrap();
        file.flush().unwrap();
        file
    }
}
