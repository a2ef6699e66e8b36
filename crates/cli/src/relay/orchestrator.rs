//! Relay orchestrator - wires listeners to the dispatcher.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use contracts::RelayBlueprint;
use dispatcher::DispatcherBuilder;
use ingestion::ListenerManager;
use tracing::{debug, info, warn};

use super::stats::{ListenerStats, RelayStats, StatsDispatch};
use crate::error::{CliError, Result};

/// Relay configuration
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// The loaded, validated configuration
    pub blueprint: RelayBlueprint,

    /// Replace every sink client with a log stand-in
    pub dry_run: bool,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main relay orchestrator
pub struct Relay {
    config: RelayConfig,
}

impl Relay {
    pub fn new(config: RelayConfig) -> Self {
        Self { config }
    }

    /// Run until `shutdown` resolves
    ///
    /// Returns immediately when the UDP server is disabled.
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<RelayStats> {
        let start_time = Instant::now();
        let blueprint = &self.config.blueprint;

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics(port).map_err(CliError::metrics)?;
            info!("Metrics endpoint available on port {}", port);
        }

        info!(dry_run = self.config.dry_run, "Building sink clients...");
        let dispatcher = Arc::new(
            DispatcherBuilder::new(blueprint.clone())
                .dry_run(self.config.dry_run)
                .build()
                .await?,
        );

        let active_sinks = dispatcher.registry().enabled_kinds().len();
        if active_sinks == 0 {
            warn!("No sinks enabled - events will be decoded and dropped");
        }
        info!(
            active_sinks,
            timeout_ms = dispatcher.sink_timeout().as_millis() as u64,
            "Dispatcher ready"
        );

        let stats_dispatch = Arc::new(StatsDispatch::new(dispatcher.clone()));

        if !blueprint.udp.enable {
            warn!("UDP server disabled in configuration, nothing to relay");
            return Ok(RelayStats {
                duration: start_time.elapsed(),
                active_sinks,
                ..Default::default()
            });
        }

        let manager = ListenerManager::new(stats_dispatch.clone());
        let handles = manager.start_configured(&blueprint.udp).await;
        if handles.is_empty() {
            warn!("No UDP listener could be bound; only shutdown remains");
        }

        info!(listeners = handles.len(), "Relay running");
        shutdown.await;

        info!("Shutting down relay...");
        let mut listeners = Vec::with_capacity(handles.len());
        for handle in handles {
            listeners.push(ListenerStats {
                kind: handle.kind(),
                local_addr: handle.local_addr(),
                metrics: handle.metrics(),
            });
            handle.shutdown().await;
        }

        for (kind, snapshot) in dispatcher.metrics() {
            debug!(
                sink = %kind,
                attempts = snapshot.attempts,
                delivered = snapshot.delivered,
                failed = snapshot.failed,
                timed_out = snapshot.timed_out,
                "Sink counters"
            );
        }

        let stats = RelayStats {
            duration: start_time.elapsed(),
            listeners,
            active_sinks,
            delivery: stats_dispatch.summary(),
        };

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            events = stats.delivery.total_events,
            "Relay shutdown complete"
        );

        Ok(stats)
    }
}
