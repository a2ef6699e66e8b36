//! Relay run statistics.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use contracts::{DispatchReport, Event, EventDispatch, ListenerKind};
use ingestion::MetricsSnapshot;
use observability::{DeliveryMetricsAggregator, DeliverySummary};

/// Dispatch decorator that aggregates every report for the run summary
pub struct StatsDispatch {
    inner: Arc<dyn EventDispatch>,
    delivery: Mutex<DeliveryMetricsAggregator>,
}

impl StatsDispatch {
    pub fn new(inner: Arc<dyn EventDispatch>) -> Self {
        Self {
            inner,
            delivery: Mutex::new(DeliveryMetricsAggregator::new()),
        }
    }

    pub fn summary(&self) -> DeliverySummary {
        self.delivery
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .summary()
    }
}

#[async_trait]
impl EventDispatch for StatsDispatch {
    async fn dispatch(&self, event: Event) -> DispatchReport {
        let report = self.inner.dispatch(event).await;
        self.delivery
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .update(&report);
        report
    }
}

/// Per-listener totals at shutdown
#[derive(Debug, Clone)]
pub struct ListenerStats {
    pub kind: ListenerKind,
    pub local_addr: SocketAddr,
    pub metrics: MetricsSnapshot,
}

/// Statistics from a relay run
#[derive(Debug, Clone, Default)]
pub struct RelayStats {
    /// Wall time between start and shutdown
    pub duration: Duration,

    /// Listeners that were bound
    pub listeners: Vec<ListenerStats>,

    /// Number of sink kinds with a client
    pub active_sinks: usize,

    /// Aggregated dispatch outcomes
    pub delivery: DeliverySummary,
}

impl RelayStats {
    /// Datagrams received over all listeners
    pub fn datagrams_received(&self) -> u64 {
        self.totals().datagrams_received
    }

    pub fn totals(&self) -> MetricsSnapshot {
        self.listeners
            .iter()
            .fold(MetricsSnapshot::default(), |acc, l| acc + l.metrics)
    }

    /// Dispatched events per second
    pub fn events_per_sec(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.delivery.total_events as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                      Relay Statistics                        ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        let totals = self.totals();
        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Datagrams received: {}", totals.datagrams_received);
        println!("   ├─ Decode failures: {}", totals.decode_failures);
        println!("   ├─ Events/s: {:.2}", self.events_per_sec());
        println!("   └─ Active sinks: {}", self.active_sinks);

        if !self.listeners.is_empty() {
            println!("\n📡 Listeners");
            for (i, l) in self.listeners.iter().enumerate() {
                let prefix = if i == self.listeners.len() - 1 { "└─" } else { "├─" };
                println!(
                    "   {} {} @ {}: received={} malformed={} dispatched={} socket_errors={}",
                    prefix,
                    l.kind,
                    l.local_addr,
                    l.metrics.datagrams_received,
                    l.metrics.decode_failures,
                    l.metrics.events_dispatched,
                    l.metrics.socket_errors
                );
            }
        }

        println!("\n{}", self.delivery);
    }
}
