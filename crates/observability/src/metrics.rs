//! Relay metrics
//!
//! Prometheus counters/histograms for listeners and sink delivery, plus an
//! in-memory aggregator used for the end-of-run summary.

use std::collections::BTreeMap;
use std::time::Duration;

use contracts::{DispatchReport, ListenerKind, ListenerState, SinkKind};
use metrics::{counter, gauge, histogram};

/// Record one datagram read from a listener socket
pub fn record_datagram_received(listener: ListenerKind, bytes: usize) {
    counter!(
        "butler_relay_datagrams_received_total",
        "listener" => listener.as_str()
    )
    .increment(1);
    histogram!(
        "butler_relay_datagram_bytes",
        "listener" => listener.as_str()
    )
    .record(bytes as f64);
}

/// Record a datagram that could not be decoded
pub fn record_decode_failure(listener: ListenerKind) {
    counter!(
        "butler_relay_decode_failures_total",
        "listener" => listener.as_str()
    )
    .increment(1);
}

/// Record a listener lifecycle transition
///
/// The gauge holds 1 while the listener is bound, 0 otherwise.
pub fn record_listener_state(listener: ListenerKind, state: ListenerState) {
    let up = if state == ListenerState::Bound { 1.0 } else { 0.0 };
    gauge!("butler_relay_listener_up", "listener" => listener.as_str()).set(up);
    counter!(
        "butler_relay_listener_transitions_total",
        "listener" => listener.as_str(),
        "state" => state.to_string()
    )
    .increment(1);
}

/// Record a single sink invocation
pub fn record_sink_delivery(kind: SinkKind, success: bool, timed_out: bool, elapsed: Duration) {
    let status = match (success, timed_out) {
        (true, _) => "success",
        (false, true) => "timeout",
        (false, false) => "failure",
    };
    counter!(
        "butler_relay_sink_deliveries_total",
        "sink" => kind.as_str(),
        "status" => status
    )
    .increment(1);
    histogram!("butler_relay_sink_latency_ms", "sink" => kind.as_str())
        .record(elapsed.as_secs_f64() * 1000.0);
}

/// Record every attempt of a finished dispatch
pub fn record_dispatch_report(report: &DispatchReport) {
    counter!(
        "butler_relay_events_dispatched_total",
        "category" => report.category.as_str()
    )
    .increment(1);

    if report.is_empty() {
        counter!(
            "butler_relay_events_unrouted_total",
            "category" => report.category.as_str()
        )
        .increment(1);
    }

    for attempt in &report.attempts {
        let timed_out = matches!(&attempt.outcome, Err(e) if e.is_timeout());
        record_sink_delivery(attempt.kind, attempt.is_success(), timed_out, attempt.elapsed);
    }
}

/// Per-sink delivery counters
#[derive(Debug, Clone, Default)]
pub struct SinkStats {
    pub delivered: u64,
    pub failed: u64,
    pub timed_out: u64,
    pub latency_ms: RunningStats,
}

/// Aggregates dispatch reports in memory
#[derive(Debug, Clone, Default)]
pub struct DeliveryMetricsAggregator {
    pub total_events: u64,
    pub unrouted_events: u64,
    pub events_by_category: BTreeMap<&'static str, u64>,
    pub sinks: BTreeMap<SinkKind, SinkStats>,
}

impl DeliveryMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, report: &DispatchReport) {
        self.total_events += 1;
        *self
            .events_by_category
            .entry(report.category.as_str())
            .or_insert(0) += 1;

        if report.is_empty() {
            self.unrouted_events += 1;
        }

        for attempt in &report.attempts {
            let stats = self.sinks.entry(attempt.kind).or_default();
            match &attempt.outcome {
                Ok(()) => stats.delivered += 1,
                Err(e) if e.is_timeout() => {
                    stats.failed += 1;
                    stats.timed_out += 1;
                }
                Err(_) => stats.failed += 1,
            }
            stats
                .latency_ms
                .push(attempt.elapsed.as_secs_f64() * 1000.0);
        }
    }

    pub fn summary(&self) -> DeliverySummary {
        DeliverySummary {
            total_events: self.total_events,
            unrouted_events: self.unrouted_events,
            events_by_category: self.events_by_category.clone(),
            sinks: self
                .sinks
                .iter()
                .map(|(kind, s)| {
                    (
                        *kind,
                        SinkSummary {
                            delivered: s.delivered,
                            failed: s.failed,
                            timed_out: s.timed_out,
                            latency_ms: StatsSummary::from(&s.latency_ms),
                        },
                    )
                })
                .collect(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Snapshot of one sink's delivery counters
#[derive(Debug, Clone, Default)]
pub struct SinkSummary {
    pub delivered: u64,
    pub failed: u64,
    pub timed_out: u64,
    pub latency_ms: StatsSummary,
}

impl SinkSummary {
    /// Failure percentage over all attempts
    pub fn failure_rate(&self) -> f64 {
        let total = self.delivered + self.failed;
        if total == 0 {
            0.0
        } else {
            self.failed as f64 / total as f64 * 100.0
        }
    }
}

/// Aggregated delivery summary
#[derive(Debug, Clone, Default)]
pub struct DeliverySummary {
    pub total_events: u64,
    pub unrouted_events: u64,
    pub events_by_category: BTreeMap<&'static str, u64>,
    pub sinks: BTreeMap<SinkKind, SinkSummary>,
}

impl std::fmt::Display for DeliverySummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Delivery Summary ===")?;
        writeln!(f, "Events dispatched: {}", self.total_events)?;
        writeln!(f, "Events without a route: {}", self.unrouted_events)?;

        for (category, count) in &self.events_by_category {
            writeln!(f, "  {category}: {count}")?;
        }

        if !self.sinks.is_empty() {
            writeln!(f, "Sinks:")?;
            for (kind, s) in &self.sinks {
                writeln!(
                    f,
                    "  {kind}: delivered={} failed={} ({:.2}%) timeouts={} latency_ms: {}",
                    s.delivered,
                    s.failed,
                    s.failure_rate(),
                    s.timed_out,
                    s.latency_ms
                )?;
            }
        }

        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
