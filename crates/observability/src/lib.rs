//! # Observability
//!
//! Tracing initialization and Prometheus metrics for the relay.
//!
//! ## Features
//!
//! - Tracing setup (JSON / Pretty / Compact)
//! - Prometheus exporter
//! - Listener, decode and sink delivery metrics
//! - In-memory delivery aggregation for run summaries
//!
//! ## Example
//!
//! ```ignore
//! observability::init_logging(LoggingConfig::default())?;
//!
//! let report = dispatcher.dispatch(event).await;
//! observability::record_dispatch_report(&report);
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::str::FromStr;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub use crate::metrics::{
    record_datagram_received, record_decode_failure, record_dispatch_report,
    record_listener_state, record_sink_delivery, DeliveryMetricsAggregator, DeliverySummary,
    RunningStats, SinkStats, StatsSummary,
};

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Structured JSON
    Json,
    /// Human readable, multi-line
    #[default]
    Pretty,
    /// Single line
    Compact,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            other => Err(format!(
                "unknown log format '{other}' (expected json, pretty or compact)"
            )),
        }
    }
}

/// How much the relay logs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Verbosity {
    /// Warnings and errors only, RUST_LOG is ignored
    Quiet,
    #[default]
    Normal,
    Debug,
    Trace,
}

impl Verbosity {
    /// Map `-q` / repeated `-v` flags
    pub fn from_flags(quiet: bool, verbose: u8) -> Self {
        match (quiet, verbose) {
            (true, _) => Self::Quiet,
            (false, 0) => Self::Normal,
            (false, 1) => Self::Debug,
            (false, _) => Self::Trace,
        }
    }

    pub fn directive(self) -> &'static str {
        match self {
            Self::Quiet => "warn",
            Self::Normal => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }

    fn filter(self) -> EnvFilter {
        match self {
            Self::Quiet => EnvFilter::new(self.directive()),
            _ => EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(self.directive())),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub verbosity: Verbosity,
}

/// Install the global tracing subscriber
///
/// RUST_LOG overrides the verbosity unless it is `Quiet`.
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let fmt_layer = match config.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Compact => fmt::layer().compact().boxed(),
    };

    tracing_subscriber::registry()
        .with(config.verbosity.filter())
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    tracing::debug!(
        log_format = ?config.format,
        verbosity = ?config.verbosity,
        "Logging initialized"
    );

    Ok(())
}

/// Install the Prometheus recorder with an HTTP listener on `port`
pub fn init_metrics(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .context("Failed to install Prometheus recorder")?;

    tracing::info!(port = port, "Prometheus metrics endpoint initialized");
    Ok(())
}
