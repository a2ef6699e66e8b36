//! Per-listener counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Listener metrics
#[derive(Debug, Default)]
pub struct ListenerMetrics {
    /// Datagrams read from the socket
    pub datagrams_received: AtomicU64,

    /// Datagrams dropped by the decoder
    pub decode_failures: AtomicU64,

    /// Decoded events handed to the dispatcher
    pub events_dispatched: AtomicU64,

    /// Receive errors on the bound socket
    pub socket_errors: AtomicU64,
}

impl ListenerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_received(&self) {
        self.datagrams_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decode_failure(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dispatched(&self) {
        self.events_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_socket_error(&self) {
        self.socket_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            datagrams_received: self.datagrams_received.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            events_dispatched: self.events_dispatched.load(Ordering::Relaxed),
            socket_errors: self.socket_errors.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub datagrams_received: u64,
    pub decode_failures: u64,
    pub events_dispatched: u64,
    pub socket_errors: u64,
}

impl std::ops::Add for MetricsSnapshot {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            datagrams_received: self.datagrams_received + rhs.datagrams_received,
            decode_failures: self.decode_failures + rhs.decode_failures,
            events_dispatched: self.events_dispatched + rhs.events_dispatched,
            socket_errors: self.socket_errors + rhs.socket_errors,
        }
    }
}
