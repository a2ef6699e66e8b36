//! Per-sink delivery counters

use std::sync::atomic::{AtomicU64, Ordering};

use contracts::SinkAttempt;

/// Counters for a single sink kind
#[derive(Debug, Default)]
pub struct SinkMetrics {
    attempts: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
    timed_out: AtomicU64,
}

impl SinkMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one finished attempt
    pub fn record(&self, attempt: &SinkAttempt) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        match &attempt.outcome {
            Ok(()) => {
                self.delivered.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                if e.is_timeout() {
                    self.timed_out.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    }

    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn timed_out(&self) -> u64 {
        self.timed_out.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            attempts: self.attempts(),
            delivered: self.delivered(),
            failed: self.failed(),
            timed_out: self.timed_out(),
        }
    }
}

/// Snapshot of sink metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub attempts: u64,
    pub delivered: u64,
    pub failed: u64,
    pub timed_out: u64,
}
