//! DispatchReport - Dispatcher output
//!
//! One record per attempted sink. A report never carries an error for the
//! dispatch as a whole, only for individual attempts.

use std::time::Duration;

use crate::{EventCategory, SinkDeliveryError, SinkKind};

/// Outcome of one sink invocation
#[derive(Debug, Clone)]
pub struct SinkAttempt {
    pub kind: SinkKind,
    pub target: String,
    pub outcome: Result<(), SinkDeliveryError>,
    pub elapsed: Duration,
}

impl SinkAttempt {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Per-sink results of dispatching one event
#[derive(Debug, Clone)]
pub struct DispatchReport {
    pub category: EventCategory,
    pub attempts: Vec<SinkAttempt>,
}

impl DispatchReport {
    pub fn new(category: EventCategory) -> Self {
        Self {
            category,
            attempts: Vec::new(),
        }
    }

    pub fn push(&mut self, attempt: SinkAttempt) {
        self.attempts.push(attempt);
    }

    /// No sink applied to the event
    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }

    pub fn success_count(&self) -> usize {
        self.attempts.iter().filter(|a| a.is_success()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.attempts.len() - self.success_count()
    }

    /// Attempt for a given sink kind, if one was made
    pub fn attempt(&self, kind: SinkKind) -> Option<&SinkAttempt> {
        self.attempts.iter().find(|a| a.kind == kind)
    }

    pub fn failures(&self) -> impl Iterator<Item = &SinkAttempt> {
        self.attempts.iter().filter(|a| !a.is_success())
    }
}
