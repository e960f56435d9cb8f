//! Failure logging
//!
//! Every failed attempt, including ones a later retry recovers from, is
//! reported to a [`FailureLog`]. Logs are observability sinks only; nothing
//! they do feeds back into execution.

use std::panic::Location;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::TryError;

/// Record of a single failed attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptFailure {
    /// `file:line:column` where the operation was built
    pub operation: String,
    /// 1-based attempt number
    pub attempt: u32,
    /// Total attempts allowed for the operation
    pub max_attempts: u32,
    /// Rendered error
    pub error: String,
    /// When the failure was observed
    pub timestamp: DateTime<Utc>,
}

impl AttemptFailure {
    /// Capture a failure of `operation` on `attempt`
    pub fn new(
        operation: &'static Location<'static>,
        attempt: u32,
        max_attempts: u32,
        error: &TryError,
    ) -> Self {
        Self {
            operation: operation.to_string(),
            attempt,
            max_attempts,
            error: error.to_string(),
            timestamp: Utc::now(),
        }
    }

    /// Whether a retry will follow this failure
    pub fn will_retry(&self) -> bool {
        self.attempt < self.max_attempts
    }
}

/// Sink for attempt failures
pub trait FailureLog: Send + Sync {
    /// Record one failed attempt
    fn record(&self, failure: &AttemptFailure);
}

/// Emits attempt failures as `tracing` warnings
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingFailureLog;

impl FailureLog for TracingFailureLog {
    fn record(&self, failure: &AttemptFailure) {
        warn!(
            operation = %failure.operation,
            attempt = failure.attempt,
            max_attempts = failure.max_attempts,
            will_retry = failure.will_retry(),
            error = %failure.error,
            "Operation attempt failed"
        );
    }
}

/// Keeps attempt failures in memory, mostly useful in tests
#[derive(Debug, Default)]
pub struct MemoryFailureLog {
    entries: Mutex<Vec<AttemptFailure>>,
}

impl MemoryFailureLog {
    /// Empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded failures
    pub fn entries(&self) -> Vec<AttemptFailure> {
        self.entries.lock().clone()
    }

    /// Number of recorded failures
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Drop all recorded failures
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl FailureLog for MemoryFailureLog {
    fn record(&self, failure: &AttemptFailure) {
        self.entries.lock().push(failure.clone());
    }
}

/// Install a fmt subscriber filtered by `RUST_LOG` (default `info`).
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
