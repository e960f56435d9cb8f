//! Batch executor
//!
//! Runs every operation of a batch under one retry and timeout policy:
//! - Sequential mode walks the list in order and stops at the first fatal
//!   handler result
//! - Parallel mode spawns one task per operation and joins them all before
//!   any outcome is inspected
//! - Success values are aggregated, failures go to the error handler

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::batch::types::{BatchResult, BatchStats, ExecutionConfig};
use crate::engine::{
    Backoff, ErrorRouter, IntoErrorHandler, RetryingInvoker, RouteDecision, TimeoutGuard,
};
use crate::logging::{FailureLog, TracingFailureLog};
use crate::operation::Operation;
use crate::outcome::Outcome;
use crate::TryError;

/// Executes batches of operations ("Try")
pub struct BatchExecutor {
    config: ExecutionConfig,
    failure_log: Arc<dyn FailureLog>,
}

impl BatchExecutor {
    /// Create a new batch executor with default settings
    pub fn new() -> Self {
        Self {
            config: ExecutionConfig::default(),
            failure_log: Arc::new(TracingFailureLog),
        }
    }

    /// Replace the whole configuration
    pub fn with_config(mut self, config: ExecutionConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the per-operation timeout (zero disables it)
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.set_timeout(timeout);
        self
    }

    /// Set the number of extra attempts after a failure
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.set_retries(retries);
        self
    }

    /// Run operations concurrently
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.set_parallel(parallel);
        self
    }

    /// Set the delay policy between attempts
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.set_backoff(backoff);
        self
    }

    /// Send attempt failures to `log` instead of `tracing`
    pub fn with_failure_log(mut self, log: Arc<dyn FailureLog>) -> Self {
        self.failure_log = log;
        self
    }

    /// Per-operation deadline for later runs; zero means unbounded
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.config.timeout = (!timeout.is_zero()).then_some(timeout);
    }

    /// Extra attempts for later runs
    pub fn set_retries(&mut self, retries: u32) {
        self.config.retries = retries;
    }

    /// Parallel mode for later runs
    pub fn set_parallel(&mut self, parallel: bool) {
        self.config.parallel = parallel;
    }

    /// Delay policy for later runs
    pub fn set_backoff(&mut self, backoff: Backoff) {
        self.config.backoff = backoff;
    }

    /// Current configuration
    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Execute a batch.
    ///
    /// The handler is validated and the batch checked for emptiness before
    /// anything runs. Each operation is retried inside its timeout window;
    /// the handler sees every operation that still failed. A handler that
    /// returns an error stops the batch and that error becomes the outcome,
    /// with no values. In parallel mode already-started operations are not
    /// cancelled; the fold simply stops reading their outcomes.
    #[instrument(skip_all, fields(batch_id = %Uuid::new_v4(), operation_count = operations.len()))]
    pub async fn execute<H>(&self, handler: H, operations: Vec<Operation>) -> BatchResult
    where
        H: IntoErrorHandler,
    {
        let started = Instant::now();

        let router = match ErrorRouter::bind(handler) {
            Ok(router) => router,
            Err(e) => return BatchResult::failed(e, BatchStats::default()),
        };

        if operations.is_empty() {
            info!("No operations to execute in batch");
            return BatchResult::failed(TryError::NoOperations, BatchStats::default());
        }

        // Snapshot so setters only affect later runs
        let config = self.config.clone();
        let invoker = RetryingInvoker::new(
            config.retries,
            config.backoff.clone(),
            self.failure_log.clone(),
        );
        let guard = TimeoutGuard::new(config.effective_timeout());

        info!(
            retries = config.retries,
            timeout = ?guard.limit(),
            parallel = config.parallel,
            "Starting batch execution"
        );

        let mut fold = Fold::new(router, operations.len());

        if config.parallel {
            let tasks: Vec<_> = operations
                .into_iter()
                .map(|operation| {
                    let invoker = invoker.clone();
                    tokio::spawn(async move { run_unit(invoker, guard, operation).await })
                })
                .collect();

            // Barrier: nothing is folded until every task has finished
            let joined = join_all(tasks).await;
            debug!("All operations joined");

            for result in joined {
                let outcome = result.unwrap_or_else(|join_error| {
                    error!(error = %join_error, "Operation task failed to join");
                    Outcome::Failure(TryError::Panicked(join_error.to_string()))
                });
                if let Some(fatal) = fold.absorb(outcome) {
                    return fold.abort(fatal, started);
                }
            }
        } else {
            for operation in operations {
                let outcome = run_unit(invoker.clone(), guard, operation).await;
                if let Some(fatal) = fold.absorb(outcome) {
                    return fold.abort(fatal, started);
                }
            }
        }

        fold.finish(started)
    }
}

impl Default for BatchExecutor {
    fn default() -> Self {
        Self::new()
    }
}

/// One operation's unit of work: retries inside the timeout window
async fn run_unit(invoker: RetryingInvoker, guard: TimeoutGuard, operation: Operation) -> Outcome<Value> {
    guard
        .with_timeout(move || async move { invoker.retry(&operation).await })
        .await
}

/// Single-threaded fold over completed outcomes
struct Fold {
    router: ErrorRouter,
    values: Vec<Value>,
    stats: BatchStats,
}

impl Fold {
    fn new(router: ErrorRouter, operations: usize) -> Self {
        Self {
            router,
            values: Vec::new(),
            stats: BatchStats {
                operations,
                ..Default::default()
            },
        }
    }

    /// Returns the fatal error when the batch must stop
    fn absorb(&mut self, outcome: Outcome<Value>) -> Option<TryError> {
        match outcome {
            Outcome::Success(values) => {
                self.stats.succeeded += 1;
                self.values.extend(values);
                None
            }
            Outcome::Failure(error) => {
                if error.is_timeout() {
                    self.stats.timed_out += 1;
                }
                match self.router.route(error) {
                    RouteDecision::Handled => {
                        self.stats.handled += 1;
                        None
                    }
                    RouteDecision::Fatal(fatal) => Some(fatal),
                }
            }
        }
    }

    fn abort(mut self, fatal: TryError, started: Instant) -> BatchResult {
        self.stats.duration = started.elapsed();
        error!(
            error = %fatal,
            succeeded = self.stats.succeeded,
            handled = self.stats.handled,
            batch_duration_ms = self.stats.duration.as_millis() as u64,
            "Batch aborted by error handler"
        );
        BatchResult::failed(fatal, self.stats)
    }

    fn finish(mut self, started: Instant) -> BatchResult {
        self.stats.duration = started.elapsed();
        info!(
            operations = self.stats.operations,
            succeeded = self.stats.succeeded,
            handled = self.stats.handled,
            timed_out = self.stats.timed_out,
            values = self.values.len(),
            batch_duration_ms = self.stats.duration.as_millis() as u64,
            "Batch execution completed"
        );
        if self.stats.handled > 0 && self.stats.succeeded == 0 {
            warn!(handled = self.stats.handled, "Every operation in the batch failed");
        }
        BatchResult::completed(self.values, self.stats)
    }
}
