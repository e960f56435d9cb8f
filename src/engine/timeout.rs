//! Deadline race for a single operation

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::outcome::Outcome;
use crate::TryError;

/// Bounds how long one operation (including all its retries) may run
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeoutGuard {
    limit: Option<Duration>,
}

impl TimeoutGuard {
    /// `None` or a zero duration disables the guard
    pub fn new(limit: Option<Duration>) -> Self {
        Self {
            limit: limit.filter(|limit| !limit.is_zero()),
        }
    }

    /// Active deadline, `None` when unbounded
    pub fn limit(&self) -> Option<Duration> {
        self.limit
    }

    /// Run `thunk` against the deadline.
    ///
    /// Without a limit the thunk is awaited in place. With one, it is spawned
    /// onto the runtime and raced against a timer. When the timer wins the
    /// task is detached, not aborted: it keeps running but its result is
    /// never read.
    pub async fn with_timeout<F, Fut, T>(&self, thunk: F) -> Outcome<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Outcome<T>> + Send + 'static,
        T: Send + 'static,
    {
        let Some(limit) = self.limit else {
            return thunk().await;
        };

        let handle = tokio::spawn(thunk());
        match tokio::time::timeout(limit, handle).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(join_error)) => Outcome::Failure(TryError::Panicked(join_error.to_string())),
            Err(_) => {
                warn!(timeout_ms = limit.as_millis() as u64, "Operation timed out");
                Outcome::Failure(TryError::TimedOut { after: limit })
            }
        }
    }
}
