//! Bounded retry loop with a fixed (or configured) delay between attempts

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::logging::{AttemptFailure, FailureLog};
use crate::operation::Operation;
use crate::outcome::Outcome;

/// Delay policy between attempts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Backoff {
    /// Same delay after every failed attempt
    Fixed(Duration),
    /// `base + increment * (attempt - 1)`
    Linear {
        /// Delay after the first failure
        base: Duration,
        /// Added for each later failure
        increment: Duration,
    },
    /// `base * multiplier^(attempt - 1)`, capped at `max`
    Exponential {
        /// Delay after the first failure
        base: Duration,
        /// Growth factor per failure
        multiplier: u32,
        /// Upper bound on any single delay
        max: Duration,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff::Fixed(Duration::from_secs(1))
    }
}

impl Backoff {
    /// Delay to wait after failed attempt number `attempt` (1-based)
    pub fn delay(&self, attempt: u32) -> Duration {
        let step = attempt.saturating_sub(1);
        match self {
            Backoff::Fixed(delay) => *delay,
            Backoff::Linear { base, increment } => {
                base.saturating_add(increment.saturating_mul(step))
            }
            Backoff::Exponential { base, multiplier, max } => multiplier
                .checked_pow(step)
                .and_then(|factor| base.checked_mul(factor))
                .map_or(*max, |delay| delay.min(*max)),
        }
    }
}

/// Invokes an operation up to `max_extra_attempts + 1` times
#[derive(Clone)]
pub struct RetryingInvoker {
    max_extra_attempts: u32,
    backoff: Backoff,
    log: Arc<dyn FailureLog>,
}

impl RetryingInvoker {
    /// Invoker allowing `max_extra_attempts` retries, reporting failures to `log`
    pub fn new(max_extra_attempts: u32, backoff: Backoff, log: Arc<dyn FailureLog>) -> Self {
        Self {
            max_extra_attempts,
            backoff,
            log,
        }
    }

    /// Total attempts this invoker allows
    pub fn max_attempts(&self) -> u32 {
        self.max_extra_attempts.saturating_add(1)
    }

    /// Run `operation` until it succeeds or attempts run out.
    ///
    /// Returns the first successful outcome, or the outcome of the last
    /// attempt when every attempt failed.
    #[instrument(skip(self, operation), fields(location = %operation.location()))]
    pub async fn retry(&self, operation: &Operation) -> Outcome<Value> {
        let max_attempts = self.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;
            let outcome = operation.invoke().await;

            if outcome.is_success() {
                if attempt > 1 {
                    debug!(attempt, "Operation succeeded after retrying");
                }
                return outcome;
            }

            if let Some(error) = outcome.error() {
                self.log.record(&AttemptFailure::new(
                    operation.location(),
                    attempt,
                    max_attempts,
                    error,
                ));
            }

            if attempt >= max_attempts {
                return outcome;
            }

            let delay = self.backoff.delay(attempt);
            debug!(attempt, ?delay, "Retrying operation");
            tokio::time::sleep(delay).await;
        }
    }
}
