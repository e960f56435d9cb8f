use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::Backoff;
use crate::outcome::Outcome;
use crate::TryError;

/// Batch execution configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Per-operation deadline covering all of its attempts; `None` or zero is unbounded
    pub timeout: Option<Duration>,
    /// Extra attempts after the first failure
    pub retries: u32,
    /// Run all operations concurrently
    pub parallel: bool,
    /// Delay policy between attempts
    pub backoff: Backoff,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            retries: 0,
            parallel: false,
            backoff: Backoff::default(),
        }
    }
}

impl ExecutionConfig {
    /// Parse a configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Timeout with zero normalized to `None`
    pub fn effective_timeout(&self) -> Option<Duration> {
        self.timeout.filter(|timeout| !timeout.is_zero())
    }
}

/// Batch execution statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchStats {
    /// Operations submitted
    pub operations: usize,
    /// Operations whose final attempt succeeded
    pub succeeded: usize,
    /// Failed operations the handler accepted
    pub handled: usize,
    /// Operations cut off by the deadline
    pub timed_out: usize,
    /// Wall-clock time of the whole batch
    pub duration: Duration,
}

/// Result of one batch run
#[derive(Debug)]
pub struct BatchResult {
    /// Aggregated success values; empty when the batch failed
    pub values: Vec<Value>,
    /// Success, or the fatal/pre-flight error that stopped the batch
    pub outcome: Outcome<()>,
    /// Counters for this run
    pub stats: BatchStats,
}

impl BatchResult {
    pub(crate) fn completed(values: Vec<Value>, stats: BatchStats) -> Self {
        Self {
            values,
            outcome: Outcome::done(),
            stats,
        }
    }

    pub(crate) fn failed(error: TryError, stats: BatchStats) -> Self {
        Self {
            values: Vec::new(),
            outcome: Outcome::Failure(error),
            stats,
        }
    }

    /// Whether the batch completed
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }

    /// Whether a pre-flight or fatal error stopped the batch
    pub fn is_failure(&self) -> bool {
        self.outcome.is_failure()
    }

    /// The error that stopped the batch, if any
    pub fn error(&self) -> Option<&TryError> {
        self.outcome.error()
    }

    /// Aggregated values, or the batch error
    pub fn into_result(self) -> crate::Result<Vec<Value>> {
        match self.outcome {
            Outcome::Success(_) => Ok(self.values),
            Outcome::Failure(error) => Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_config_defaults_from_partial_json() {
        let config = ExecutionConfig::from_json(r#"{"retries": 2, "parallel": true}"#).unwrap();
        assert_eq!(
            config,
            ExecutionConfig {
                retries: 2,
                parallel: true,
                ..Default::default()
            }
        );
        assert!(config.effective_timeout().is_none());
    }

    #[test]
    fn test_config_json_with_timeout() {
        let config =
            ExecutionConfig::from_json(r#"{"timeout": {"secs": 0, "nanos": 0}}"#).unwrap();
        assert_eq!(config.timeout, Some(Duration::ZERO));
        assert!(config.effective_timeout().is_none());
    }

    #[test]
    fn test_invalid_config_json() {
        let error = ExecutionConfig::from_json(r#"{"retries": -1}"#).unwrap_err();
        assert!(matches!(error, TryError::Serialization(_)));
    }

    #[test]
    fn test_failed_result_has_no_values() {
        let result = BatchResult::failed(TryError::NoOperations, BatchStats::default());
        assert!(result.is_failure());
        assert!(result.values.is_empty());
        assert!(matches!(result.into_result(), Err(TryError::NoOperations)));
    }
}
