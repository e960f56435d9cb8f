//! # trybatch
//!
//! Resilient execution of batches of independently fallible operations.
//!
//! ## Overview
//!
//! Every operation in a batch is attempted under the same retry and timeout
//! policy. Successful values are aggregated, failures are routed through a
//! single error handler, and a handler that returns an error of its own aborts
//! the whole batch.
//!
//! ## Quick Start
//!
//! ```rust
//! use trybatch::batch::BatchExecutor;
//! use trybatch::operation::Operation;
//! use trybatch::{ErrorHandler, TryError};
//!
//! # async fn example() -> Result<(), TryError> {
//! let executor = BatchExecutor::new().with_retries(2);
//!
//! let operations = vec![
//!     Operation::from_fn(|| Ok::<_, std::io::Error>(1)),
//!     Operation::from_fn(|| Ok::<_, std::io::Error>(("two", 3))),
//! ];
//!
//! // Handled: report and keep going
//! let handler = ErrorHandler::ignore(|err| eprintln!("{err}"));
//! let result = executor.execute(handler, operations).await;
//!
//! let values = result.into_result()?;
//! assert_eq!(values.len(), 3);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`outcome`]: the success/failure sum type of one attempt
//! - [`operation`]: zero-argument fallible operations
//! - [`engine`]: retry loop, timeout guard and error routing
//! - [`batch`]: the batch executor and its configuration
//! - [`adapter`]: runtime-shaped callables and handler validation
//! - [`logging`]: failure log sinks and subscriber setup

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

use std::time::Duration;

use thiserror::Error;

pub use engine::router::HandlerError;

/// Result type for trybatch operations
pub type Result<T> = std::result::Result<T, TryError>;

/// Main error type for trybatch
#[derive(Error, Debug)]
pub enum TryError {
    /// The batch was empty
    #[error("no operations provided")]
    NoOperations,

    /// The error handler failed shape validation
    #[error("invalid error handler")]
    InvalidHandler(#[source] HandlerError),

    /// The operation did not finish before the deadline
    #[error("operation timed out")]
    TimedOut {
        /// Deadline that elapsed
        after: Duration,
    },

    /// The operation panicked, or its task was cancelled by the runtime
    #[error("operation panicked: {0}")]
    Panicked(String),

    /// The adapted value is not invocable
    #[error("no function provided")]
    NoFunction,

    /// Positional arguments do not match the declared parameters
    #[error("argument count does not match function's parameter count")]
    ArgumentCount {
        /// Declared parameter count
        expected: usize,
        /// Supplied argument count
        actual: usize,
    },

    /// A dynamic function returned a different number of slots than declared
    #[error("return count does not match function's declared returns")]
    ReturnCount {
        /// Declared return count
        expected: usize,
        /// Returned slot count
        actual: usize,
    },

    /// A returned value could not be converted to JSON
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Error produced by the operation itself
    #[error(transparent)]
    Operation(#[from] anyhow::Error),

    /// Secondary error returned by the error handler
    #[error(transparent)]
    Fatal(anyhow::Error),
}

impl TryError {
    /// Wrap any error produced by an operation
    pub fn operation<E>(error: E) -> Self
    where
        E: Into<anyhow::Error>,
    {
        TryError::Operation(error.into())
    }

    /// Whether this is a pre-flight error (nothing was executed)
    pub fn is_preflight(&self) -> bool {
        matches!(self, TryError::NoOperations | TryError::InvalidHandler(_))
    }

    /// Whether the error came from the timeout guard
    pub fn is_timeout(&self) -> bool {
        matches!(self, TryError::TimedOut { .. })
    }
}

/// Success/failure sum type
pub mod outcome;

/// Fallible zero-argument operations
pub mod operation;

/// Retry, timeout and routing engine
pub mod engine;

/// Batch execution
pub mod batch;

/// Runtime-shaped callables
pub mod adapter;

/// Failure logging
pub mod logging;

pub use batch::{BatchExecutor, BatchResult, BatchStats, ExecutionConfig};
pub use engine::router::{ErrorHandler, IntoErrorHandler};
pub use operation::Operation;
pub use outcome::Outcome;
