//! Per-operation execution engine
//!
//! The batch executor composes these pieces for every operation: a
//! [`RetryingInvoker`] runs inside a [`TimeoutGuard`], and failures that
//! survive both are handed to the [`ErrorRouter`].

/// Retry loop and backoff
pub mod retry;
/// Error handlers and routing
pub mod router;
/// Per-operation deadline
pub mod timeout;

pub use retry::{Backoff, RetryingInvoker};
pub use router::{ErrorHandler, ErrorRouter, HandlerError, IntoErrorHandler, RouteDecision};
pub use timeout::TimeoutGuard;
