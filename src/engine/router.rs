//! Error handler binding and routing

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::TryError;

/// Handler shape problems detected before a batch runs
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// The handler is not invocable
    #[error("provided handler is not a function")]
    NotAFunction,

    /// The handler does not take exactly one error
    #[error("the error handler must take an error as an arg")]
    InvalidParameters,

    /// The handler returns something other than nothing or one error
    #[error("the error handler must return at most one error")]
    InvalidReturns,
}

type HandlerFn = dyn Fn(TryError) -> Option<anyhow::Error> + Send + Sync;

/// Receives each operation failure; returning `Some` aborts the batch
#[derive(Clone)]
pub struct ErrorHandler {
    handle: Arc<HandlerFn>,
}

impl ErrorHandler {
    /// Handler whose `Some(error)` return is fatal
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(TryError) -> Option<anyhow::Error> + Send + Sync + 'static,
    {
        Self {
            handle: Arc::new(handler),
        }
    }

    /// Handler that observes failures and never aborts
    pub fn ignore<F>(handler: F) -> Self
    where
        F: Fn(TryError) + Send + Sync + 'static,
    {
        Self::new(move |error| {
            handler(error);
            None
        })
    }

    /// Handler reporting fatal conditions through `Err`
    pub fn from_result<F, E>(handler: F) -> Self
    where
        F: Fn(TryError) -> Result<(), E> + Send + Sync + 'static,
        E: Into<anyhow::Error>,
    {
        Self::new(move |error| handler(error).err().map(Into::into))
    }

    /// Handler that treats every failure as fatal
    pub fn fail_fast() -> Self {
        Self::new(|error| Some(anyhow::Error::new(error)))
    }

    /// Invoke the handler once
    pub fn call(&self, error: TryError) -> Option<anyhow::Error> {
        (self.handle)(error)
    }
}

impl fmt::Debug for ErrorHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorHandler").finish_non_exhaustive()
    }
}

/// Anything that can be validated into an [`ErrorHandler`]
pub trait IntoErrorHandler {
    /// Validate and bind
    fn into_error_handler(self) -> Result<ErrorHandler, HandlerError>;
}

impl IntoErrorHandler for ErrorHandler {
    fn into_error_handler(self) -> Result<ErrorHandler, HandlerError> {
        Ok(self)
    }
}

impl<F> IntoErrorHandler for F
where
    F: Fn(TryError) -> Option<anyhow::Error> + Send + Sync + 'static,
{
    fn into_error_handler(self) -> Result<ErrorHandler, HandlerError> {
        Ok(ErrorHandler::new(self))
    }
}

/// What the batch should do after a failure was routed
#[derive(Debug)]
pub enum RouteDecision {
    /// The handler accepted the failure
    Handled,
    /// The handler returned an error; stop the batch with it
    Fatal(TryError),
}

impl RouteDecision {
    /// Whether the batch must stop
    pub fn is_fatal(&self) -> bool {
        matches!(self, RouteDecision::Fatal(_))
    }
}

/// Routes operation failures to the bound handler
#[derive(Debug, Clone)]
pub struct ErrorRouter {
    handler: ErrorHandler,
}

impl ErrorRouter {
    /// Validate `handler` and bind it for one batch
    pub fn bind<H: IntoErrorHandler>(handler: H) -> crate::Result<Self> {
        let handler = handler.into_error_handler().map_err(|e| {
            warn!(error = %e, "Rejected error handler");
            TryError::InvalidHandler(e)
        })?;
        Ok(Self { handler })
    }

    /// Hand `error` to the handler exactly once
    pub fn route(&self, error: TryError) -> RouteDecision {
        debug!(error = %error, "Routing operation failure");
        match self.handler.call(error) {
            Some(fatal) => {
                warn!(error = %fatal, "Error handler reported a fatal error");
                RouteDecision::Fatal(TryError::Fatal(fatal))
            }
            None => RouteDecision::Handled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_handled_failure() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let router = ErrorRouter::bind(ErrorHandler::ignore(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }))
        .unwrap();

        let decision = router.route(TryError::NoFunction);
        assert!(!decision.is_fatal());
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_secondary_error_is_fatal() {
        let router = ErrorRouter::bind(ErrorHandler::from_result(|error: TryError| {
            Err(anyhow::anyhow!("cannot continue after: {error}"))
        }))
        .unwrap();

        match router.route(TryError::NoFunction) {
            RouteDecision::Fatal(error) => {
                assert_eq!(error.to_string(), "cannot continue after: no function provided")
            }
            RouteDecision::Handled => panic!("expected fatal decision"),
        }
    }

    #[test]
    fn test_closure_binds() {
        let router = ErrorRouter::bind(|_: TryError| -> Option<anyhow::Error> { None }).unwrap();
        assert!(!router.route(TryError::NoOperations).is_fatal());
    }

    #[test]
    fn test_fail_fast_keeps_original_message() {
        let router = ErrorRouter::bind(ErrorHandler::fail_fast()).unwrap();
        match router.route(TryError::TimedOut { after: std::time::Duration::from_secs(1) }) {
            RouteDecision::Fatal(error) => assert_eq!(error.to_string(), "operation timed out"),
            RouteDecision::Handled => panic!("expected fatal decision"),
        }
    }
}
