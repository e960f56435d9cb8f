//! Zero-argument fallible operations
//!
//! An [`Operation`] is the unit the batch executor schedules. It can be built
//! from an async closure, a plain closure, or a blocking closure that is moved
//! onto tokio's blocking pool. Whatever the closure returns on success is
//! flattened into an ordered list of JSON values through [`IntoValues`].

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe, Location};
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Serialize;
use serde_json::Value;

use crate::outcome::Outcome;
use crate::TryError;

/// Future produced by one invocation of an operation
pub type OperationFuture = BoxFuture<'static, Outcome<Value>>;

type Invoke = Arc<dyn Fn() -> OperationFuture + Send + Sync>;

/// A fallible unit of work invoked with no arguments
#[derive(Clone)]
pub struct Operation {
    invoke: Invoke,
    location: &'static Location<'static>,
}

impl Operation {
    /// Build an operation from an async closure
    #[track_caller]
    pub fn new<F, Fut, T, E>(function: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: IntoValues,
        E: Into<anyhow::Error>,
    {
        Self::from_outcome(move || {
            let fut = function();
            async move { settle(fut.await) }
        })
    }

    /// Build an operation from a synchronous closure, run on the calling task
    #[track_caller]
    pub fn from_fn<F, T, E>(function: F) -> Self
    where
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
        T: IntoValues,
        E: Into<anyhow::Error>,
    {
        let function = Arc::new(function);
        Self::from_outcome(move || {
            let function = function.clone();
            async move { settle(function()) }
        })
    }

    /// Build an operation from a blocking closure, run via `spawn_blocking`
    #[track_caller]
    pub fn blocking<F, T, E>(function: F) -> Self
    where
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
        T: IntoValues + Send + 'static,
        E: Into<anyhow::Error> + Send + 'static,
    {
        let function = Arc::new(function);
        Self::from_outcome(move || {
            let function = function.clone();
            async move {
                match tokio::task::spawn_blocking(move || function()).await {
                    Ok(result) => settle(result),
                    Err(join_error) => Outcome::Failure(TryError::Panicked(join_error.to_string())),
                }
            }
        })
    }

    /// Build an operation from a closure that already yields an [`Outcome`]
    #[track_caller]
    pub fn from_outcome<F, Fut>(function: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Outcome<Value>> + Send + 'static,
    {
        Self {
            invoke: Arc::new(move || Box::pin(function()) as OperationFuture),
            location: Location::caller(),
        }
    }

    /// Start one attempt.
    ///
    /// A panic raised while building or polling the attempt is caught and
    /// reported as [`TryError::Panicked`], so it is retried, logged and routed
    /// like any other failure.
    pub fn invoke(&self) -> OperationFuture {
        let attempt = match panic::catch_unwind(AssertUnwindSafe(|| (self.invoke)())) {
            Ok(attempt) => attempt,
            Err(payload) => {
                let outcome = Outcome::Failure(TryError::Panicked(panic_message(payload)));
                return Box::pin(async move { outcome });
            }
        };

        Box::pin(AssertUnwindSafe(attempt).catch_unwind().map(|result| {
            result.unwrap_or_else(|payload| Outcome::Failure(TryError::Panicked(panic_message(payload))))
        }))
    }

    /// Source location where the operation was constructed
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("location", &format_args!("{}", self.location))
            .finish()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

fn settle<T, E>(result: Result<T, E>) -> Outcome<Value>
where
    T: IntoValues,
    E: Into<anyhow::Error>,
{
    match result {
        Ok(values) => match values.into_values() {
            Ok(values) => Outcome::Success(values),
            Err(e) => Outcome::Failure(TryError::Serialization(e)),
        },
        Err(e) => Outcome::Failure(TryError::Operation(e.into())),
    }
}

/// Conversion of an operation's success value into an ordered value list
pub trait IntoValues {
    /// Flatten into JSON values, preserving order
    fn into_values(self) -> serde_json::Result<Vec<Value>>;
}

/// Wraps any serializable value as a single result value
#[derive(Debug, Clone)]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoValues for Json<T> {
    fn into_values(self) -> serde_json::Result<Vec<Value>> {
        Ok(vec![serde_json::to_value(self.0)?])
    }
}

impl IntoValues for () {
    fn into_values(self) -> serde_json::Result<Vec<Value>> {
        Ok(Vec::new())
    }
}

impl IntoValues for Value {
    fn into_values(self) -> serde_json::Result<Vec<Value>> {
        Ok(vec![self])
    }
}

impl IntoValues for Vec<Value> {
    fn into_values(self) -> serde_json::Result<Vec<Value>> {
        Ok(self)
    }
}

impl IntoValues for &str {
    fn into_values(self) -> serde_json::Result<Vec<Value>> {
        Ok(vec![Value::from(self)])
    }
}

macro_rules! scalar_values {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoValues for $ty {
                fn into_values(self) -> serde_json::Result<Vec<Value>> {
                    Ok(vec![serde_json::to_value(self)?])
                }
            }
        )*
    };
}

scalar_values!(bool, i8, i16, i32, i64, u8, u16, u32, u64, usize, isize, f32, f64, String);

macro_rules! tuple_values {
    ($($name:ident),+) => {
        impl<$($name: Serialize),+> IntoValues for ($($name,)+) {
            #[allow(non_snake_case)]
            fn into_values(self) -> serde_json::Result<Vec<Value>> {
                let ($($name,)+) = self;
                Ok(vec![$(serde_json::to_value($name)?),+])
            }
        }
    };
}

tuple_values!(A);
tuple_values!(A, B);
tuple_values!(A, B, C);
tuple_values!(A, B, C, D);
tuple_values!(A, B, C, D, E);
