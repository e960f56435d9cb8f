//! Runtime-shaped callables
//!
//! Closures built in Rust already have their shape checked by the compiler.
//! This module covers callables whose shape is only known at runtime, such as
//! functions registered by name and called with JSON arguments. A
//! [`DynFunction`] declares a [`Signature`]; [`wrap`] binds positional
//! arguments to it and produces an [`Operation`], and the
//! [`IntoErrorHandler`] impls validate it as an error handler.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::engine::{ErrorHandler, HandlerError, IntoErrorHandler};
use crate::operation::Operation;
use crate::outcome::Outcome;
use crate::TryError;

/// Declared type of a parameter or return slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Kind {
    /// Any JSON value
    Value,
    /// An error slot, possibly empty
    Error,
}

/// Declared parameters and returns of a [`DynFunction`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// Parameter kinds, in order
    pub params: Vec<Kind>,
    /// Return kinds, in order
    pub returns: Vec<Kind>,
}

impl Signature {
    /// Signature from parameter and return kinds
    pub fn new(params: Vec<Kind>, returns: Vec<Kind>) -> Self {
        Self { params, returns }
    }

    /// Number of declared parameters
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Whether the last declared return is an error slot
    pub fn returns_error(&self) -> bool {
        self.returns.last() == Some(&Kind::Error)
    }
}

/// A runtime argument or return value
#[derive(Debug)]
pub enum Slot {
    /// A plain value
    Value(Value),
    /// `None` is an empty error slot
    Error(Option<anyhow::Error>),
}

impl Slot {
    /// Empty error slot
    pub fn ok() -> Self {
        Slot::Error(None)
    }

    /// Filled error slot
    pub fn err(error: impl Into<anyhow::Error>) -> Self {
        Slot::Error(Some(error.into()))
    }

    fn into_value(self) -> Value {
        match self {
            Slot::Value(value) => value,
            Slot::Error(None) => Value::Null,
            Slot::Error(Some(error)) => Value::String(error.to_string()),
        }
    }
}

type Body = dyn Fn(Vec<Slot>) -> Vec<Slot> + Send + Sync;

/// Function with a runtime signature
#[derive(Clone)]
pub struct DynFunction {
    name: String,
    signature: Signature,
    body: Arc<Body>,
}

impl DynFunction {
    /// Function named `name` with the given signature and body
    pub fn new<F>(name: impl Into<String>, signature: Signature, body: F) -> Self
    where
        F: Fn(Vec<Slot>) -> Vec<Slot> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            signature,
            body: Arc::new(body),
        }
    }

    /// Registered name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared signature
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Call the body directly, without any shape checks
    pub fn call(&self, args: Vec<Slot>) -> Vec<Slot> {
        (self.body)(args)
    }
}

impl fmt::Debug for DynFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynFunction")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .finish()
    }
}

/// A value that may or may not be invocable
#[derive(Debug, Clone)]
pub enum DynValue {
    /// An invocable function
    Function(DynFunction),
    /// Plain data; never invocable
    Data(Value),
}

impl From<DynFunction> for DynValue {
    fn from(function: DynFunction) -> Self {
        DynValue::Function(function)
    }
}

impl From<Value> for DynValue {
    fn from(value: Value) -> Self {
        DynValue::Data(value)
    }
}

/// Bind `args` to `callable`, producing an operation.
///
/// Shape problems surface when the operation runs, as a failed outcome:
/// "no function provided" for data, and an argument count error when
/// `args` does not match the declared parameters.
#[track_caller]
pub fn wrap(callable: impl Into<DynValue>, args: Vec<Value>) -> Operation {
    let callable = callable.into();
    Operation::from_outcome(move || {
        let callable = callable.clone();
        let args = args.clone();
        async move { invoke(&callable, args) }
    })
}

fn invoke(callable: &DynValue, args: Vec<Value>) -> Outcome<Value> {
    let DynValue::Function(function) = callable else {
        return Outcome::Failure(TryError::NoFunction);
    };

    let expected = function.signature.arity();
    if args.len() != expected {
        return Outcome::Failure(TryError::ArgumentCount {
            expected,
            actual: args.len(),
        });
    }

    debug!(function = %function.name, "Invoking dynamic function");
    let mut returns = function.call(args.into_iter().map(Slot::Value).collect());

    if function.signature.returns.is_empty() {
        return Outcome::done();
    }

    let declared = function.signature.returns.len();
    if returns.len() != declared {
        warn!(
            function = %function.name,
            expected = declared,
            actual = returns.len(),
            "Dynamic function returned wrong number of slots"
        );
        return Outcome::Failure(TryError::ReturnCount {
            expected: declared,
            actual: returns.len(),
        });
    }

    if function.signature.returns_error() && matches!(returns.last(), Some(Slot::Error(_))) {
        if let Some(Slot::Error(Some(error))) = returns.pop() {
            return Outcome::Failure(TryError::Operation(error));
        }
    }

    Outcome::Success(returns.into_iter().map(Slot::into_value).collect())
}

impl IntoErrorHandler for DynFunction {
    fn into_error_handler(self) -> Result<ErrorHandler, HandlerError> {
        if self.signature.params != [Kind::Error] {
            return Err(HandlerError::InvalidParameters);
        }
        if !matches!(self.signature.returns.as_slice(), [] | [Kind::Error]) {
            return Err(HandlerError::InvalidReturns);
        }

        Ok(ErrorHandler::new(move |error| {
            let mut returns = self.call(vec![Slot::err(error)]);
            match returns.pop() {
                Some(Slot::Error(Some(fatal))) if returns.is_empty() => Some(fatal),
                _ => None,
            }
        }))
    }
}

impl IntoErrorHandler for DynValue {
    fn into_error_handler(self) -> Result<ErrorHandler, HandlerError> {
        match self {
            DynValue::Function(function) => function.into_error_handler(),
            DynValue::Data(_) => Err(HandlerError::NotAFunction),
        }
    }
}

/// Named dynamic functions
#[derive(Debug, Default, Clone)]
pub struct FunctionRegistry {
    functions: HashMap<String, DynFunction>,
}

impl FunctionRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function under its own name, replacing any previous one
    pub fn register(&mut self, function: DynFunction) {
        self.functions.insert(function.name.clone(), function);
    }

    /// Function registered as `name`
    pub fn get(&self, name: &str) -> Option<&DynFunction> {
        self.functions.get(name)
    }

    /// Registered names, sorted
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<_> = self.functions.keys().cloned().collect();
        names.sort();
        names
    }

    /// The function registered as `name`, or the name itself as plain data
    pub fn resolve(&self, name: &str) -> DynValue {
        match self.functions.get(name) {
            Some(function) => DynValue::Function(function.clone()),
            None => DynValue::Data(Value::String(name.to_string())),
        }
    }

    /// Bind `args` to the function registered as `name`
    #[track_caller]
    pub fn wrap(&self, name: &str, args: Vec<Value>) -> Operation {
        wrap(self.resolve(name), args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn add() -> DynFunction {
        DynFunction::new(
            "add",
            Signature::new(vec![Kind::Value, Kind::Value], vec![Kind::Value, Kind::Error]),
            |args| {
                let sum: Option<i64> = args
                    .iter()
                    .map(|slot| match slot {
                        Slot::Value(value) => value.as_i64(),
                        Slot::Error(_) => None,
                    })
                    .sum();
                match sum {
                    Some(sum) => vec![Slot::Value(json!(sum)), Slot::ok()],
                    None => vec![Slot::Value(Value::Null), Slot::err(anyhow::anyhow!("not a number"))],
                }
            },
        )
    }

    #[test]
    fn test_signature_queries() {
        let signature = add().signature().clone();
        assert_eq!(signature.arity(), 2);
        assert!(signature.returns_error());
        assert!(!Signature::default().returns_error());
    }

    #[tokio::test]
    async fn test_trailing_error_is_split_off() {
        let outcome = wrap(add(), vec![json!(2), json!(3)]).invoke().await;
        assert_eq!(outcome.values(), Some(&[json!(5)][..]));
    }

    #[tokio::test]
    async fn test_present_error_fails() {
        let outcome = wrap(add(), vec![json!(2), json!("x")]).invoke().await;
        assert_eq!(
            outcome.error().map(ToString::to_string).as_deref(),
            Some("not a number")
        );
    }

    #[tokio::test]
    async fn test_short_return_is_a_failure() {
        let short = DynFunction::new(
            "short",
            Signature::new(vec![], vec![Kind::Value, Kind::Error]),
            |_| vec![Slot::Value(json!(42))],
        );
        let outcome = wrap(short, vec![]).invoke().await;
        match outcome.error() {
            Some(TryError::ReturnCount { expected, actual }) => {
                assert_eq!((*expected, *actual), (2, 1));
            }
            other => panic!("expected return count error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_value_in_error_position_is_kept() {
        let odd = DynFunction::new(
            "odd",
            Signature::new(vec![], vec![Kind::Value, Kind::Error]),
            |_| vec![Slot::Value(json!(1)), Slot::Value(json!(2))],
        );
        let outcome = wrap(odd, vec![]).invoke().await;
        assert_eq!(outcome.values(), Some(&[json!(1), json!(2)][..]));
    }

    #[test]
    fn test_handler_shape_checks() {
        let no_params = DynFunction::new("h", Signature::new(vec![], vec![]), |_| vec![]);
        assert_eq!(
            no_params.into_error_handler().unwrap_err(),
            HandlerError::InvalidParameters
        );

        let value_return = DynFunction::new(
            "h",
            Signature::new(vec![Kind::Error], vec![Kind::Value]),
            |_| vec![Slot::Value(Value::Null)],
        );
        assert_eq!(
            value_return.into_error_handler().unwrap_err(),
            HandlerError::InvalidReturns
        );

        assert_eq!(
            DynValue::Data(json!(42)).into_error_handler().unwrap_err(),
            HandlerError::NotAFunction
        );
    }

    #[test]
    fn test_registry_resolve() {
        let mut registry = FunctionRegistry::new();
        registry.register(add());
        assert_eq!(registry.list(), vec!["add".to_string()]);
        assert!(matches!(registry.resolve("add"), DynValue::Function(_)));
        assert!(matches!(registry.resolve("missing"), DynValue::Data(_)));
    }
}
