//! Outcome of a single invocation attempt

use crate::TryError;

/// Result of one attempt: an ordered list of values or an error, never both
#[derive(Debug)]
pub enum Outcome<T, E = TryError> {
    /// The attempt produced zero or more values
    Success(Vec<T>),
    /// The attempt failed
    Failure(E),
}

impl<T, E> Outcome<T, E> {
    /// Successful outcome carrying `values`
    pub fn success(values: Vec<T>) -> Self {
        Outcome::Success(values)
    }

    /// Successful outcome with no values
    pub fn done() -> Self {
        Outcome::Success(Vec::new())
    }

    /// Failed outcome
    pub fn failure(error: E) -> Self {
        Outcome::Failure(error)
    }

    /// Whether this is a success
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    /// Whether this is a failure
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure(_))
    }

    /// Values of a successful outcome
    pub fn values(&self) -> Option<&[T]> {
        match self {
            Outcome::Success(values) => Some(values),
            Outcome::Failure(_) => None,
        }
    }

    /// Error of a failed outcome
    pub fn error(&self) -> Option<&E> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Failure(error) => Some(error),
        }
    }

    /// Convert into a standard `Result`
    pub fn into_result(self) -> Result<Vec<T>, E> {
        match self {
            Outcome::Success(values) => Ok(values),
            Outcome::Failure(error) => Err(error),
        }
    }
}

impl<T, E> From<Result<Vec<T>, E>> for Outcome<T, E> {
    fn from(result: Result<Vec<T>, E>) -> Self {
        match result {
            Ok(values) => Outcome::Success(values),
            Err(error) => Outcome::Failure(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_queries() {
        let outcome: Outcome<i32> = Outcome::success(vec![1, 2]);
        assert!(outcome.is_success());
        assert!(!outcome.is_failure());
        assert_eq!(outcome.values(), Some(&[1, 2][..]));
        assert!(outcome.error().is_none());
    }

    #[test]
    fn test_failure_queries() {
        let outcome: Outcome<i32> = Outcome::failure(TryError::NoFunction);
        assert!(outcome.is_failure());
        assert!(outcome.values().is_none());
        assert!(matches!(outcome.into_result(), Err(TryError::NoFunction)));
    }

    #[test]
    fn test_done_is_empty_success() {
        let outcome: Outcome<()> = Outcome::done();
        assert_eq!(outcome.into_result().unwrap().len(), 0);
    }
}
