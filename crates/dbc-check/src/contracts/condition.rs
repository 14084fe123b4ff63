//! Condition functions: pure predicates implementing one contract clause.
//!
//! Each condition carries a short textual rendering (e.g. `"b != 0"`) used
//! for failure reports and scanned by the generation driver for literal
//! bounds. Conditions must be side-effect-free; an `Err` or a panic from a
//! condition is an engine error, never a violation.

use std::fmt;
use std::sync::Arc;

use dbc_core::{ArgError, Args, Value};
use thiserror::Error;

/// Error returned by a condition function that could not decide its clause.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConditionError {
    #[error(transparent)]
    Arg(#[from] ArgError),

    #[error("{0}")]
    Failed(String),
}

impl ConditionError {
    pub fn msg(message: impl Into<String>) -> Self {
        ConditionError::Failed(message.into())
    }
}

pub type ConditionResult = Result<bool, ConditionError>;

type ArgsPredicate = dyn Fn(&Args) -> ConditionResult + Send + Sync;
type ResultPredicate = dyn Fn(&Args, &Value) -> ConditionResult + Send + Sync;

/// A predicate over the call's arguments. Used for preconditions and
/// invariants.
#[derive(Clone)]
pub struct Condition {
    text: String,
    check: Arc<ArgsPredicate>,
}

impl Condition {
    pub fn new<F>(text: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Args) -> ConditionResult + Send + Sync + 'static,
    {
        Condition {
            text: text.into(),
            check: Arc::new(check),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub(crate) fn evaluate(&self, args: &Args) -> ConditionResult {
        (self.check)(args)
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Condition").field(&self.text).finish()
    }
}

/// A predicate over the call's arguments plus the produced result.
#[derive(Clone)]
pub struct PostCondition {
    text: String,
    check: Arc<ResultPredicate>,
}

impl PostCondition {
    pub fn new<F>(text: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Args, &Value) -> ConditionResult + Send + Sync + 'static,
    {
        PostCondition {
            text: text.into(),
            check: Arc::new(check),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub(crate) fn evaluate(&self, args: &Args, result: &Value) -> ConditionResult {
        (self.check)(args, result)
    }
}

impl fmt::Debug for PostCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PostCondition").field(&self.text).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbc_core::{OperationId, ParamType};

    #[test]
    fn evaluates_against_bound_arguments() {
        let op = OperationId::new("div")
            .param("a", ParamType::Int)
            .param("b", ParamType::Int);
        let nonzero = Condition::new("b != 0", |args| Ok(args.int("b")? != 0));
        let exact = PostCondition::new("result == a / b", |args, result| {
            Ok(result.as_int() == Some(args.int("a")? / args.int("b")?))
        });

        let args = Args::bind(&op, vec![9.into(), 3.into()]).unwrap();
        assert_eq!(nonzero.evaluate(&args), Ok(true));
        assert_eq!(exact.evaluate(&args, &Value::Int(3)), Ok(true));
        assert_eq!(exact.evaluate(&args, &Value::Int(4)), Ok(false));
        assert_eq!(nonzero.text(), "b != 0");
    }

    #[test]
    fn argument_errors_surface_as_condition_errors() {
        let op = OperationId::new("f").param("x", ParamType::Str);
        let cond = Condition::new("x > 0", |args| Ok(args.int("x")? > 0));
        let args = Args::bind(&op, vec!["a".into()]).unwrap();
        assert!(matches!(cond.evaluate(&args), Err(ConditionError::Arg(_))));
    }
}
