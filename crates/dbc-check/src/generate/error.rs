use dbc_core::{Args, CoreError};
use thiserror::Error;

use crate::engine::error::EngineError;

/// Errors that stop a generation run.
///
/// Counterexamples are not errors; they are collected in the report. These
/// cover misconfiguration and contracts that cannot be evaluated at all.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerationError {
    #[error("'{operation}' takes {expected} parameter(s), {got} domain(s) supplied")]
    DomainArity {
        operation: String,
        expected: usize,
        got: usize,
    },

    #[error("'{operation}' has no parameter named '{name}'")]
    UnknownParameter { operation: String, name: String },

    #[error("regression #{index} for '{operation}' has {got} value(s), expected {expected}")]
    RegressionArity {
        operation: String,
        index: usize,
        expected: usize,
        got: usize,
    },

    /// A condition returned an error or panicked on a generated input.
    #[error("contract of '{operation}' could not be evaluated on ({arguments}): {source}")]
    ContractDefect {
        operation: String,
        arguments: Args,
        #[source]
        source: EngineError,
    },

    #[error(transparent)]
    Core(#[from] CoreError),
}
