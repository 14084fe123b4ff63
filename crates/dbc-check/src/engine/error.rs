//! Error types for guarded calls.
//!
//! [`CallError`] separates the four ways a guarded call can fail: a contract
//! violation, a defect in the contract's own definition ([`EngineError`]),
//! an error raised by the underlying operation ([`OperationError`]), and a
//! call that could not be bound to the signature.

use dbc_core::{ArgError, CoreError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::contracts::{ContractKind, ContractViolation};

/// Error kind marking a logical hole in a stub that still has to be written.
pub const IMPLEMENT_THIS: &str = "ImplementThis";

/// Error kind marking code intentionally left unimplemented.
pub const DONT_IMPLEMENT_THIS: &str = "DontImplementThis";

/// Error kind reported by traced calls whose body panicked.
pub const PANIC: &str = "Panic";

/// Error kind used when an operation body fails to read its own arguments.
pub const ARGUMENT_ERROR: &str = "ArgumentError";

/// An error raised by the underlying operation.
///
/// `kind` is the unit of the declared error set (`raises`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{kind}: {message}")]
pub struct OperationError {
    pub kind: String,
    pub message: String,
}

impl OperationError {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        OperationError {
            kind: kind.into(),
            message: message.into(),
        }
    }

    pub fn implement_this(message: impl Into<String>) -> Self {
        Self::new(IMPLEMENT_THIS, message)
    }

    pub fn dont_implement_this(message: impl Into<String>) -> Self {
        Self::new(DONT_IMPLEMENT_THIS, message)
    }

    /// True for the two placeholder kinds.
    pub fn is_unimplemented(&self) -> bool {
        self.kind == IMPLEMENT_THIS || self.kind == DONT_IMPLEMENT_THIS
    }
}

impl From<ArgError> for OperationError {
    fn from(err: ArgError) -> Self {
        OperationError::new(ARGUMENT_ERROR, err.to_string())
    }
}

/// A defect in a contract's definition, as opposed to the guarded operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("{kind} `{condition}` of '{operation}' could not be evaluated: {message}")]
    ConditionError {
        operation: String,
        kind: ContractKind,
        condition: String,
        message: String,
    },

    #[error("{kind} `{condition}` of '{operation}' panicked: {message}")]
    ConditionPanicked {
        operation: String,
        kind: ContractKind,
        condition: String,
        message: String,
    },
}

/// Everything a guarded call can fail with.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CallError {
    #[error(transparent)]
    Violation(#[from] ContractViolation),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Operation(#[from] OperationError),

    #[error(transparent)]
    Binding(#[from] CoreError),
}

impl CallError {
    pub fn violation(&self) -> Option<&ContractViolation> {
        match self {
            CallError::Violation(v) => Some(v),
            _ => None,
        }
    }

    /// The violated kind, if this is a violation.
    pub fn violation_kind(&self) -> Option<ContractKind> {
        self.violation().map(|v| v.kind)
    }

    pub fn operation_error(&self) -> Option<&OperationError> {
        match self {
            CallError::Operation(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ArgError> for CallError {
    fn from(err: ArgError) -> Self {
        CallError::Operation(err.into())
    }
}
