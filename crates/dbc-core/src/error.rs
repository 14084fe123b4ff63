//! Core error types for dbc-core.
//!
//! Uses `thiserror` for structured, matchable error variants covering
//! registry bookkeeping, argument binding, and domain validation.

use thiserror::Error;

/// Core errors produced by the dbc-core and registry layers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// An attachment arrived after the operation's contract was finalized.
    #[error("contract for '{operation}' is finalized; further attachments are rejected")]
    ContractFinalized { operation: String },

    /// A finished record was inserted under a name that is already taken.
    #[error("a contract for '{operation}' is already registered")]
    AlreadyRegistered { operation: String },

    /// The same operation name was used with two different signatures.
    #[error("signature mismatch for '{operation}': registered {registered}, attached {attached}")]
    SignatureMismatch {
        operation: String,
        registered: String,
        attached: String,
    },

    /// No contract (building or finalized) exists for the operation.
    #[error("operation not found: '{name}'")]
    OperationNotFound { name: String },

    /// A signature declares the same parameter name twice.
    #[error("'{operation}' declares parameter '{name}' more than once")]
    DuplicateParameter { operation: String, name: String },

    /// A call supplied the wrong number of positional arguments.
    #[error("'{operation}' takes {expected} argument(s), {got} supplied")]
    ArityMismatch {
        operation: String,
        expected: usize,
        got: usize,
    },

    /// An exception kind in a `raises` declaration was empty.
    #[error("empty exception kind declared for '{operation}'")]
    EmptyExceptionKind { operation: String },

    /// A domain description cannot produce any value.
    #[error("invalid domain: {reason}")]
    InvalidDomain { reason: String },
}
