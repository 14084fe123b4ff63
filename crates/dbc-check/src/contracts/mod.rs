//! Contract types for behavioral contracts on operations.
//!
//! Contracts are checked around every guarded call while enablement allows
//! it and skipped entirely otherwise. Violations carry the bound arguments
//! (and, for postconditions and exit invariants, the produced result) so a
//! failure can be reproduced from the diagnostic alone.

pub mod condition;
pub mod record;

use std::fmt;

use dbc_core::{Args, OperationId, Value};
use serde::{Deserialize, Serialize};

/// The kind of contract clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContractKind {
    /// Checked at call entry, before the body runs.
    Precondition,
    /// Checked after the body returns, against its result.
    Postcondition,
    /// Checked at both entry and exit of every call, recursive ones included.
    Invariant,
}

impl ContractKind {
    /// Name of the violation this kind produces, e.g. `PreconditionViolation`.
    pub fn violation_name(self) -> &'static str {
        match self {
            ContractKind::Precondition => "PreconditionViolation",
            ContractKind::Postcondition => "PostconditionViolation",
            ContractKind::Invariant => "InvariantViolation",
        }
    }
}

impl fmt::Display for ContractKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ContractKind::Precondition => "precondition",
            ContractKind::Postcondition => "postcondition",
            ContractKind::Invariant => "invariant",
        })
    }
}

/// Which crossing of the call boundary an invariant was checked at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Boundary {
    Entry,
    Exit,
}

/// A structured contract violation.
///
/// Contains everything needed to understand and reproduce the failure:
/// which clause failed (its text and position in declaration order), the
/// operation, the bound arguments, and the produced result when there was one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractViolation {
    /// What kind of contract was violated.
    pub kind: ContractKind,
    /// The operation whose contract failed.
    pub operation: OperationId,
    /// Text of the failing condition.
    pub condition: String,
    /// Zero-based position of the failing condition among clauses of its kind.
    pub index: usize,
    /// For invariants, whether the failure happened at entry or exit.
    pub boundary: Option<Boundary>,
    /// Verbal description attached for this kind, if any.
    pub description: Option<String>,
    /// Arguments bound by parameter name.
    pub arguments: Args,
    /// For postconditions and exit invariants, the produced result.
    pub result: Option<Value>,
}

impl fmt::Display for ContractViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} in {}: `{}` failed",
            self.kind.violation_name(),
            self.operation,
            self.condition
        )?;
        if let Some(boundary) = self.boundary {
            write!(f, " at {:?}", boundary)?;
        }
        write!(f, " with ({})", self.arguments)?;
        if let Some(result) = &self.result {
            write!(f, " -> {}", result)?;
        }
        Ok(())
    }
}

impl std::error::Error for ContractViolation {}
