//! Generation outcomes: counterexamples and the run summary.

use serde::{Deserialize, Serialize};

use dbc_core::{Args, OperationId, Value};

use crate::contracts::{Boundary, ContractKind};
use crate::engine::trace::CallPhase;

/// Where a probed argument tuple came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    /// Replayed verbatim from a saved counterexample.
    Regression,
    /// A combination of per-parameter edge values.
    Boundary,
    /// Drawn from the seeded RNG.
    Random,
}

/// One argument tuple scheduled for probing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub source: CandidateSource,
    pub values: Vec<Value>,
}

/// Why a probe counts as a failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    /// A contract check failed after the preconditions of the probed call
    /// held. `operation` names the guarded call whose check failed, which is
    /// a nested one when the body calls other guarded operations.
    Violation {
        contract: ContractKind,
        operation: String,
        condition: String,
        boundary: Option<Boundary>,
    },
    /// The body raised an error kind its contract does not declare.
    UndeclaredError { error_kind: String, message: String },
}

/// A concrete input on which the operation misbehaved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Counterexample {
    pub operation: OperationId,
    pub arguments: Args,
    /// The value the failing check saw, when it got that far.
    pub result: Option<Value>,
    pub reason: FailureReason,
    pub source: CandidateSource,
    pub phases: Vec<CallPhase>,
}

impl Counterexample {
    /// Positional arguments, ready to be fed back as a regression.
    pub fn replay_values(&self) -> Vec<Value> {
        self.arguments.to_vec()
    }
}

/// Why a run stopped probing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HaltReason {
    BudgetExhausted,
    CounterexampleCap,
    CandidatesExhausted,
}

/// Summary of a generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationReport {
    pub operation: OperationId,
    pub seed: u64,
    pub probes_run: usize,
    pub passed: usize,
    /// Inputs rejected by the probed call's own preconditions.
    pub skipped: usize,
    /// Probes that raised an error kind the contract declares.
    pub declared_errors: usize,
    /// Probes that hit an operation marked as not implemented.
    pub unimplemented: usize,
    pub counterexamples: Vec<Counterexample>,
    /// Probes that raised an undeclared error kind.
    pub anomalies: Vec<Counterexample>,
    pub halt: HaltReason,
}

impl GenerationReport {
    pub(crate) fn new(operation: OperationId, seed: u64) -> Self {
        GenerationReport {
            operation,
            seed,
            probes_run: 0,
            passed: 0,
            skipped: 0,
            declared_errors: 0,
            unimplemented: 0,
            counterexamples: Vec::new(),
            anomalies: Vec::new(),
            halt: HaltReason::CandidatesExhausted,
        }
    }

    /// Counterexamples plus anomalies.
    pub fn failures(&self) -> usize {
        self.counterexamples.len() + self.anomalies.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures() == 0
    }

    /// Argument tuples of every failure, in discovery order.
    pub fn regressions(&self) -> Vec<Vec<Value>> {
        self.counterexamples
            .iter()
            .chain(&self.anomalies)
            .map(Counterexample::replay_values)
            .collect()
    }
}
