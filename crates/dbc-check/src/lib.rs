//! Contract enforcement and contract-driven input generation.
//!
//! Operations carry preconditions, postconditions, invariants, declared
//! error kinds, and verbal descriptions in a [`ContractRecord`]. A
//! [`GuardedOperation`] evaluates those conditions around every call while
//! the [`EnablementState`] allows it, and is a plain passthrough otherwise.
//! The [`generate`] driver synthesizes arguments from parameter domains and
//! probes guarded operations for counterexamples.

pub mod contracts;
pub mod enablement;
pub mod engine;
pub mod generate;
pub mod registry;

pub use contracts::condition::{Condition, ConditionError, PostCondition};
pub use contracts::record::{
    Attachment, ContractBuilder, ContractRecord, ContractSummary, DescriptionKind, Descriptions,
};
pub use contracts::{Boundary, ContractKind, ContractViolation};
pub use enablement::{
    contracts_enabled, disable_contracts, enable_contracts, with_forced, Enablement,
    EnablementState,
};
pub use engine::error::{CallError, EngineError, OperationError};
pub use engine::trace::{CallPhase, TracedCall};
pub use engine::GuardedOperation;
pub use generate::{
    Candidate, CandidateSource, Counterexample, Driver, DriverConfig, FailureReason,
    GenerationError, GenerationReport, HaltReason,
};
pub use registry::ContractRegistry;
