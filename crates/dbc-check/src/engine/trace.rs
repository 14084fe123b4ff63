//! Call-phase tracing for guarded calls.
//!
//! When a call is made through [`GuardedOperation::call_traced`], the engine
//! records every [`CallPhase`] the call passes through. Counterexamples carry
//! this trace so a report shows how far a failing probe got.
//!
//! [`GuardedOperation::call_traced`]: super::GuardedOperation::call_traced

use serde::{Deserialize, Serialize};

/// States of the per-call state machine:
/// `Entry -> PreChecked -> Executing -> PostChecked -> Returned`, with
/// `Failed` as the alternate terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallPhase {
    Entry,
    PreChecked,
    Executing,
    PostChecked,
    Returned,
    Failed,
}

/// Optional sink for phase transitions; `None` means untraced.
pub(crate) struct PhaseTrace<'a> {
    sink: Option<&'a mut Vec<CallPhase>>,
}

impl<'a> PhaseTrace<'a> {
    pub(crate) fn off() -> Self {
        PhaseTrace { sink: None }
    }

    pub(crate) fn recording(sink: &'a mut Vec<CallPhase>) -> Self {
        PhaseTrace { sink: Some(sink) }
    }

    pub(crate) fn is_off(&self) -> bool {
        self.sink.is_none()
    }

    pub(crate) fn enter(&mut self, operation: &str, phase: CallPhase) {
        tracing::trace!(operation, ?phase, "call phase");
        if let Some(sink) = self.sink.as_deref_mut() {
            sink.push(phase);
        }
    }
}

/// Outcome of a traced call.
#[derive(Debug, Clone)]
pub struct TracedCall<T> {
    pub result: T,
    pub phases: Vec<CallPhase>,
}

impl<T> TracedCall<T> {
    /// Whether the underlying body was reached.
    pub fn executed(&self) -> bool {
        self.phases.contains(&CallPhase::Executing)
    }
}
