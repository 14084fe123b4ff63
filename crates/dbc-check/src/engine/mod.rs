//! The enforcement engine: guarded operations and the per-call state machine.
//!
//! A [`GuardedOperation`] pairs an operation body with its finalized
//! [`ContractRecord`]. Each call reads the enablement state exactly once.
//! When nothing is enabled (or the record has no clauses) the body is invoked
//! directly and no condition function runs. Otherwise the call walks
//! `Entry -> PreChecked -> Executing -> PostChecked -> Returned`:
//!
//! 1. entry invariants, in declaration order;
//! 2. preconditions, in declaration order, short-circuiting on the first
//!    failure without running the body;
//! 3. the body, whose errors propagate unchanged;
//! 4. postconditions against the arguments and the produced result;
//! 5. exit invariants.
//!
//! Recursive calls made through the handle passed to a
//! [`GuardedOperation::recursive`] body get their own state machine, so
//! invariants are checked at every crossing, not only the outermost one.

pub mod error;
pub mod trace;

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use dbc_core::{Args, OperationId, Value};

use crate::contracts::condition::ConditionResult;
use crate::contracts::record::ContractRecord;
use crate::contracts::{Boundary, ContractKind, ContractViolation};
use crate::enablement::{with_forced, Enablement, EnablementState};

use self::error::{CallError, EngineError, OperationError, PANIC};
use self::trace::{CallPhase, PhaseTrace, TracedCall};

type Body = dyn Fn(&GuardedOperation, &Args) -> Result<Value, CallError> + Send + Sync;

/// An operation wrapped with contract enforcement.
pub struct GuardedOperation {
    record: Arc<ContractRecord>,
    body: Box<Body>,
    enablement: &'static EnablementState,
}

impl GuardedOperation {
    /// Guards a non-recursive body. Bound to the process-wide enablement state.
    pub fn new<F>(record: Arc<ContractRecord>, body: F) -> Self
    where
        F: Fn(&Args) -> Result<Value, CallError> + Send + Sync + 'static,
    {
        Self::recursive(record, move |_, args| body(args))
    }

    /// Guards a body that receives a handle to the guarded operation itself,
    /// so recursive calls go back through the engine.
    pub fn recursive<F>(record: Arc<ContractRecord>, body: F) -> Self
    where
        F: Fn(&GuardedOperation, &Args) -> Result<Value, CallError> + Send + Sync + 'static,
    {
        GuardedOperation {
            record,
            body: Box::new(body),
            enablement: EnablementState::global(),
        }
    }

    /// Guards a body with no contract at all.
    pub fn unguarded<F>(operation: OperationId, body: F) -> Self
    where
        F: Fn(&Args) -> Result<Value, CallError> + Send + Sync + 'static,
    {
        Self::new(Arc::new(ContractRecord::empty(operation)), body)
    }

    /// Binds the operation to a specific enablement state instead of the
    /// process-wide one.
    pub fn bind_to(mut self, state: &'static EnablementState) -> Self {
        self.enablement = state;
        self
    }

    pub fn record(&self) -> &Arc<ContractRecord> {
        &self.record
    }

    pub fn operation(&self) -> &OperationId {
        self.record.operation()
    }

    /// Calls with positional arguments under the bound enablement state.
    pub fn call(&self, values: Vec<Value>) -> Result<Value, CallError> {
        let args = Args::bind(self.operation(), values)?;
        self.invoke(&args)
    }

    /// Calls with already-bound arguments under the bound enablement state.
    pub fn invoke(&self, args: &Args) -> Result<Value, CallError> {
        let mode = self.enablement.snapshot();
        self.run(mode, args, PhaseTrace::off())
    }

    /// Calls with `mode` forced for this call and every guarded call it makes
    /// on the current thread.
    pub fn call_with(&self, mode: Enablement, values: Vec<Value>) -> Result<Value, CallError> {
        let args = Args::bind(self.operation(), values)?;
        with_forced(mode, || self.run(mode, &args, PhaseTrace::off()))
    }

    /// Like [`call_with`](Self::call_with), also returning the phases the
    /// outermost call went through. A panic in the body surfaces as an
    /// [`OperationError`] of kind [`PANIC`](error::PANIC).
    pub fn call_traced(
        &self,
        mode: Enablement,
        values: Vec<Value>,
    ) -> TracedCall<Result<Value, CallError>> {
        let mut phases = Vec::new();
        let result = match Args::bind(self.operation(), values) {
            Ok(args) => with_forced(mode, || {
                self.run(mode, &args, PhaseTrace::recording(&mut phases))
            }),
            Err(err) => Err(err.into()),
        };
        TracedCall { result, phases }
    }

    fn run(
        &self,
        mode: Enablement,
        args: &Args,
        mut trace: PhaseTrace<'_>,
    ) -> Result<Value, CallError> {
        if trace.is_off() && (mode.is_none() || self.record.has_no_conditions()) {
            return (self.body)(self, args);
        }

        let name = self.record.operation().name.as_str();
        trace.enter(name, CallPhase::Entry);
        let outcome = self.step(mode, args, &mut trace);
        trace.enter(
            name,
            if outcome.is_ok() {
                CallPhase::Returned
            } else {
                CallPhase::Failed
            },
        );
        outcome
    }

    fn step(
        &self,
        mode: Enablement,
        args: &Args,
        trace: &mut PhaseTrace<'_>,
    ) -> Result<Value, CallError> {
        let name = self.record.operation().name.as_str();

        if mode.checks(ContractKind::Invariant) {
            self.check_invariants(args, Boundary::Entry, None)?;
        }
        if mode.checks(ContractKind::Precondition) {
            for (index, cond) in self.record.preconditions().iter().enumerate() {
                let holds = self.decide(ContractKind::Precondition, cond.text(), || {
                    cond.evaluate(args)
                })?;
                if !holds {
                    return Err(self
                        .violation(ContractKind::Precondition, index, cond.text(), None, args, None)
                        .into());
                }
            }
        }
        trace.enter(name, CallPhase::PreChecked);

        trace.enter(name, CallPhase::Executing);
        let outcome = if trace.is_off() {
            (self.body)(self, args)
        } else {
            // Traced calls report a panicking body as an undeclared error.
            panic::catch_unwind(AssertUnwindSafe(|| (self.body)(self, args))).unwrap_or_else(
                |payload| Err(OperationError::new(PANIC, panic_message(payload.as_ref())).into()),
            )
        };
        let result = match outcome {
            Ok(value) => value,
            Err(err) => {
                if !mode.is_none() {
                    self.note_undeclared(&err);
                }
                return Err(err);
            }
        };

        if mode.checks(ContractKind::Postcondition) {
            for (index, cond) in self.record.postconditions().iter().enumerate() {
                let holds = self.decide(ContractKind::Postcondition, cond.text(), || {
                    cond.evaluate(args, &result)
                })?;
                if !holds {
                    return Err(self
                        .violation(
                            ContractKind::Postcondition,
                            index,
                            cond.text(),
                            None,
                            args,
                            Some(&result),
                        )
                        .into());
                }
            }
        }
        trace.enter(name, CallPhase::PostChecked);

        if mode.checks(ContractKind::Invariant) {
            self.check_invariants(args, Boundary::Exit, Some(&result))?;
        }
        Ok(result)
    }

    fn check_invariants(
        &self,
        args: &Args,
        boundary: Boundary,
        result: Option<&Value>,
    ) -> Result<(), CallError> {
        for (index, cond) in self.record.invariants().iter().enumerate() {
            let holds = self.decide(ContractKind::Invariant, cond.text(), || cond.evaluate(args))?;
            if !holds {
                return Err(self
                    .violation(
                        ContractKind::Invariant,
                        index,
                        cond.text(),
                        Some(boundary),
                        args,
                        result,
                    )
                    .into());
            }
        }
        Ok(())
    }

    /// Evaluates one condition, turning an `Err` or a panic into an engine error.
    fn decide<F>(&self, kind: ContractKind, condition: &str, f: F) -> Result<bool, EngineError>
    where
        F: FnOnce() -> ConditionResult,
    {
        match panic::catch_unwind(AssertUnwindSafe(f)) {
            Ok(Ok(holds)) => Ok(holds),
            Ok(Err(err)) => Err(EngineError::ConditionError {
                operation: self.record.operation().name.clone(),
                kind,
                condition: condition.to_string(),
                message: err.to_string(),
            }),
            Err(payload) => Err(EngineError::ConditionPanicked {
                operation: self.record.operation().name.clone(),
                kind,
                condition: condition.to_string(),
                message: panic_message(payload.as_ref()),
            }),
        }
    }

    fn violation(
        &self,
        kind: ContractKind,
        index: usize,
        condition: &str,
        boundary: Option<Boundary>,
        args: &Args,
        result: Option<&Value>,
    ) -> ContractViolation {
        let descriptions = self.record.descriptions();
        let description = match kind {
            ContractKind::Precondition => descriptions.pre.clone(),
            ContractKind::Postcondition => descriptions.post.clone(),
            ContractKind::Invariant => descriptions.invariant.clone(),
        };
        tracing::debug!(
            operation = %self.record.operation().name,
            %kind,
            condition,
            "contract violated"
        );
        ContractViolation {
            kind,
            operation: self.record.operation().clone(),
            condition: condition.to_string(),
            index,
            boundary,
            description,
            arguments: args.clone(),
            result: result.cloned(),
        }
    }

    fn note_undeclared(&self, err: &CallError) {
        if let CallError::Operation(op_err) = err {
            if !op_err.is_unimplemented() && !self.record.declares(&op_err.kind) {
                tracing::warn!(
                    operation = %self.record.operation().name,
                    kind = %op_err.kind,
                    "undeclared error kind escaped guarded call"
                );
            }
        }
    }
}

impl fmt::Debug for GuardedOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuardedOperation")
            .field("record", &self.record)
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use dbc_core::ParamType;

    use crate::contracts::condition::ConditionError;
    use crate::contracts::record::ContractBuilder;
    use crate::engine::error::OperationError;

    fn div_id() -> OperationId {
        OperationId::new("div")
            .param("a", ParamType::Int)
            .param("b", ParamType::Int)
    }

    fn state(mode: Enablement) -> &'static EnablementState {
        Box::leak(Box::new(EnablementState::new(mode)))
    }

    fn counting_div(
        record: ContractRecord,
        calls: Arc<AtomicUsize>,
        mode: Enablement,
    ) -> GuardedOperation {
        GuardedOperation::new(Arc::new(record), move |args| {
            calls.fetch_add(1, Ordering::SeqCst);
            let b = args.int("b")?;
            if b == 0 {
                return Err(OperationError::new("ZeroDivision", "division by zero").into());
            }
            Ok(Value::Int(args.int("a")?.div_euclid(b)))
        })
        .bind_to(state(mode))
    }

    fn div_record() -> ContractRecord {
        ContractBuilder::new(div_id())
            .pre_description("divisor cannot be zero")
            .precondition("b != 0", |a| Ok(a.int("b")? != 0))
            .postcondition("result == a div b", |a, r| {
                Ok(r.as_int() == Some(a.int("a")?.div_euclid(a.int("b")?)))
            })
            .finalize()
            .unwrap()
    }

    #[test]
    fn precondition_failure_short_circuits_body() {
        let calls = Arc::new(AtomicUsize::new(0));
        let op = counting_div(div_record(), calls.clone(), Enablement::ALL);

        let err = op.call(vec![10.into(), 0.into()]).unwrap_err();
        let violation = err.violation().unwrap();
        assert_eq!(violation.kind, ContractKind::Precondition);
        assert_eq!(violation.condition, "b != 0");
        assert_eq!(violation.description.as_deref(), Some("divisor cannot be zero"));
        assert_eq!(violation.arguments.int("b"), Ok(0));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn disabled_is_passthrough_and_evaluates_nothing() {
        let evaluated = Arc::new(AtomicUsize::new(0));
        let seen = evaluated.clone();
        let record = ContractBuilder::new(div_id())
            .precondition("counted", move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(false)
            })
            .finalize()
            .unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let op = counting_div(record, calls.clone(), Enablement::NONE);

        assert_eq!(op.call(vec![7.into(), 2.into()]), Ok(Value::Int(3)));
        assert_eq!(
            op.call(vec![7.into(), 0.into()]),
            Err(OperationError::new("ZeroDivision", "division by zero").into())
        );
        assert_eq!(evaluated.load(Ordering::SeqCst), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn first_failing_precondition_in_declaration_order_is_reported() {
        let record = ContractBuilder::new(div_id())
            .precondition("a > 0", |a| Ok(a.int("a")? > 0))
            .precondition("b > 0", |a| Ok(a.int("b")? > 0))
            .finalize()
            .unwrap();
        let op = counting_div(record, Arc::new(AtomicUsize::new(0)), Enablement::ALL);

        let err = op.call(vec![(-1).into(), (-1).into()]).unwrap_err();
        let violation = err.violation().unwrap();
        assert_eq!(violation.condition, "a > 0");
        assert_eq!(violation.index, 0);

        let err = op.call(vec![1.into(), (-1).into()]).unwrap_err();
        assert_eq!(err.violation().unwrap().index, 1);
    }

    #[test]
    fn postcondition_failure_carries_result() {
        let op = GuardedOperation::new(Arc::new(div_record()), |args| {
            Ok(Value::Int(args.int("a")?.div_euclid(args.int("b")?) + 1))
        })
        .bind_to(state(Enablement::ALL));

        let err = op.call(vec![10.into(), 3.into()]).unwrap_err();
        let violation = err.violation().unwrap();
        assert_eq!(violation.kind, ContractKind::Postcondition);
        assert_eq!(violation.result, Some(Value::Int(4)));
    }

    #[test]
    fn per_kind_enablement_skips_other_kinds() {
        let op = GuardedOperation::new(Arc::new(div_record()), |_| Ok(Value::Int(99)))
            .bind_to(state(Enablement::only(ContractKind::Precondition)));
        assert_eq!(op.call(vec![10.into(), 3.into()]), Ok(Value::Int(99)));
        assert!(op.call(vec![10.into(), 0.into()]).is_err());
    }

    #[test]
    fn condition_errors_and_panics_are_engine_errors() {
        let record = ContractBuilder::new(div_id())
            .precondition("undecidable", |_| Err(ConditionError::msg("no answer")))
            .finalize()
            .unwrap();
        let op = GuardedOperation::new(Arc::new(record), |_| Ok(Value::Unit))
            .bind_to(state(Enablement::ALL));
        assert!(matches!(
            op.call(vec![1.into(), 1.into()]),
            Err(CallError::Engine(EngineError::ConditionError { .. }))
        ));

        let record = ContractBuilder::new(div_id())
            .postcondition("explodes", |_, _| panic!("condition blew up"))
            .finalize()
            .unwrap();
        let op = GuardedOperation::new(Arc::new(record), |_| Ok(Value::Unit))
            .bind_to(state(Enablement::ALL));
        match op.call(vec![1.into(), 1.into()]) {
            Err(CallError::Engine(EngineError::ConditionPanicked { message, kind, .. })) => {
                assert_eq!(message, "condition blew up");
                assert_eq!(kind, ContractKind::Postcondition);
            }
            other => panic!("expected panicked condition, got {:?}", other),
        }
    }

    #[test]
    fn traced_call_records_phases() {
        let op = GuardedOperation::new(Arc::new(div_record()), |args| {
            Ok(Value::Int(args.int("a")?.div_euclid(args.int("b")?)))
        });

        let ok = op.call_traced(Enablement::ALL, vec![9.into(), 3.into()]);
        assert_eq!(ok.result, Ok(Value::Int(3)));
        assert_eq!(
            ok.phases,
            vec![
                CallPhase::Entry,
                CallPhase::PreChecked,
                CallPhase::Executing,
                CallPhase::PostChecked,
                CallPhase::Returned,
            ]
        );

        let failed = op.call_traced(Enablement::ALL, vec![9.into(), 0.into()]);
        assert!(failed.result.is_err());
        assert!(!failed.executed());
        assert_eq!(failed.phases, vec![CallPhase::Entry, CallPhase::Failed]);
    }

    #[test]
    fn arity_mismatch_is_a_binding_error() {
        let op = GuardedOperation::unguarded(div_id(), |_| Ok(Value::Unit));
        assert!(matches!(
            op.call(vec![1.into()]),
            Err(CallError::Binding(dbc_core::CoreError::ArityMismatch { .. }))
        ));
    }

    #[test]
    fn invariants_run_at_entry_and_exit() {
        let checks = Arc::new(AtomicUsize::new(0));
        let seen = checks.clone();
        let record = ContractBuilder::new(div_id())
            .invariant("counted", move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(true)
            })
            .finalize()
            .unwrap();
        let op = GuardedOperation::new(Arc::new(record), |_| Ok(Value::Unit))
            .bind_to(state(Enablement::ALL));
        op.call(vec![1.into(), 2.into()]).unwrap();
        assert_eq!(checks.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn traced_call_turns_a_body_panic_into_an_error() {
        let op = GuardedOperation::unguarded(div_id(), |a| {
            Ok(Value::Int(a.int("a")? / a.int("b")?))
        });

        let traced = op.call_traced(Enablement::ALL, vec![1.into(), 0.into()]);
        let err = traced.result.unwrap_err();
        let op_err = err.operation_error().unwrap();
        assert_eq!(op_err.kind, PANIC);
        assert!(op_err.message.contains("divide by zero"));
        assert_eq!(
            traced.phases,
            vec![CallPhase::Entry, CallPhase::PreChecked, CallPhase::Executing, CallPhase::Failed]
        );

        let untraced = panic::catch_unwind(AssertUnwindSafe(|| {
            op.call_with(Enablement::ALL, vec![1.into(), 0.into()])
        }));
        assert!(untraced.is_err(), "plain calls keep propagating panics");
    }
}
