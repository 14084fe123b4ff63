//! Integration tests for contract enforcement around guarded calls.
//!
//! Every guarded operation here is bound to its own leaked
//! `EnablementState`, so tests running in parallel never see each other's
//! enablement changes. The process-wide switch is covered in `global.rs`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use proptest::prelude::*;

use dbc_check::contracts::condition::ConditionResult;
use dbc_check::{
    CallError, ContractBuilder, ContractKind, ContractRegistry, Enablement, EnablementState,
    GuardedOperation, OperationError,
};
use dbc_core::{Args, OperationId, ParamType, Value};

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

fn state(mode: Enablement) -> &'static EnablementState {
    Box::leak(Box::new(EnablementState::new(mode)))
}

fn div_id() -> OperationId {
    OperationId::new("div")
        .param("a", ParamType::Int)
        .param("b", ParamType::Int)
}

fn floor_div(a: i64, b: i64) -> Result<Value, CallError> {
    if b == 0 {
        return Err(OperationError::new("ZeroDivisionError", "integer division by zero").into());
    }
    Ok(Value::Int(a.div_euclid(b)))
}

/// `div` with a postcondition that is deliberately off by one.
fn div_with_wrong_post(state: &'static EnablementState) -> (GuardedOperation, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    let record = ContractBuilder::new(div_id())
        .specification("integer division")
        .pre_description("divisor must be non-zero")
        .precondition("b != 0", |a| Ok(a.int("b")? != 0))
        .postcondition("result == a // b + 1", |a, r| {
            Ok(r.as_int() == Some(a.int("a")?.div_euclid(a.int("b")?) + 1))
        })
        .raises(["ZeroDivisionError"])
        .finalize()
        .unwrap();
    let op = GuardedOperation::new(Arc::new(record), move |a| {
        seen.fetch_add(1, Ordering::SeqCst);
        floor_div(a.int("a")?, a.int("b")?)
    })
    .bind_to(state);
    (op, calls)
}

// ---------------------------------------------------------------------------
// Call state machine
// ---------------------------------------------------------------------------

#[test]
fn failing_precondition_never_runs_the_body() {
    let (op, calls) = div_with_wrong_post(state(Enablement::ALL));
    let err = op.call(vec![1.into(), 0.into()]).unwrap_err();

    let violation = err.violation().unwrap();
    assert_eq!(violation.kind, ContractKind::Precondition);
    assert_eq!(violation.condition, "b != 0");
    assert_eq!(violation.description.as_deref(), Some("divisor must be non-zero"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(err.to_string().starts_with("PreconditionViolation in div"));
}

#[test]
fn wrong_postcondition_is_reported_with_result() {
    let (op, calls) = div_with_wrong_post(state(Enablement::ALL));
    let err = op.call(vec![7.into(), 2.into()]).unwrap_err();

    let violation = err.violation().unwrap();
    assert_eq!(violation.kind, ContractKind::Postcondition);
    assert_eq!(violation.result, Some(Value::Int(3)));
    assert_eq!(violation.arguments.int("a"), Ok(7));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn disabled_contracts_return_the_body_result() {
    let (op, calls) = div_with_wrong_post(state(Enablement::NONE));
    assert_eq!(op.call(vec![7.into(), 2.into()]), Ok(Value::Int(3)));
    assert_eq!(op.call(vec![(-7).into(), 2.into()]), Ok(Value::Int(-4)));

    // the body's own error surfaces unchanged when the precondition is not checked
    let err = op.call(vec![1.into(), 0.into()]).unwrap_err();
    assert_eq!(err.operation_error().map(|e| e.kind.as_str()), Some("ZeroDivisionError"));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn forced_mode_overrides_bound_state_for_one_call() {
    let (op, _) = div_with_wrong_post(state(Enablement::NONE));
    assert!(op.call_with(Enablement::ALL, vec![7.into(), 2.into()]).is_err());
    assert_eq!(op.call(vec![7.into(), 2.into()]), Ok(Value::Int(3)));
}

type Log = Arc<Mutex<Vec<&'static str>>>;

fn logged(name: &'static str, log: &Log) -> impl Fn(&Args) -> ConditionResult + Send + Sync {
    let log = Arc::clone(log);
    move |_: &Args| {
        log.lock().unwrap().push(name);
        Ok(true)
    }
}

#[test]
fn clauses_are_checked_in_declaration_order() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let post_log = Arc::clone(&log);
    let record = ContractBuilder::new(div_id())
        .invariant("inv", logged("inv", &log))
        .precondition("first", logged("pre1", &log))
        .precondition("second", logged("pre2", &log))
        .postcondition("post", move |_, _| {
            post_log.lock().unwrap().push("post");
            Ok(true)
        })
        .finalize()
        .unwrap();
    let op = GuardedOperation::new(Arc::new(record), |_| Ok(Value::Unit))
        .bind_to(state(Enablement::ALL));

    op.call(vec![1.into(), 1.into()]).unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["inv", "pre1", "pre2", "post", "inv"]);
}

#[test]
fn recursive_calls_check_invariants_at_every_crossing() {
    let id = OperationId::new("fact").param("n", ParamType::Int);
    let invocations = Arc::new(AtomicUsize::new(0));
    let checks = Arc::new(AtomicUsize::new(0));

    let seen = Arc::clone(&checks);
    let record = ContractBuilder::new(id)
        .precondition("n >= 0", |a| Ok(a.int("n")? >= 0))
        .postcondition("result >= 1", |_, r| Ok(r.as_int().map_or(false, |v| v >= 1)))
        .invariant("counted", move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(true)
        })
        .finalize()
        .unwrap();

    let counted = Arc::clone(&invocations);
    let fact = GuardedOperation::recursive(Arc::new(record), move |this, a| {
        counted.fetch_add(1, Ordering::SeqCst);
        let n = a.int("n")?;
        if n <= 1 {
            return Ok(Value::Int(1));
        }
        let rest = this.call(vec![(n - 1).into()])?;
        Ok(Value::Int(n * rest.as_int().unwrap_or(0)))
    })
    .bind_to(state(Enablement::ALL));

    assert_eq!(fact.call(vec![5.into()]), Ok(Value::Int(120)));
    assert_eq!(invocations.load(Ordering::SeqCst), 5);
    assert_eq!(checks.load(Ordering::SeqCst), 10);
}

#[test]
fn nested_violation_propagates_out_of_outer_call() {
    let registry = ContractRegistry::new();
    let inner_id = OperationId::new("reciprocal").param("x", ParamType::Int);
    let record = ContractBuilder::new(inner_id.clone())
        .precondition("x != 0", |a| Ok(a.int("x")? != 0))
        .finalize()
        .unwrap();
    let inner = Arc::new(
        GuardedOperation::new(registry.insert(record).unwrap(), |a| {
            Ok(Value::Float(1.0 / a.int("x")? as f64))
        })
        .bind_to(state(Enablement::ALL)),
    );

    let outer_id = OperationId::new("shifted").param("x", ParamType::Int);
    let callee = Arc::clone(&inner);
    let outer = registry
        .guard(&outer_id, move |a| callee.call(vec![(a.int("x")? - 1).into()]))
        .unwrap()
        .bind_to(state(Enablement::ALL));

    let err = outer.call(vec![1.into()]).unwrap_err();
    let violation = err.violation().unwrap();
    assert_eq!(violation.operation, inner_id);
    assert_eq!(violation.kind, ContractKind::Precondition);
}

#[test]
fn late_attachment_after_guarding_is_rejected() {
    let registry = ContractRegistry::new();
    let id = div_id();
    registry
        .attach(
            &id,
            dbc_check::Attachment::Precondition(dbc_check::Condition::new("b != 0", |a| {
                Ok(a.int("b")? != 0)
            })),
        )
        .unwrap();
    let _op = registry
        .guard(&id, |a| floor_div(a.int("a")?, a.int("b")?))
        .unwrap();
    assert!(registry
        .attach(&id, dbc_check::Attachment::Raises(vec!["ZeroDivisionError".into()]))
        .is_err());
    assert_eq!(registry.lookup("div").unwrap().preconditions().len(), 1);
}

// ---------------------------------------------------------------------------
// Passthrough property
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn disabled_guard_is_observationally_the_bare_body(
        a in -1_000_000i64..1_000_000,
        b in -1_000i64..1_000,
    ) {
        let evaluated = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&evaluated);
        let seen_post = Arc::clone(&evaluated);
        let record = ContractBuilder::new(div_id())
            .precondition("counted", move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(false)
            })
            .postcondition("counted", move |_, _| {
                seen_post.fetch_add(1, Ordering::SeqCst);
                Ok(false)
            })
            .finalize()
            .unwrap();
        let op = GuardedOperation::new(Arc::new(record), |a| floor_div(a.int("a")?, a.int("b")?))
            .bind_to(state(Enablement::NONE));

        prop_assert_eq!(op.call(vec![a.into(), b.into()]), floor_div(a, b));
        prop_assert_eq!(evaluated.load(Ordering::SeqCst), 0);
    }
}
