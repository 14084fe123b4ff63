//! The process-wide enablement switch.
//!
//! Lives in its own test binary because it mutates global state. The tests
//! below still serialize on a mutex so they cannot interleave.

use std::sync::Mutex;

use dbc_check::{
    contracts_enabled, disable_contracts, enable_contracts, ContractKind, ContractRegistry,
    EnablementState, OperationError,
};
use dbc_core::{OperationId, ParamType, Value};

static GLOBAL_LOCK: Mutex<()> = Mutex::new(());

fn sqrt_id() -> OperationId {
    OperationId::new("sqrt").param("x", ParamType::Float)
}

#[test]
fn toggling_takes_effect_on_the_next_call() {
    let _guard = GLOBAL_LOCK.lock().unwrap();
    let registry = ContractRegistry::new();
    registry
        .attach(
            &sqrt_id(),
            dbc_check::Attachment::Precondition(dbc_check::Condition::new("x >= 0", |a| {
                Ok(a.float("x")? >= 0.0)
            })),
        )
        .unwrap();
    let sqrt = registry
        .guard(&sqrt_id(), |a| Ok(Value::Float(a.float("x")?.sqrt())))
        .unwrap();

    enable_contracts();
    assert!(contracts_enabled());
    let err = sqrt.call(vec![(-4.0).into()]).unwrap_err();
    assert_eq!(err.violation_kind(), Some(ContractKind::Precondition));

    disable_contracts();
    assert!(!contracts_enabled());
    let nan = sqrt.call(vec![(-4.0).into()]).unwrap();
    assert!(nan.as_float().map_or(false, f64::is_nan));
}

#[test]
fn per_kind_toggles_on_the_global_state() {
    let _guard = GLOBAL_LOCK.lock().unwrap();
    let registry = ContractRegistry::new();
    let id = sqrt_id();
    registry
        .attach(
            &id,
            dbc_check::Attachment::Postcondition(dbc_check::PostCondition::new(
                "result >= 0",
                |_, r| Ok(r.as_float().map_or(false, |v| v >= 0.0)),
            )),
        )
        .unwrap();
    registry.attach(&id, dbc_check::Attachment::Raises(vec!["ImplementThis".into()])).unwrap();
    let negated = registry.guard(&id, |a| Ok(Value::Float(-a.float("x")?))).unwrap();

    let global = EnablementState::global();
    global.disable();
    global.enable_kind(ContractKind::Precondition);
    assert!(contracts_enabled());
    assert_eq!(negated.call(vec![4.0.into()]), Ok(Value::Float(-4.0)));

    global.enable_kind(ContractKind::Postcondition);
    assert!(negated.call(vec![4.0.into()]).is_err());

    global.disable();
    let stub = registry
        .guard(&OperationId::new("later"), |_| {
            Err(OperationError::implement_this("not written yet").into())
        })
        .unwrap();
    assert!(stub.call(vec![]).unwrap_err().operation_error().unwrap().is_unimplemented());
}
