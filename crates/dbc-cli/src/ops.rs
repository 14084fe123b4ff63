//! Bundled operations the `dbc` binary exercises.
//!
//! Each operation is registered with a [`ContractRegistry`] and guarded the
//! same way an embedding application would do it. `clamp_buggy` carries the
//! same contract as `clamp` with the upper clamp left out, so the driver has
//! something to find.

use std::sync::{Arc, Mutex};

use dbc_check::{
    Attachment, CallError, Condition, ConditionError, ContractBuilder, ContractRegistry,
    DescriptionKind, GuardedOperation, OperationError, PostCondition,
};
use dbc_core::{CoreError, Domain, OperationId, ParamType, Value};

/// A guarded operation plus the domains the driver should probe it with
/// (`None` infers them from the parameter types).
pub struct Bundled {
    pub name: &'static str,
    pub operation: GuardedOperation,
    pub domains: Option<Vec<Domain>>,
}

/// Registers and guards every bundled operation.
pub fn register(registry: &ContractRegistry) -> Result<Vec<Bundled>, CoreError> {
    Ok(vec![
        Bundled {
            name: "div",
            operation: div(registry)?,
            domains: None,
        },
        Bundled {
            name: "clamp",
            operation: clamp(registry, "clamp", false)?,
            domains: Some(vec![Domain::int(-50, 50); 3]),
        },
        Bundled {
            name: "clamp_buggy",
            operation: clamp(registry, "clamp_buggy", true)?,
            domains: Some(vec![Domain::int(-50, 50); 3]),
        },
        Bundled {
            name: "sqrt",
            operation: sqrt(registry)?,
            domains: None,
        },
        Bundled {
            name: "fact",
            operation: fact(registry)?,
            domains: Some(vec![Domain::int(-3, 25)]),
        },
    ])
}

/// Looks up `name`, or its `_buggy` variant when `buggy` is set.
pub fn find<'a>(ops: &'a [Bundled], name: &str, buggy: bool) -> Option<&'a Bundled> {
    let wanted = if buggy {
        format!("{}_buggy", name)
    } else {
        name.to_string()
    };
    ops.iter().find(|b| b.name == wanted)
}

/// Division rounding toward negative infinity; `None` on overflow or b == 0.
fn floor_div(a: i64, b: i64) -> Option<i64> {
    let q = a.checked_div(b)?;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        q.checked_sub(1)
    } else {
        Some(q)
    }
}

fn div(registry: &ContractRegistry) -> Result<GuardedOperation, CoreError> {
    let id = OperationId::new("div")
        .param("a", ParamType::Int)
        .param("b", ParamType::Int);

    for attachment in [
        Attachment::Description(
            DescriptionKind::Specification,
            "integer division rounding toward negative infinity".into(),
        ),
        Attachment::Description(DescriptionKind::Pre, "the divisor must not be zero".into()),
        Attachment::Description(
            DescriptionKind::Post,
            "the result is the floor of a / b".into(),
        ),
        Attachment::Raises(vec!["ZeroDivisionError".into(), "OverflowError".into()]),
        Attachment::Precondition(Condition::new("b != 0", |a| Ok(a.int("b")? != 0))),
        Attachment::Postcondition(PostCondition::new("result == floor(a / b)", |a, r| {
            Ok(r.as_int().is_some() && r.as_int() == floor_div(a.int("a")?, a.int("b")?))
        })),
    ] {
        registry.attach(&id, attachment)?;
    }

    registry.guard(&id, |args| {
        let (a, b) = (args.int("a")?, args.int("b")?);
        if b == 0 {
            return Err(OperationError::new("ZeroDivisionError", "integer division by zero").into());
        }
        floor_div(a, b).map(Value::Int).ok_or_else(|| {
            OperationError::new("OverflowError", format!("{} / {} overflows", a, b)).into()
        })
    })
}

fn clamp(
    registry: &ContractRegistry,
    name: &'static str,
    buggy: bool,
) -> Result<GuardedOperation, CoreError> {
    let id = OperationId::new(name)
        .param("x", ParamType::Int)
        .param("lo", ParamType::Int)
        .param("hi", ParamType::Int);
    let record = ContractBuilder::new(id)
        .specification("limit x to the closed interval [lo, hi]")
        .precondition("lo <= hi", |a| Ok(a.int("lo")? <= a.int("hi")?))
        .postcondition("lo <= result <= hi", |a, r| {
            let r = r
                .as_int()
                .ok_or_else(|| ConditionError::msg("clamp returned a non-integer"))?;
            Ok(a.int("lo")? <= r && r <= a.int("hi")?)
        })
        .postcondition("result == x when lo <= x <= hi", |a, r| {
            let x = a.int("x")?;
            Ok(!(a.int("lo")? <= x && x <= a.int("hi")?) || r.as_int() == Some(x))
        })
        .finalize()?;

    Ok(GuardedOperation::new(registry.insert(record)?, move |args| {
        let (x, lo, hi) = (args.int("x")?, args.int("lo")?, args.int("hi")?);
        let clamped = if buggy { x.max(lo) } else { x.max(lo).min(hi) };
        Ok(Value::Int(clamped))
    }))
}

fn sqrt(registry: &ContractRegistry) -> Result<GuardedOperation, CoreError> {
    let id = OperationId::new("sqrt").param("x", ParamType::Float);
    let record = ContractBuilder::new(id)
        .specification("square root of a non-negative number")
        .pre_description("x must be non-negative")
        .post_description("result squared is x, within rounding")
        .precondition("x >= 0", |a| Ok(a.float("x")? >= 0.0))
        .postcondition("result >= 0", |_, r| Ok(r.as_float().map_or(false, |v| v >= 0.0)))
        .postcondition("abs(result * result - x) <= 1e-9 * max(1, x)", |a, r| {
            let x = a.float("x")?;
            let r = r
                .as_float()
                .ok_or_else(|| ConditionError::msg("sqrt returned a non-float"))?;
            Ok((r * r - x).abs() <= 1e-9 * x.max(1.0))
        })
        .finalize()?;

    Ok(GuardedOperation::new(registry.insert(record)?, |_| {
        Err(OperationError::implement_this("sqrt is specified but not written yet").into())
    }))
}

fn fact(registry: &ContractRegistry) -> Result<GuardedOperation, CoreError> {
    let id = OperationId::new("fact").param("n", ParamType::Int);
    // memo[k] == k!
    let memo: Arc<Mutex<Vec<i64>>> = Arc::new(Mutex::new(vec![1, 1]));

    let table = Arc::clone(&memo);
    let record = ContractBuilder::new(id)
        .specification("factorial, memoized across calls")
        .invariant_description("every memoized entry is k times its predecessor")
        .precondition("n >= 0", |a| Ok(a.int("n")? >= 0))
        .precondition("n <= 20", |a| Ok(a.int("n")? <= 20))
        .postcondition("result >= 1", |_, r| Ok(r.as_int().map_or(false, |v| v >= 1)))
        .invariant("memo[k] == k * memo[k - 1]", move |_| {
            let memo = table
                .lock()
                .map_err(|_| ConditionError::msg("memo table poisoned"))?;
            Ok(memo.first() == Some(&1)
                && memo
                    .windows(2)
                    .enumerate()
                    .all(|(k, w)| w[1] == (k as i64 + 1) * w[0]))
        })
        .finalize()?;

    Ok(GuardedOperation::recursive(registry.insert(record)?, move |this, args| {
        let n = args.int("n")?;
        let known = {
            let memo = memo.lock().map_err(poisoned)?;
            usize::try_from(n).ok().and_then(|i| memo.get(i).copied())
        };
        if let Some(v) = known {
            return Ok(Value::Int(v));
        }
        if n <= 1 {
            return Ok(Value::Int(1));
        }

        let rest = this
            .call(vec![(n - 1).into()])?
            .as_int()
            .ok_or_else(|| OperationError::new("TypeError", "fact returned a non-integer"))?;
        let value = n
            .checked_mul(rest)
            .ok_or_else(|| OperationError::new("OverflowError", format!("{}! overflows", n)))?;

        let mut memo = memo.lock().map_err(poisoned)?;
        if memo.len() as i64 == n {
            memo.push(value);
        }
        Ok(Value::Int(value))
    }))
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> CallError {
    OperationError::new("InternalError", "memo table poisoned").into()
}
