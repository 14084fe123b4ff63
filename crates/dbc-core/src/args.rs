//! Call arguments bound by parameter name.
//!
//! [`Args`] preserves declaration order (via `IndexMap`) so violations and
//! counterexamples render arguments the way the signature declares them.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::CoreError;
use crate::id::OperationId;
use crate::value::Value;

/// Errors from typed argument access.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArgError {
    #[error("missing argument '{name}'")]
    Missing { name: String },

    #[error("argument '{name}': expected {expected}, got {got}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        got: &'static str,
    },
}

/// Arguments of one call, keyed by parameter name in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Args {
    values: IndexMap<String, Value>,
}

impl Args {
    /// Binds positional values to the operation's parameter names.
    pub fn bind(operation: &OperationId, values: Vec<Value>) -> Result<Args, CoreError> {
        operation.validate()?;
        if values.len() != operation.arity() {
            return Err(CoreError::ArityMismatch {
                operation: operation.name.clone(),
                expected: operation.arity(),
                got: values.len(),
            });
        }
        let values = operation
            .param_names()
            .map(str::to_string)
            .zip(values)
            .collect();
        Ok(Args { values })
    }

    pub fn get(&self, name: &str) -> Result<&Value, ArgError> {
        self.values.get(name).ok_or_else(|| ArgError::Missing {
            name: name.to_string(),
        })
    }

    pub fn int(&self, name: &str) -> Result<i64, ArgError> {
        let value = self.get(name)?;
        value.as_int().ok_or_else(|| mismatch(name, "int", value))
    }

    pub fn float(&self, name: &str) -> Result<f64, ArgError> {
        let value = self.get(name)?;
        value.as_float().ok_or_else(|| mismatch(name, "float", value))
    }

    pub fn bool(&self, name: &str) -> Result<bool, ArgError> {
        let value = self.get(name)?;
        value.as_bool().ok_or_else(|| mismatch(name, "bool", value))
    }

    pub fn str(&self, name: &str) -> Result<&str, ArgError> {
        let value = self.get(name)?;
        value.as_str().ok_or_else(|| mismatch(name, "str", value))
    }

    pub fn seq(&self, name: &str) -> Result<&[Value], ArgError> {
        let value = self.get(name)?;
        value.as_seq().ok_or_else(|| mismatch(name, "seq", value))
    }

    /// Positional values in declaration order.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.values.values()
    }

    /// `(name, value)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Positional values, cloned. Used to replay a call.
    pub fn to_vec(&self) -> Vec<Value> {
        self.values.values().cloned().collect()
    }
}

// Display renders `name=value` pairs, e.g. `a=10, b=0`.
impl fmt::Display for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", name, value)?;
        }
        Ok(())
    }
}

fn mismatch(name: &str, expected: &'static str, got: &Value) -> ArgError {
    ArgError::TypeMismatch {
        name: name.to_string(),
        expected,
        got: got.type_name(),
    }
}
