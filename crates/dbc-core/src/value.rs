//! Runtime value representation for guarded operations.
//!
//! [`Value`] is the dynamic counterpart of [`ParamType`]. Arguments flow into
//! guarded operations as values, results come back as values, and the
//! generation driver synthesizes values from parameter domains.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::id::ParamType;

/// A runtime value consumed or produced by a guarded operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Homogeneous sequence; element type is not tracked at runtime.
    Seq(Vec<Value>),
    Unit,
}

impl Value {
    /// Returns a human-readable description of the value's type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Seq(_) => "seq",
            Value::Unit => "unit",
        }
    }

    /// Whether this value inhabits the given semantic type.
    ///
    /// Sequence elements are checked recursively; an empty sequence matches
    /// any `Seq` type.
    pub fn matches(&self, ty: &ParamType) -> bool {
        match (self, ty) {
            (Value::Bool(_), ParamType::Bool) => true,
            (Value::Int(_), ParamType::Int) => true,
            (Value::Float(_), ParamType::Float) => true,
            (Value::Str(_), ParamType::Str) => true,
            (Value::Seq(items), ParamType::Seq(inner)) => items.iter().all(|v| v.matches(inner)),
            _ => false,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[Value]> {
        match self {
            Value::Seq(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{:?}", v),
            Value::Str(v) => write!(f, "{:?}", v),
            Value::Seq(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Value::Unit => f.write_str("()"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Seq(v.into_iter().map(Into::into).collect())
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Unit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_checks_nested_sequences() {
        let ints = Value::from(vec![1i64, 2, 3]);
        assert!(ints.matches(&ParamType::Seq(Box::new(ParamType::Int))));
        assert!(!ints.matches(&ParamType::Seq(Box::new(ParamType::Str))));
        assert!(Value::Seq(vec![]).matches(&ParamType::Seq(Box::new(ParamType::Bool))));
        assert!(!Value::Int(1).matches(&ParamType::Float));
    }

    #[test]
    fn display_is_compact() {
        assert_eq!(Value::Int(-3).to_string(), "-3");
        assert_eq!(Value::Float(1.0).to_string(), "1.0");
        assert_eq!(Value::from("ab").to_string(), "\"ab\"");
        assert_eq!(Value::from(vec![1i64, 2]).to_string(), "[1, 2]");
        assert_eq!(Value::Unit.to_string(), "()");
    }

    #[test]
    fn accessors_are_variant_specific() {
        assert_eq!(Value::Int(4).as_int(), Some(4));
        assert_eq!(Value::Int(4).as_float(), None);
        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert_eq!(Value::from("x").as_str(), Some("x"));
        assert_eq!(Value::from(vec![true]).as_seq().map(|s| s.len()), Some(1));
    }

    #[test]
    fn serde_roundtrip() {
        let v = Value::Seq(vec![Value::Int(1), Value::Str("a".into()), Value::Unit]);
        let json = serde_json::to_string(&v).unwrap();
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v, back);
    }
}
