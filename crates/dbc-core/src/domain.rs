//! Declared parameter domains for input generation.
//!
//! A [`Domain`] describes the semantic space a parameter ranges over. Domains
//! are supplied explicitly alongside a contract; [`Domain::for_type`] is the
//! generic fallback for the recognized [`ParamType`]s.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::id::ParamType;
use crate::value::Value;

/// Alphabet used when a string domain is inferred from its type alone.
pub const DEFAULT_ALPHABET: &str = "abcxyzABC019 _-";

/// Maximum string/sequence length when inferred from type alone.
pub const DEFAULT_MAX_LEN: usize = 8;

/// Float range when inferred from type alone.
pub const DEFAULT_FLOAT_BOUND: f64 = 1e12;

/// Semantic domain of one parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Domain {
    Bool,
    /// Inclusive integer range.
    Int { min: i64, max: i64 },
    /// Inclusive float range; only finite values are members.
    Float { min: f64, max: f64 },
    /// Strings over a character class, up to `max_len` characters.
    Str { alphabet: String, max_len: usize },
    /// Sequences of `element`, up to `max_len` items.
    Seq { element: Box<Domain>, max_len: usize },
    /// An explicit enumerated set.
    OneOf(Vec<Value>),
}

impl Domain {
    pub fn int(min: i64, max: i64) -> Domain {
        Domain::Int { min, max }
    }

    pub fn float(min: f64, max: f64) -> Domain {
        Domain::Float { min, max }
    }

    pub fn seq(element: Domain, max_len: usize) -> Domain {
        Domain::Seq {
            element: Box::new(element),
            max_len,
        }
    }

    /// Generic domain for a recognized semantic type.
    pub fn for_type(ty: &ParamType) -> Domain {
        match ty {
            ParamType::Bool => Domain::Bool,
            ParamType::Int => Domain::int(i64::MIN, i64::MAX),
            ParamType::Float => Domain::float(-DEFAULT_FLOAT_BOUND, DEFAULT_FLOAT_BOUND),
            ParamType::Str => Domain::Str {
                alphabet: DEFAULT_ALPHABET.to_string(),
                max_len: DEFAULT_MAX_LEN,
            },
            ParamType::Seq(inner) => Domain::seq(Domain::for_type(inner), DEFAULT_MAX_LEN),
        }
    }

    /// Rejects domains that cannot produce any value.
    pub fn validate(&self) -> Result<(), CoreError> {
        match self {
            Domain::Bool => Ok(()),
            Domain::Int { min, max } if min > max => Err(CoreError::InvalidDomain {
                reason: format!("int range {}..={} is empty", min, max),
            }),
            Domain::Int { .. } => Ok(()),
            Domain::Float { min, max } => {
                if !min.is_finite() || !max.is_finite() || min > max {
                    Err(CoreError::InvalidDomain {
                        reason: format!("float range {}..={} is empty or unbounded", min, max),
                    })
                } else {
                    Ok(())
                }
            }
            Domain::Str { alphabet, max_len } => {
                if alphabet.is_empty() && *max_len > 0 {
                    Err(CoreError::InvalidDomain {
                        reason: "string alphabet is empty".into(),
                    })
                } else {
                    Ok(())
                }
            }
            Domain::Seq { element, .. } => element.validate(),
            Domain::OneOf(values) if values.is_empty() => Err(CoreError::InvalidDomain {
                reason: "enumerated domain has no values".into(),
            }),
            Domain::OneOf(_) => Ok(()),
        }
    }

    /// Membership test.
    pub fn contains(&self, value: &Value) -> bool {
        match (self, value) {
            (Domain::Bool, Value::Bool(_)) => true,
            (Domain::Int { min, max }, Value::Int(v)) => min <= v && v <= max,
            (Domain::Float { min, max }, Value::Float(v)) => {
                v.is_finite() && *min <= *v && *v <= *max
            }
            (Domain::Str { alphabet, max_len }, Value::Str(s)) => {
                s.chars().count() <= *max_len && s.chars().all(|c| alphabet.contains(c))
            }
            (Domain::Seq { element, max_len }, Value::Seq(items)) => {
                items.len() <= *max_len && items.iter().all(|v| element.contains(v))
            }
            (Domain::OneOf(values), v) => values.contains(v),
            _ => false,
        }
    }
}
