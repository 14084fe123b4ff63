//! Operation identity: a name plus its ordered, typed parameter signature.
//!
//! Contracts are keyed by [`OperationId`]. Two operations with the same name
//! but different signatures are distinct identities, and the registry refuses
//! to merge attachments across them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Recognized semantic parameter types.
///
/// This is deliberately a small closed set: the generation driver falls back
/// to a generic sampler per variant instead of reflecting over arbitrary types.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParamType {
    Bool,
    Int,
    Float,
    Str,
    Seq(Box<ParamType>),
}

impl ParamType {
    /// Short human-readable name, used in diagnostics.
    pub fn name(&self) -> String {
        match self {
            ParamType::Bool => "bool".into(),
            ParamType::Int => "int".into(),
            ParamType::Float => "float".into(),
            ParamType::Str => "str".into(),
            ParamType::Seq(inner) => format!("seq<{}>", inner.name()),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Identity of an annotated operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationId {
    /// Operation name, unique within a registry.
    pub name: String,
    /// Named, typed parameters in declaration order.
    pub params: Vec<(String, ParamType)>,
}

impl OperationId {
    /// Creates an identity with no parameters. Use [`OperationId::param`] to
    /// extend the signature.
    pub fn new(name: impl Into<String>) -> Self {
        OperationId {
            name: name.into(),
            params: Vec::new(),
        }
    }

    /// Appends a parameter to the signature.
    pub fn param(mut self, name: impl Into<String>, ty: ParamType) -> Self {
        self.params.push((name.into(), ty));
        self
    }

    /// Number of declared parameters.
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Parameter names in declaration order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|(name, _)| name.as_str())
    }

    /// Rejects signatures that repeat a parameter name.
    pub fn validate(&self) -> Result<(), CoreError> {
        for (i, (name, _)) in self.params.iter().enumerate() {
            if self.params[..i].iter().any(|(earlier, _)| earlier == name) {
                return Err(CoreError::DuplicateParameter {
                    operation: self.name.clone(),
                    name: name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Position of a parameter by name.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|(n, _)| n == name)
    }
}

// Display renders the signature, e.g. `div(a: int, b: int)`.
impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, (name, ty)) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", name, ty)?;
        }
        f.write_str(")")
    }
}
