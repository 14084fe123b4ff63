//! Contract records and the builder that assembles them.
//!
//! A [`ContractBuilder`] accumulates one [`Attachment`] per annotation step.
//! Order within a kind is preserved exactly as declared: conditions are
//! combined by conjunction, and the first failing clause in declaration order
//! is the one reported. [`ContractBuilder::finalize`] freezes the result into
//! an immutable [`ContractRecord`].

use std::collections::BTreeSet;

use dbc_core::{Args, CoreError, OperationId, Value};
use serde::{Deserialize, Serialize};

use super::condition::{Condition, ConditionResult, PostCondition};

/// Which verbal description an attachment sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DescriptionKind {
    Specification,
    Pre,
    Post,
    Invariant,
}

/// Human-readable descriptions. Pure metadata; never evaluated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptions {
    pub specification: Option<String>,
    pub pre: Option<String>,
    pub post: Option<String>,
    pub invariant: Option<String>,
}

impl Descriptions {
    fn set(&mut self, kind: DescriptionKind, text: String) {
        let slot = match kind {
            DescriptionKind::Specification => &mut self.specification,
            DescriptionKind::Pre => &mut self.pre,
            DescriptionKind::Post => &mut self.post,
            DescriptionKind::Invariant => &mut self.invariant,
        };
        *slot = Some(text);
    }
}

/// One builder step.
#[derive(Debug, Clone)]
pub enum Attachment {
    Precondition(Condition),
    Postcondition(PostCondition),
    Invariant(Condition),
    /// Error kinds the operation is documented to raise.
    Raises(Vec<String>),
    Description(DescriptionKind, String),
}

/// The finalized contract of one operation.
#[derive(Debug, Clone)]
pub struct ContractRecord {
    operation: OperationId,
    preconditions: Vec<Condition>,
    postconditions: Vec<PostCondition>,
    invariants: Vec<Condition>,
    raises: BTreeSet<String>,
    descriptions: Descriptions,
}

impl ContractRecord {
    /// A record with no clauses. Guarding an operation with it is a passthrough.
    pub fn empty(operation: OperationId) -> Self {
        ContractRecord {
            operation,
            preconditions: Vec::new(),
            postconditions: Vec::new(),
            invariants: Vec::new(),
            raises: BTreeSet::new(),
            descriptions: Descriptions::default(),
        }
    }

    pub fn operation(&self) -> &OperationId {
        &self.operation
    }

    pub fn preconditions(&self) -> &[Condition] {
        &self.preconditions
    }

    pub fn postconditions(&self) -> &[PostCondition] {
        &self.postconditions
    }

    pub fn invariants(&self) -> &[Condition] {
        &self.invariants
    }

    pub fn raises(&self) -> &BTreeSet<String> {
        &self.raises
    }

    pub fn descriptions(&self) -> &Descriptions {
        &self.descriptions
    }

    /// Whether `kind` is in the declared error set.
    pub fn declares(&self, kind: &str) -> bool {
        self.raises.contains(kind)
    }

    /// True when there is nothing to evaluate around a call.
    pub fn has_no_conditions(&self) -> bool {
        self.preconditions.is_empty()
            && self.postconditions.is_empty()
            && self.invariants.is_empty()
    }

    /// Serializable view of the record, with condition texts in declaration order.
    pub fn summary(&self) -> ContractSummary {
        ContractSummary {
            operation: self.operation.clone(),
            preconditions: self.preconditions.iter().map(|c| c.text().to_string()).collect(),
            postconditions: self.postconditions.iter().map(|c| c.text().to_string()).collect(),
            invariants: self.invariants.iter().map(|c| c.text().to_string()).collect(),
            raises: self.raises.iter().cloned().collect(),
            descriptions: self.descriptions.clone(),
        }
    }
}

/// Serializable contract metadata (conditions rendered as text).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractSummary {
    pub operation: OperationId,
    pub preconditions: Vec<String>,
    pub postconditions: Vec<String>,
    pub invariants: Vec<String>,
    pub raises: Vec<String>,
    pub descriptions: Descriptions,
}

/// Incremental builder for a [`ContractRecord`].
///
/// ```ignore
/// let record = ContractBuilder::new(div_id)
///     .specification("Divides two integers")
///     .precondition("b != 0", |args| Ok(args.int("b")? != 0))
///     .postcondition("result == a / b", |args, r| {
///         Ok(r.as_int() == Some(args.int("a")? / args.int("b")?))
///     })
///     .raises(["ZeroDivision"])
///     .finalize()?;
/// ```
#[derive(Debug, Clone)]
pub struct ContractBuilder {
    record: ContractRecord,
}

impl ContractBuilder {
    pub fn new(operation: OperationId) -> Self {
        ContractBuilder {
            record: ContractRecord::empty(operation),
        }
    }

    pub fn operation(&self) -> &OperationId {
        &self.record.operation
    }

    /// Applies one attachment. Conditions append; descriptions overwrite;
    /// raised kinds union into the declared set.
    pub fn attach(&mut self, attachment: Attachment) -> Result<(), CoreError> {
        if let Attachment::Raises(kinds) = &attachment {
            self.check_kinds(kinds.iter())?;
        }
        self.apply(attachment);
        Ok(())
    }

    pub fn precondition<F>(self, text: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Args) -> ConditionResult + Send + Sync + 'static,
    {
        self.step(Attachment::Precondition(Condition::new(text, check)))
    }

    pub fn postcondition<F>(self, text: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Args, &Value) -> ConditionResult + Send + Sync + 'static,
    {
        self.step(Attachment::Postcondition(PostCondition::new(text, check)))
    }

    pub fn invariant<F>(self, text: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Args) -> ConditionResult + Send + Sync + 'static,
    {
        self.step(Attachment::Invariant(Condition::new(text, check)))
    }

    pub fn raises<I, S>(self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.step(Attachment::Raises(kinds.into_iter().map(Into::into).collect()))
    }

    pub fn specification(self, text: impl Into<String>) -> Self {
        self.step(Attachment::Description(DescriptionKind::Specification, text.into()))
    }

    pub fn pre_description(self, text: impl Into<String>) -> Self {
        self.step(Attachment::Description(DescriptionKind::Pre, text.into()))
    }

    pub fn post_description(self, text: impl Into<String>) -> Self {
        self.step(Attachment::Description(DescriptionKind::Post, text.into()))
    }

    pub fn invariant_description(self, text: impl Into<String>) -> Self {
        self.step(Attachment::Description(DescriptionKind::Invariant, text.into()))
    }

    /// Freezes the builder. Fails if any chained step declared an empty
    /// error kind.
    pub fn finalize(self) -> Result<ContractRecord, CoreError> {
        self.record.operation.validate()?;
        self.check_kinds(self.record.raises.iter())?;
        Ok(self.record)
    }

    // Chained steps defer validation to `finalize`.
    fn step(mut self, attachment: Attachment) -> Self {
        self.apply(attachment);
        self
    }

    fn apply(&mut self, attachment: Attachment) {
        match attachment {
            Attachment::Precondition(c) => self.record.preconditions.push(c),
            Attachment::Postcondition(c) => self.record.postconditions.push(c),
            Attachment::Invariant(c) => self.record.invariants.push(c),
            Attachment::Raises(kinds) => self.record.raises.extend(kinds),
            Attachment::Description(kind, text) => self.record.descriptions.set(kind, text),
        }
    }

    fn check_kinds<'a>(
        &self,
        mut kinds: impl Iterator<Item = &'a String>,
    ) -> Result<(), CoreError> {
        if kinds.any(|k| k.trim().is_empty()) {
            return Err(CoreError::EmptyExceptionKind {
                operation: self.record.operation.name.clone(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbc_core::ParamType;

    fn div_id() -> OperationId {
        OperationId::new("div")
            .param("a", ParamType::Int)
            .param("b", ParamType::Int)
    }

    #[test]
    fn builder_preserves_declaration_order_within_kind() {
        let record = ContractBuilder::new(div_id())
            .precondition("b != 0", |a| Ok(a.int("b")? != 0))
            .postcondition("result >= 0", |_, r| Ok(r.as_int().unwrap_or(0) >= 0))
            .precondition("a >= 0", |a| Ok(a.int("a")? >= 0))
            .finalize()
            .unwrap();

        let texts: Vec<&str> = record.preconditions().iter().map(|c| c.text()).collect();
        assert_eq!(texts, vec!["b != 0", "a >= 0"]);
        assert_eq!(record.postconditions().len(), 1);
        assert!(record.invariants().is_empty());
    }

    #[test]
    fn descriptions_and_raises_are_stored() {
        let record = ContractBuilder::new(div_id())
            .specification("Divides two integers")
            .pre_description("divisor cannot be zero")
            .post_description("integer quotient")
            .invariant_description("no shared state")
            .raises(["ZeroDivision", "Overflow"])
            .raises(["Overflow"])
            .finalize()
            .unwrap();

        let d = record.descriptions();
        assert_eq!(d.specification.as_deref(), Some("Divides two integers"));
        assert_eq!(d.pre.as_deref(), Some("divisor cannot be zero"));
        assert_eq!(d.post.as_deref(), Some("integer quotient"));
        assert_eq!(d.invariant.as_deref(), Some("no shared state"));
        assert!(record.declares("ZeroDivision"));
        assert!(!record.declares("ValueError"));
        assert_eq!(record.raises().len(), 2);
        assert!(record.has_no_conditions());
    }

    #[test]
    fn empty_exception_kind_is_rejected() {
        let err = ContractBuilder::new(div_id()).raises([""]).finalize().unwrap_err();
        assert_eq!(
            err,
            CoreError::EmptyExceptionKind {
                operation: "div".into()
            }
        );

        let mut builder = ContractBuilder::new(div_id());
        assert!(builder.attach(Attachment::Raises(vec!["  ".into()])).is_err());
    }

    #[test]
    fn repeated_parameter_names_fail_to_finalize() {
        let id = OperationId::new("f")
            .param("x", ParamType::Int)
            .param("x", ParamType::Float);
        let err = ContractBuilder::new(id)
            .precondition("x > 0", |a| Ok(a.int("x")? > 0))
            .finalize()
            .unwrap_err();
        assert!(matches!(err, CoreError::DuplicateParameter { name, .. } if name == "x"));
    }

    #[test]
    fn summary_renders_condition_texts() {
        let record = ContractBuilder::new(div_id())
            .precondition("b != 0", |a| Ok(a.int("b")? != 0))
            .invariant("true", |_| Ok(true))
            .finalize()
            .unwrap();
        let summary = record.summary();
        assert_eq!(summary.preconditions, vec!["b != 0".to_string()]);
        assert_eq!(summary.invariants, vec!["true".to_string()]);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["operation"]["name"], "div");
    }
}
