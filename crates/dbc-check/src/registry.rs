//! Contract registry: attach metadata per operation, finalize, look up.
//!
//! Records are built incrementally while an operation is being defined and
//! become immutable once finalized. Guarding an operation finalizes its
//! record; attaching anything afterwards is rejected with
//! [`CoreError::ContractFinalized`]. Lookups of finalized records are plain
//! `Arc` clones, so guarded calls never contend on registry state.

use std::sync::{Arc, OnceLock};

use dashmap::mapref::entry::{Entry, OccupiedEntry};
use dashmap::DashMap;
use dbc_core::{Args, CoreError, OperationId, Value};

use crate::contracts::record::{Attachment, ContractBuilder, ContractRecord};
use crate::engine::error::CallError;
use crate::engine::GuardedOperation;

#[derive(Debug)]
enum Slot {
    Building(ContractBuilder),
    Finalized(Arc<ContractRecord>),
}

impl Slot {
    fn operation(&self) -> &OperationId {
        match self {
            Slot::Building(b) => b.operation(),
            Slot::Finalized(r) => r.operation(),
        }
    }
}

/// Registry of contract records keyed by operation name.
#[derive(Debug, Default)]
pub struct ContractRegistry {
    slots: DashMap<String, Slot>,
}

impl ContractRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> &'static ContractRegistry {
        static GLOBAL: OnceLock<ContractRegistry> = OnceLock::new();
        GLOBAL.get_or_init(ContractRegistry::new)
    }

    /// Appends `attachment` to the record for `operation`, creating the
    /// record on first use.
    pub fn attach(&self, operation: &OperationId, attachment: Attachment) -> Result<(), CoreError> {
        match self.slots.entry(operation.name.clone()) {
            Entry::Occupied(mut occupied) => {
                check_signature(occupied.get().operation(), operation)?;
                match occupied.get_mut() {
                    Slot::Finalized(_) => Err(CoreError::ContractFinalized {
                        operation: operation.name.clone(),
                    }),
                    Slot::Building(builder) => builder.attach(attachment),
                }
            }
            Entry::Vacant(vacant) => {
                operation.validate()?;
                let mut builder = ContractBuilder::new(operation.clone());
                builder.attach(attachment)?;
                tracing::debug!(operation = %operation, "contract record created");
                vacant.insert(Slot::Building(builder));
                Ok(())
            }
        }
    }

    /// Registers a record built elsewhere. Fails if the name is taken.
    pub fn insert(&self, record: ContractRecord) -> Result<Arc<ContractRecord>, CoreError> {
        match self.slots.entry(record.operation().name.clone()) {
            Entry::Occupied(_) => Err(CoreError::AlreadyRegistered {
                operation: record.operation().name.clone(),
            }),
            Entry::Vacant(vacant) => {
                let record = Arc::new(record);
                vacant.insert(Slot::Finalized(Arc::clone(&record)));
                Ok(record)
            }
        }
    }

    /// Freezes the record for `name`. Idempotent.
    pub fn finalize(&self, name: &str) -> Result<Arc<ContractRecord>, CoreError> {
        match self.slots.entry(name.to_string()) {
            Entry::Occupied(occupied) => freeze(occupied),
            Entry::Vacant(_) => Err(CoreError::OperationNotFound {
                name: name.to_string(),
            }),
        }
    }

    /// The finalized record for `name`, or `None` when there is none (yet).
    pub fn lookup(&self, name: &str) -> Option<Arc<ContractRecord>> {
        self.slots.get(name).and_then(|slot| match &*slot {
            Slot::Finalized(record) => Some(Arc::clone(record)),
            Slot::Building(_) => None,
        })
    }

    /// Whether any attachment was ever made for `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Finalizes the record for `operation` (an empty one if nothing was
    /// attached) and wraps `body` with it.
    pub fn guard<F>(&self, operation: &OperationId, body: F) -> Result<GuardedOperation, CoreError>
    where
        F: Fn(&Args) -> Result<Value, CallError> + Send + Sync + 'static,
    {
        Ok(GuardedOperation::new(self.seal(operation)?, body))
    }

    /// Like [`guard`](Self::guard) for bodies that recurse through the engine.
    pub fn guard_recursive<F>(
        &self,
        operation: &OperationId,
        body: F,
    ) -> Result<GuardedOperation, CoreError>
    where
        F: Fn(&GuardedOperation, &Args) -> Result<Value, CallError> + Send + Sync + 'static,
    {
        Ok(GuardedOperation::recursive(self.seal(operation)?, body))
    }

    // Finalizes the record for `operation`, creating an empty one when
    // nothing was attached so that later attachments are rejected too.
    fn seal(&self, operation: &OperationId) -> Result<Arc<ContractRecord>, CoreError> {
        match self.slots.entry(operation.name.clone()) {
            Entry::Occupied(occupied) => {
                check_signature(occupied.get().operation(), operation)?;
                freeze(occupied)
            }
            Entry::Vacant(vacant) => {
                operation.validate()?;
                let record = Arc::new(ContractRecord::empty(operation.clone()));
                vacant.insert(Slot::Finalized(Arc::clone(&record)));
                Ok(record)
            }
        }
    }
}

fn freeze(mut occupied: OccupiedEntry<'_, String, Slot>) -> Result<Arc<ContractRecord>, CoreError> {
    let record = match occupied.get() {
        Slot::Finalized(record) => return Ok(Arc::clone(record)),
        Slot::Building(builder) => Arc::new(builder.clone().finalize()?),
    };
    tracing::debug!(
        operation = %record.operation(),
        preconditions = record.preconditions().len(),
        postconditions = record.postconditions().len(),
        invariants = record.invariants().len(),
        "contract finalized"
    );
    occupied.insert(Slot::Finalized(Arc::clone(&record)));
    Ok(record)
}

fn check_signature(registered: &OperationId, attached: &OperationId) -> Result<(), CoreError> {
    if registered != attached {
        return Err(CoreError::SignatureMismatch {
            operation: attached.name.clone(),
            registered: registered.to_string(),
            attached: attached.to_string(),
        });
    }
    Ok(())
}
