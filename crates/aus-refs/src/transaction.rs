//! Batched reference updates over a store that only offers single-ref
//! operations.
//!
//! A [`RefTransaction`] collects intents (`set` or `delete`) keyed by ref
//! name and applies them in one pass, in name order. The batch is
//! all-or-nothing in intent only: if the store fails partway through, the
//! updates before the failure stay applied and the error says exactly which
//! names were and were not applied. Re-running the sync is the recovery
//! path. No locking is done; a concurrent writer to the same names races
//! this one.

use std::collections::BTreeMap;

use aus_types::ObjectId;
use thiserror::Error;

use crate::error::RefError;
use crate::names::validate_ref_name;
use crate::traits::RefStore;

/// Intended new state of one reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefUpdate {
    /// Point the ref at this commit.
    Set(ObjectId),
    /// Remove the ref.
    Delete,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RefTransaction {
    updates: BTreeMap<String, RefUpdate>,
}

/// What a fully applied transaction did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AppliedTransaction {
    /// Refs written, in application order.
    pub set: Vec<String>,
    /// Refs deleted that existed.
    pub deleted: Vec<String>,
    /// Deletes of refs that were already absent.
    pub already_absent: Vec<String>,
}

impl AppliedTransaction {
    pub fn len(&self) -> usize {
        self.set.len() + self.deleted.len() + self.already_absent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Error)]
pub enum TransactionError {
    /// A name was rejected before anything was applied.
    #[error("reference transaction rejected, nothing applied: {0}")]
    InvalidName(#[source] RefError),

    /// The store failed partway through.
    #[error(
        "reference transaction partially applied: {} applied, failed at {failed}, {} not applied: {source}",
        applied.len(),
        remaining.len()
    )]
    Partial {
        applied: Vec<String>,
        failed: String,
        remaining: Vec<String>,
        #[source]
        source: RefError,
    },
}

impl RefTransaction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `name -> target`. A later call for the same name replaces the
    /// earlier intent.
    pub fn set(&mut self, name: impl Into<String>, target: ObjectId) -> &mut Self {
        self.updates.insert(name.into(), RefUpdate::Set(target));
        self
    }

    /// Queue removal of `name`.
    pub fn delete(&mut self, name: impl Into<String>) -> &mut Self {
        self.updates.insert(name.into(), RefUpdate::Delete);
        self
    }

    pub fn get(&self, name: &str) -> Option<&RefUpdate> {
        self.updates.get(name)
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    /// Queued updates in application order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RefUpdate)> {
        self.updates.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Apply every queued update to `store`.
    pub fn apply(&self, store: &dyn RefStore) -> Result<AppliedTransaction, TransactionError> {
        for name in self.updates.keys() {
            validate_ref_name(name).map_err(TransactionError::InvalidName)?;
        }

        let mut applied = AppliedTransaction::default();
        let mut done: Vec<String> = Vec::with_capacity(self.updates.len());
        for (index, (name, update)) in self.updates.iter().enumerate() {
            let result = match update {
                RefUpdate::Set(target) => store.write_ref(name, target).map(|()| {
                    applied.set.push(name.clone());
                }),
                RefUpdate::Delete => store.delete_ref(name).map(|existed| {
                    if existed {
                        applied.deleted.push(name.clone());
                    } else {
                        applied.already_absent.push(name.clone());
                    }
                }),
            };
            if let Err(source) = result {
                let remaining: Vec<String> =
                    self.updates.keys().skip(index + 1).cloned().collect();
                tracing::error!(
                    failed = %name,
                    applied = done.len(),
                    remaining = remaining.len(),
                    "reference transaction aborted partway"
                );
                return Err(TransactionError::Partial {
                    applied: done,
                    failed: name.clone(),
                    remaining,
                    source,
                });
            }
            done.push(name.clone());
        }
        tracing::debug!(updates = applied.len(), "applied reference transaction");
        Ok(applied)
    }
}
