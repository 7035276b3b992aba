//! In-memory reference store for testing and ephemeral use.

use std::collections::BTreeMap;
use std::sync::RwLock;

use aus_types::ObjectId;

use crate::error::{RefError, Result};
use crate::names::validate_ref_name;
use crate::traits::RefStore;

/// An in-memory implementation of [`RefStore`].
///
/// All data lives in a `BTreeMap` behind a `RwLock`. Data is lost when the
/// store is dropped.
#[derive(Debug, Default)]
pub struct InMemoryRefStore {
    refs: RwLock<BTreeMap<String, ObjectId>>,
}

impl InMemoryRefStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of refs currently stored.
    pub fn len(&self) -> usize {
        self.refs.read().map(|refs| refs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> RefError {
    RefError::LockPoisoned(e.to_string())
}

impl RefStore for InMemoryRefStore {
    fn read_ref(&self, name: &str) -> Result<Option<ObjectId>> {
        let refs = self.refs.read().map_err(poisoned)?;
        Ok(refs.get(name).copied())
    }

    fn write_ref(&self, name: &str, target: &ObjectId) -> Result<()> {
        validate_ref_name(name)?;
        let mut refs = self.refs.write().map_err(poisoned)?;
        refs.insert(name.to_string(), *target);
        Ok(())
    }

    fn delete_ref(&self, name: &str) -> Result<bool> {
        let mut refs = self.refs.write().map_err(poisoned)?;
        Ok(refs.remove(name).is_some())
    }

    fn list_refs(&self, prefix: &str) -> Result<Vec<(String, ObjectId)>> {
        let refs = self.refs.read().map_err(poisoned)?;
        Ok(refs
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), *v))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(seed: &[u8]) -> ObjectId {
        ObjectId::from_bytes(seed)
    }

    #[test]
    fn write_and_read() {
        let store = InMemoryRefStore::new();
        store.write_ref("accounts/07/7", &id(b"c1")).unwrap();
        assert_eq!(store.read_ref("accounts/07/7").unwrap(), Some(id(b"c1")));
    }

    #[test]
    fn read_missing_is_none() {
        let store = InMemoryRefStore::new();
        assert!(store.read_ref("accounts/07/7").unwrap().is_none());
    }

    #[test]
    fn write_moves_existing_ref() {
        let store = InMemoryRefStore::new();
        store.write_ref("external-identities", &id(b"old")).unwrap();
        store.write_ref("external-identities", &id(b"new")).unwrap();
        assert_eq!(
            store.read_ref("external-identities").unwrap(),
            Some(id(b"new"))
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn delete_reports_existence() {
        let store = InMemoryRefStore::new();
        store.write_ref("accounts/01/1", &id(b"c")).unwrap();
        assert!(store.delete_ref("accounts/01/1").unwrap());
        assert!(!store.delete_ref("accounts/01/1").unwrap());
        assert!(store.is_empty());
    }

    #[test]
    fn rejects_invalid_names() {
        let store = InMemoryRefStore::new();
        assert!(matches!(
            store.write_ref("bad..name", &id(b"c")),
            Err(RefError::InvalidName { .. })
        ));
    }

    #[test]
    fn list_by_prefix_is_sorted() {
        let store = InMemoryRefStore::new();
        store.write_ref("accounts/02/2", &id(b"2")).unwrap();
        store.write_ref("accounts/01/1", &id(b"1")).unwrap();
        store.write_ref("external-identities", &id(b"e")).unwrap();

        let accounts = store.list_refs("accounts/").unwrap();
        let names: Vec<&str> = accounts.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["accounts/01/1", "accounts/02/2"]);
        assert_eq!(store.list_refs("").unwrap().len(), 3);
    }
}
