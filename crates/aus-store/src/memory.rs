//! Process-local object store backing `Repository::in_memory` and tests.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

use aus_types::ObjectId;

use crate::error::StoreResult;
use crate::object::StoredObject;
use crate::traits::ObjectStore;

type Objects = HashMap<ObjectId, StoredObject>;

/// Objects kept in a map behind a lock. Nothing survives the process.
#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: RwLock<Objects>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn inspect<T>(&self, f: impl FnOnce(&Objects) -> T) -> T {
        f(&self.objects.read().expect("lock poisoned"))
    }

    /// Distinct objects written so far.
    pub fn len(&self) -> usize {
        self.inspect(|objects| objects.len())
    }

    pub fn is_empty(&self) -> bool {
        self.inspect(|objects| objects.is_empty())
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>> {
        Ok(self.inspect(|objects| objects.get(id).cloned()))
    }

    fn write(&self, object: &StoredObject) -> StoreResult<ObjectId> {
        let id = object.compute_id();
        let mut objects = self.objects.write().expect("lock poisoned");
        if let Entry::Vacant(slot) = objects.entry(id) {
            tracing::trace!(%id, kind = %object.kind, size = object.size, "stored object");
            slot.insert(object.clone());
        }
        Ok(id)
    }

    fn exists(&self, id: &ObjectId) -> StoreResult<bool> {
        Ok(self.inspect(|objects| objects.contains_key(id)))
    }
}

impl fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryObjectStore")
            .field("objects", &self.len())
            .finish_non_exhaustive()
    }
}
