use aus_types::ObjectId;

use crate::error::{StoreError, StoreResult};
use crate::object::{ObjectKind, StoredObject};

/// Content-addressed object store.
///
/// All implementations must satisfy these invariants:
/// - Objects are immutable once written; the same kind and data always
///   produce the same ID.
/// - Writing an object that already exists is a no-op that returns its ID.
/// - Concurrent reads are always safe.
/// - The store never interprets object contents.
/// - All I/O errors are propagated, never silently ignored.
///
/// There is no delete: unreachable objects are simply left behind.
pub trait ObjectStore: Send + Sync {
    /// Read an object by its content-addressed ID.
    ///
    /// Returns `Ok(None)` if the object does not exist.
    /// Returns `Err` on I/O failure or data corruption.
    fn read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>>;

    /// Write an object and return its content-addressed ID.
    ///
    /// If the object already exists, nothing is written.
    fn write(&self, object: &StoredObject) -> StoreResult<ObjectId>;

    /// Check whether an object exists in the store.
    fn exists(&self, id: &ObjectId) -> StoreResult<bool>;

    /// Read an object that must exist and must be of `kind`.
    fn read_kind(&self, id: &ObjectId, kind: ObjectKind) -> StoreResult<StoredObject> {
        let object = self.read(id)?.ok_or(StoreError::NotFound(*id))?;
        if object.kind != kind {
            return Err(StoreError::CorruptObject {
                id: *id,
                reason: format!("expected {kind}, got {}", object.kind),
            });
        }
        Ok(object)
    }
}
