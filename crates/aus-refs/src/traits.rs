//! The [`RefStore`] trait defining the reference storage interface.

use aus_types::ObjectId;

use crate::error::Result;

/// Storage backend for named references.
///
/// Each operation is atomic for a single reference. There is no
/// multi-reference commit; batches go through
/// [`RefTransaction`](crate::RefTransaction), which is best-effort.
pub trait RefStore: Send + Sync {
    /// Read a ref. Returns `Ok(None)` if the ref does not exist.
    fn read_ref(&self, name: &str) -> Result<Option<ObjectId>>;

    /// Create or move a ref to point at `target`.
    fn write_ref(&self, name: &str, target: &ObjectId) -> Result<()>;

    /// Delete a ref. Returns `Ok(true)` if it existed.
    fn delete_ref(&self, name: &str) -> Result<bool>;

    /// List all refs whose name starts with `prefix`, sorted by name.
    ///
    /// Pass `""` to list all refs.
    fn list_refs(&self, prefix: &str) -> Result<Vec<(String, ObjectId)>>;
}
