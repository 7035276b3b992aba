//! Loose-object filesystem store.
//!
//! Each object lives at `<root>/<first 2 hex>/<remaining 62 hex>` and holds
//! a `"<kind> <len>\0"` header followed by the canonical bytes. Writes go to
//! a temp file in the target directory, are synced, then renamed into place,
//! so a reader never observes a half-written object.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use aus_types::ObjectId;
use tempfile::NamedTempFile;

use crate::error::{StoreError, StoreResult};
use crate::object::{ObjectKind, StoredObject};
use crate::traits::ObjectStore;

/// Object store backed by one file per object.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    /// Open (and create if needed) an object directory.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, id: &ObjectId) -> PathBuf {
        let hex = id.to_hex();
        self.root.join(&hex[..2]).join(&hex[2..])
    }

    fn decode(id: &ObjectId, raw: &[u8]) -> StoreResult<StoredObject> {
        let corrupt = |reason: &str| StoreError::CorruptObject {
            id: *id,
            reason: reason.to_string(),
        };
        let nul = raw
            .iter()
            .position(|b| *b == 0)
            .ok_or_else(|| corrupt("missing header terminator"))?;
        let header =
            std::str::from_utf8(&raw[..nul]).map_err(|_| corrupt("header is not utf-8"))?;
        let (tag, len) = header
            .split_once(' ')
            .ok_or_else(|| corrupt("malformed header"))?;
        let kind = ObjectKind::from_tag(tag)
            .ok_or_else(|| corrupt(&format!("unknown object kind {tag:?}")))?;
        let len: usize = len.parse().map_err(|_| corrupt("malformed length"))?;
        let data = &raw[nul + 1..];
        if data.len() != len {
            return Err(corrupt(&format!(
                "length mismatch: header says {len}, found {}",
                data.len()
            )));
        }
        Ok(StoredObject::new(kind, data.to_vec()))
    }
}

impl ObjectStore for FsObjectStore {
    fn read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>> {
        let raw = match fs::read(self.object_path(id)) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let object = Self::decode(id, &raw)?;
        if !object.verify(id) {
            return Err(StoreError::HashMismatch {
                id: *id,
                expected: id.to_hex(),
                computed: object.compute_id().to_hex(),
            });
        }
        Ok(Some(object))
    }

    fn write(&self, object: &StoredObject) -> StoreResult<ObjectId> {
        let id = object.compute_id();
        // An existing file only counts if it still decodes to this id.
        match self.read(&id) {
            Ok(Some(_)) => {
                tracing::trace!(%id, "object already present");
                return Ok(id);
            }
            Ok(None) => {}
            Err(err @ (StoreError::HashMismatch { .. } | StoreError::CorruptObject { .. })) => {
                tracing::warn!(%id, error = %err, "replacing damaged object");
            }
            Err(err) => return Err(err),
        }
        let path = self.object_path(&id);
        let dir = path
            .parent()
            .ok_or_else(|| StoreError::Io(std::io::Error::other("object path has no parent")))?;
        fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        write!(tmp, "{} {}\0", object.kind, object.data.len())?;
        tmp.write_all(&object.data)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| StoreError::Io(e.error))?;
        tracing::debug!(%id, kind = %object.kind, size = object.size, "wrote object");
        Ok(id)
    }

    fn exists(&self, id: &ObjectId) -> StoreResult<bool> {
        Ok(self.object_path(id).is_file())
    }
}
