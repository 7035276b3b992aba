//! Filesystem reference store: one file per reference.
//!
//! A ref named `accounts/07/7` lives at `<root>/accounts/07/7` and contains
//! the hex commit id followed by a newline. Updates are written to a temp
//! file beside the target and renamed over it, so each single-ref update is
//! atomic.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use aus_types::ObjectId;
use tempfile::NamedTempFile;
use walkdir::WalkDir;

use crate::error::{RefError, Result};
use crate::names::validate_ref_name;
use crate::traits::RefStore;

#[derive(Debug, Clone)]
pub struct FsRefStore {
    root: PathBuf,
}

impl FsRefStore {
    /// Open (and create if needed) a refs directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn ref_path(&self, name: &str) -> Result<PathBuf> {
        validate_ref_name(name)?;
        Ok(self.root.join(name))
    }

    fn parse(name: &str, contents: &str) -> Result<ObjectId> {
        contents.parse().map_err(|e| RefError::Corrupt {
            name: name.to_string(),
            reason: format!("{e}"),
        })
    }
}

impl RefStore for FsRefStore {
    fn read_ref(&self, name: &str) -> Result<Option<ObjectId>> {
        let path = self.ref_path(name)?;
        match fs::read_to_string(&path) {
            Ok(contents) => Self::parse(name, &contents).map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write_ref(&self, name: &str, target: &ObjectId) -> Result<()> {
        let path = self.ref_path(name)?;
        let dir = path
            .parent()
            .ok_or_else(|| RefError::Io(std::io::Error::other("ref path has no parent")))?;
        fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        writeln!(tmp, "{target}")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| RefError::Io(e.error))?;
        tracing::debug!(name, %target, "wrote ref");
        Ok(())
    }

    fn delete_ref(&self, name: &str) -> Result<bool> {
        let path = self.ref_path(name)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!(name, "deleted ref");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn list_refs(&self, prefix: &str) -> Result<Vec<(String, ObjectId)>> {
        let mut refs = Vec::new();
        for entry in WalkDir::new(&self.root).min_depth(1) {
            let entry = entry.map_err(|e| RefError::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            // Skips in-flight temp files and anything else not written by us.
            if !name.starts_with(prefix) || validate_ref_name(&name).is_err() {
                continue;
            }
            let contents = fs::read_to_string(entry.path())?;
            refs.push((name.clone(), Self::parse(&name, &contents)?));
        }
        refs.sort_by(|(a, _), (b, _)| a.cmp(b));
        Ok(refs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_temp() -> (tempfile::TempDir, FsRefStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FsRefStore::open(dir.path().join("refs")).unwrap();
        (dir, store)
    }

    #[test]
    fn write_read_delete() {
        let (_dir, store) = open_temp();
        let target = ObjectId::from_bytes(b"commit");
        store.write_ref("accounts/07/7", &target).unwrap();
        assert_eq!(store.read_ref("accounts/07/7").unwrap(), Some(target));
        assert!(store.root().join("accounts/07/7").is_file());

        assert!(store.delete_ref("accounts/07/7").unwrap());
        assert!(!store.delete_ref("accounts/07/7").unwrap());
        assert!(store.read_ref("accounts/07/7").unwrap().is_none());
    }

    #[test]
    fn file_contains_hex_line() {
        let (_dir, store) = open_temp();
        let target = ObjectId::from_bytes(b"ledger");
        store.write_ref("external-identities", &target).unwrap();
        let contents = fs::read_to_string(store.root().join("external-identities")).unwrap();
        assert_eq!(contents, format!("{}\n", target.to_hex()));
    }

    #[test]
    fn list_skips_foreign_files() {
        let (_dir, store) = open_temp();
        store.write_ref("accounts/02/2", &ObjectId::from_bytes(b"2")).unwrap();
        store.write_ref("accounts/01/1", &ObjectId::from_bytes(b"1")).unwrap();
        store.write_ref("external-identities", &ObjectId::from_bytes(b"e")).unwrap();
        fs::write(store.root().join("accounts/.tmp123"), "junk").unwrap();

        let names: Vec<String> = store
            .list_refs("accounts/")
            .unwrap()
            .into_iter()
            .map(|(n, _)| n)
            .collect();
        assert_eq!(names, vec!["accounts/01/1", "accounts/02/2"]);
        assert_eq!(store.list_refs("").unwrap().len(), 3);
    }

    #[test]
    fn corrupt_ref_is_reported() {
        let (_dir, store) = open_temp();
        fs::write(store.root().join("external-identities"), "not-a-hash\n").unwrap();
        assert!(matches!(
            store.read_ref("external-identities"),
            Err(RefError::Corrupt { .. })
        ));
    }

    #[test]
    fn rejects_escaping_names() {
        let (_dir, store) = open_temp();
        assert!(matches!(
            store.write_ref("../outside", &ObjectId::null()),
            Err(RefError::InvalidName { .. })
        ));
    }
}
