use std::path::{Path, PathBuf};
use std::sync::Arc;

use aus_refs::{FsRefStore, InMemoryRefStore, RefStore};
use aus_store::{Blob, Commit, FsObjectStore, InMemoryObjectStore, ObjectKind, ObjectStore, Tree};
use aus_types::ObjectId;

use crate::error::{SyncError, SyncResult};

const OBJECTS_DIR: &str = "objects";
const REFS_DIR: &str = "refs";

/// A commit together with its id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitRef {
    pub id: ObjectId,
    pub commit: Commit,
}

/// An object store and a reference store that belong together.
///
/// On disk a repository is a directory holding `objects/` and `refs/`.
pub struct Repository {
    root: Option<PathBuf>,
    objects: Arc<dyn ObjectStore>,
    refs: Arc<dyn RefStore>,
}

impl Repository {
    /// Create an empty repository at `path`. The directory may exist but must
    /// not already hold a repository.
    pub fn init(path: impl AsRef<Path>) -> SyncResult<Self> {
        let root = path.as_ref();
        if root.join(OBJECTS_DIR).exists() || root.join(REFS_DIR).exists() {
            return Err(SyncError::AlreadyInitialized(root.to_path_buf()));
        }
        std::fs::create_dir_all(root)?;
        let repo = Self::open_dirs(root)?;
        tracing::info!(path = %root.display(), "initialized repository");
        Ok(repo)
    }

    pub fn open(path: impl AsRef<Path>) -> SyncResult<Self> {
        let root = path.as_ref();
        if !root.join(OBJECTS_DIR).is_dir() || !root.join(REFS_DIR).is_dir() {
            return Err(SyncError::NotARepository(root.to_path_buf()));
        }
        Self::open_dirs(root)
    }

    fn open_dirs(root: &Path) -> SyncResult<Self> {
        Ok(Self {
            root: Some(root.to_path_buf()),
            objects: Arc::new(FsObjectStore::open(root.join(OBJECTS_DIR))?),
            refs: Arc::new(FsRefStore::open(root.join(REFS_DIR))?),
        })
    }

    pub fn in_memory() -> Self {
        Self::from_stores(
            Arc::new(InMemoryObjectStore::new()),
            Arc::new(InMemoryRefStore::new()),
        )
    }

    /// Assemble a repository from arbitrary store implementations.
    pub fn from_stores(objects: Arc<dyn ObjectStore>, refs: Arc<dyn RefStore>) -> Self {
        Self {
            root: None,
            objects,
            refs,
        }
    }

    /// Directory of an on-disk repository.
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn objects(&self) -> &dyn ObjectStore {
        self.objects.as_ref()
    }

    pub fn refs(&self) -> &dyn RefStore {
        self.refs.as_ref()
    }

    /// The commit `name` points at, if the reference exists.
    pub fn resolve(&self, name: &str) -> SyncResult<Option<CommitRef>> {
        let Some(id) = self.refs.read_ref(name)? else {
            return Ok(None);
        };
        let commit = self.read_commit(&id)?;
        Ok(Some(CommitRef { id, commit }))
    }

    /// Resolve a reference name, falling back to a full hex object id.
    pub fn lookup(&self, spec: &str) -> SyncResult<ObjectId> {
        if aus_refs::validate_ref_name(spec).is_ok() {
            if let Some(id) = self.refs.read_ref(spec)? {
                return Ok(id);
            }
        }
        match spec.parse::<ObjectId>() {
            Ok(id) if self.objects.exists(&id)? => Ok(id),
            _ => Err(SyncError::UnknownRevision(spec.to_string())),
        }
    }

    pub fn read_commit(&self, id: &ObjectId) -> SyncResult<Commit> {
        let object = self.objects.read_kind(id, ObjectKind::Commit)?;
        Ok(Commit::from_stored_object(&object)?)
    }

    pub fn read_tree(&self, id: &ObjectId) -> SyncResult<Tree> {
        let object = self.objects.read_kind(id, ObjectKind::Tree)?;
        Ok(Tree::from_stored_object(&object)?)
    }

    pub fn read_blob(&self, id: &ObjectId) -> SyncResult<Vec<u8>> {
        let object = self.objects.read_kind(id, ObjectKind::Blob)?;
        Ok(Blob::from_stored_object(&object)?.data)
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository").field("root", &self.root).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aus_store::{EntryMode, Person, StoreError, TreeEntry};

    fn write_chain(repo: &Repository) -> (ObjectId, ObjectId, ObjectId) {
        let blob = repo
            .objects()
            .write(&Blob::new(b"[account]\n".to_vec()).to_stored_object())
            .unwrap();
        let tree = Tree::new(vec![TreeEntry::new(EntryMode::Regular, "account.config", blob)]);
        let tree_id = repo.objects().write(&tree.to_stored_object().unwrap()).unwrap();
        let commit = Commit {
            tree: tree_id,
            parents: vec![],
            author: Person::new("aus", "aus@invalid", 0),
            committer: Person::new("aus", "aus@invalid", 0),
            message: "update account".into(),
        };
        let commit_id = repo.objects().write(&commit.to_stored_object().unwrap()).unwrap();
        (blob, tree_id, commit_id)
    }

    #[test]
    fn resolve_reads_through_refs() {
        let repo = Repository::in_memory();
        assert!(repo.resolve("accounts/07/7").unwrap().is_none());

        let (blob, tree, commit) = write_chain(&repo);
        repo.refs().write_ref("accounts/07/7", &commit).unwrap();

        let resolved = repo.resolve("accounts/07/7").unwrap().unwrap();
        assert_eq!(resolved.id, commit);
        assert_eq!(resolved.commit.tree, tree);
        assert_eq!(repo.read_tree(&tree).unwrap().get("account.config").unwrap().object_id, blob);
        assert_eq!(repo.read_blob(&blob).unwrap(), b"[account]\n");
    }

    #[test]
    fn typed_reads_check_kind() {
        let repo = Repository::in_memory();
        let (blob, _, _) = write_chain(&repo);
        assert!(matches!(
            repo.read_commit(&blob),
            Err(SyncError::Store(StoreError::CorruptObject { .. }))
        ));
        assert!(matches!(
            repo.read_tree(&ObjectId::from_bytes(b"nope")),
            Err(SyncError::Store(StoreError::NotFound(_)))
        ));
    }

    #[test]
    fn lookup_accepts_refs_and_hashes() {
        let repo = Repository::in_memory();
        let (blob, _, commit) = write_chain(&repo);
        repo.refs().write_ref("external-identities", &commit).unwrap();

        assert_eq!(repo.lookup("external-identities").unwrap(), commit);
        assert_eq!(repo.lookup(&blob.to_hex()).unwrap(), blob);
        assert!(matches!(
            repo.lookup("accounts/01/1"),
            Err(SyncError::UnknownRevision(_))
        ));
    }

    #[test]
    fn init_then_open_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("all-users");

        let repo = Repository::init(&path).unwrap();
        let (_, _, commit) = write_chain(&repo);
        repo.refs().write_ref("accounts/07/7", &commit).unwrap();
        drop(repo);

        let reopened = Repository::open(&path).unwrap();
        assert_eq!(reopened.root(), Some(path.as_path()));
        assert_eq!(reopened.resolve("accounts/07/7").unwrap().unwrap().id, commit);

        assert!(matches!(
            Repository::init(&path),
            Err(SyncError::AlreadyInitialized(_))
        ));
    }

    #[test]
    fn open_rejects_plain_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Repository::open(dir.path()),
            Err(SyncError::NotARepository(_))
        ));
    }
}
