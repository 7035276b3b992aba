use std::cmp::Ordering;

use aus_crypto::ContentHasher;
use aus_types::ObjectId;
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// The kind of object stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    /// Raw content.
    Blob,
    /// Flat directory listing: sorted entries mapping names to object ids.
    Tree,
    /// Revision node: tree pointer, parents and metadata.
    Commit,
}

impl ObjectKind {
    /// Parse the lowercase tag used in on-disk headers.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "blob" => Some(Self::Blob),
            "tree" => Some(Self::Tree),
            "commit" => Some(Self::Commit),
            _ => None,
        }
    }

    fn hasher(&self) -> &'static ContentHasher {
        match self {
            Self::Blob => &ContentHasher::BLOB,
            Self::Tree => &ContentHasher::TREE,
            Self::Commit => &ContentHasher::COMMIT,
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blob => write!(f, "blob"),
            Self::Tree => write!(f, "tree"),
            Self::Commit => write!(f, "commit"),
        }
    }
}

/// A stored object: kind tag + canonical bytes + cached size.
///
/// `StoredObject` is the unit of storage. The store never interprets the
/// contents of the data; it is a pure key-value store keyed by content hash.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    /// The type of this object.
    pub kind: ObjectKind,
    /// The canonical encoding of the object.
    pub data: Vec<u8>,
    /// The size of `data` in bytes.
    pub size: u64,
}

impl StoredObject {
    /// Create a new stored object from kind and data.
    pub fn new(kind: ObjectKind, data: Vec<u8>) -> Self {
        let size = data.len() as u64;
        Self { kind, data, size }
    }

    /// Compute the content-addressed ID for this object.
    ///
    /// Uses the domain-separated hasher for the object's kind.
    pub fn compute_id(&self) -> ObjectId {
        self.kind.hasher().hash(&self.data)
    }

    /// Whether `data` hashes to `expected` under this object's kind.
    pub fn verify(&self, expected: &ObjectId) -> bool {
        self.kind.hasher().verify(&self.data, expected)
    }
}

fn check_kind(obj: &StoredObject, kind: ObjectKind) -> StoreResult<()> {
    if obj.kind != kind {
        return Err(StoreError::CorruptObject {
            id: obj.compute_id(),
            reason: format!("expected {kind}, got {}", obj.kind),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Blob
// ---------------------------------------------------------------------------

/// Raw content object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Blob {
    pub data: Vec<u8>,
}

impl Blob {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self { data: data.into() }
    }

    pub fn to_stored_object(&self) -> StoredObject {
        StoredObject::new(ObjectKind::Blob, self.data.clone())
    }

    pub fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        check_kind(obj, ObjectKind::Blob)?;
        Ok(Self {
            data: obj.data.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

/// Kind of a tree entry.
///
/// `Deleted` only ever appears in a patch batch; it marks a name for
/// removal and is rejected when a tree is encoded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryMode {
    /// Normal file (0o100644).
    Regular,
    /// Executable file (0o100755).
    Executable,
    /// Symbolic link (0o120000).
    Symlink,
    /// Pointer to a commit in another repository (0o160000).
    Submodule,
    /// Deletion marker for tree patches.
    Deleted,
}

impl EntryMode {
    /// Octal mode value. Deletion markers have no mode and report 0.
    pub fn mode_bits(&self) -> u32 {
        match self {
            Self::Regular => 0o100644,
            Self::Executable => 0o100755,
            Self::Symlink => 0o120000,
            Self::Submodule => 0o160000,
            Self::Deleted => 0,
        }
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self, Self::Deleted)
    }
}

impl std::fmt::Display for EntryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:06o}", self.mode_bits())
    }
}

/// A single entry in a tree object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    /// Entry name; unique within its tree.
    pub name: String,
    pub mode: EntryMode,
    /// Target object. For submodules this names a commit that need not be
    /// in the local store; for deletion markers it is null.
    pub object_id: ObjectId,
}

impl TreeEntry {
    pub fn new(mode: EntryMode, name: impl Into<String>, object_id: ObjectId) -> Self {
        Self {
            name: name.into(),
            mode,
            object_id,
        }
    }

    /// A deletion marker for `name`.
    pub fn deleted(name: impl Into<String>) -> Self {
        Self::new(EntryMode::Deleted, name, ObjectId::null())
    }
}

impl PartialOrd for TreeEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TreeEntry {
    /// Byte-wise order over names (`str` ordering compares UTF-8 bytes).
    fn cmp(&self, other: &Self) -> Ordering {
        self.name.as_bytes().cmp(other.name.as_bytes())
    }
}

/// Flat directory snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tree {
    /// Entries sorted by name bytes.
    pub entries: Vec<TreeEntry>,
}

impl Tree {
    /// Create a tree, sorting entries by name for deterministic hashing.
    pub fn new(mut entries: Vec<TreeEntry>) -> Self {
        entries.sort();
        Self { entries }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Check the canonical form: names strictly ascending, no deletion
    /// markers.
    pub fn validate(&self) -> StoreResult<()> {
        if let Some(entry) = self.entries.iter().find(|e| e.mode.is_deleted()) {
            return Err(StoreError::InvalidTree(format!(
                "deletion marker for {:?} cannot be stored",
                entry.name
            )));
        }
        if let Some(pair) = self.entries.windows(2).find(|w| w[0] >= w[1]) {
            return Err(StoreError::InvalidTree(format!(
                "entries out of order or duplicated: {:?} before {:?}",
                pair[0].name, pair[1].name
            )));
        }
        Ok(())
    }

    /// Encode into a `StoredObject`. Fails on non-canonical trees.
    pub fn to_stored_object(&self) -> StoreResult<StoredObject> {
        self.validate()?;
        let data =
            serde_json::to_vec(self).map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(StoredObject::new(ObjectKind::Tree, data))
    }

    pub fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        check_kind(obj, ObjectKind::Tree)?;
        let tree: Self = serde_json::from_slice(&obj.data)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        tree.validate().map_err(|e| StoreError::CorruptObject {
            id: obj.compute_id(),
            reason: e.to_string(),
        })?;
        Ok(tree)
    }

    /// Look up an entry by name.
    pub fn get(&self, name: &str) -> Option<&TreeEntry> {
        self.entries
            .binary_search_by(|e| e.name.as_bytes().cmp(name.as_bytes()))
            .ok()
            .map(|i| &self.entries[i])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Commit
// ---------------------------------------------------------------------------

/// Author or committer identity with a unix-seconds timestamp.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
    pub email: String,
    pub timestamp: i64,
}

impl Person {
    pub fn new(name: impl Into<String>, email: impl Into<String>, timestamp: i64) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            timestamp,
        }
    }
}

/// Immutable revision node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub tree: ObjectId,
    /// Ordered parent commits; empty for a root commit.
    pub parents: Vec<ObjectId>,
    pub author: Person,
    pub committer: Person,
    pub message: String,
}

impl Commit {
    pub fn to_stored_object(&self) -> StoreResult<StoredObject> {
        let data =
            serde_json::to_vec(self).map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(StoredObject::new(ObjectKind::Commit, data))
    }

    pub fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        check_kind(obj, ObjectKind::Commit)?;
        serde_json::from_slice(&obj.data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// The first parent, if any.
    pub fn parent(&self) -> Option<&ObjectId> {
        self.parents.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(ts: i64) -> Person {
        Person::new("aus", "aus@invalid", ts)
    }

    fn commit(tree: ObjectId, message: &str) -> Commit {
        Commit {
            tree,
            parents: vec![],
            author: person(1_700_000_000),
            committer: person(1_700_000_000),
            message: message.into(),
        }
    }

    #[test]
    fn blob_roundtrip() {
        let blob = Blob::new(b"[account]\n".to_vec());
        let decoded = Blob::from_stored_object(&blob.to_stored_object()).unwrap();
        assert_eq!(blob, decoded);
    }

    #[test]
    fn blob_kind_mismatch() {
        let stored = StoredObject::new(ObjectKind::Tree, b"not a blob".to_vec());
        let err = Blob::from_stored_object(&stored).unwrap_err();
        assert!(matches!(err, StoreError::CorruptObject { .. }));
    }

    #[test]
    fn tree_entries_sorted_by_bytes() {
        let tree = Tree::new(vec![
            TreeEntry::new(EntryMode::Regular, "b", ObjectId::null()),
            TreeEntry::new(EntryMode::Regular, "B", ObjectId::null()),
            TreeEntry::new(EntryMode::Regular, "a", ObjectId::null()),
            TreeEntry::new(EntryMode::Regular, "\u{e9}", ObjectId::null()),
        ]);
        let names: Vec<&str> = tree.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["B", "a", "b", "\u{e9}"]);
    }

    #[test]
    fn tree_order_changes_identity() {
        let a = TreeEntry::new(EntryMode::Regular, "a", ObjectId::from_bytes(b"1"));
        let b = TreeEntry::new(EntryMode::Regular, "b", ObjectId::from_bytes(b"2"));
        let sorted = Tree {
            entries: vec![a.clone(), b.clone()],
        };
        let reversed = Tree {
            entries: vec![b, a],
        };
        assert!(sorted.to_stored_object().is_ok());
        assert!(matches!(
            reversed.to_stored_object(),
            Err(StoreError::InvalidTree(_))
        ));
        assert_ne!(sorted, reversed);
    }

    #[test]
    fn tree_rejects_duplicates() {
        let tree = Tree::new(vec![
            TreeEntry::new(EntryMode::Regular, "same", ObjectId::from_bytes(b"1")),
            TreeEntry::new(EntryMode::Regular, "same", ObjectId::from_bytes(b"2")),
        ]);
        assert!(matches!(
            tree.to_stored_object(),
            Err(StoreError::InvalidTree(_))
        ));
    }

    #[test]
    fn tree_rejects_deletion_marker() {
        let tree = Tree::new(vec![TreeEntry::deleted("gone")]);
        assert!(matches!(
            tree.to_stored_object(),
            Err(StoreError::InvalidTree(_))
        ));
    }

    #[test]
    fn tree_decode_rejects_non_canonical_bytes() {
        let data = br#"{"entries":[
            {"name":"z","mode":"Regular","object_id":"0000000000000000000000000000000000000000000000000000000000000000"},
            {"name":"a","mode":"Regular","object_id":"0000000000000000000000000000000000000000000000000000000000000000"}]}"#;
        let stored = StoredObject::new(ObjectKind::Tree, data.to_vec());
        let err = Tree::from_stored_object(&stored).unwrap_err();
        assert!(matches!(err, StoreError::CorruptObject { .. }));
    }

    #[test]
    fn tree_roundtrip_and_lookup() {
        let tree = Tree::new(vec![
            TreeEntry::new(EntryMode::Regular, "account.config", ObjectId::from_bytes(b"c")),
            TreeEntry::new(EntryMode::Submodule, "ext", ObjectId::from_bytes(b"x")),
        ]);
        let decoded = Tree::from_stored_object(&tree.to_stored_object().unwrap()).unwrap();
        assert_eq!(tree, decoded);
        assert_eq!(
            decoded.get("ext").map(|e| e.mode),
            Some(EntryMode::Submodule)
        );
        assert!(decoded.get("missing").is_none());
    }

    #[test]
    fn empty_tree() {
        let tree = Tree::empty();
        assert!(tree.is_empty());
        assert!(tree.to_stored_object().is_ok());
    }

    #[test]
    fn commit_roundtrip() {
        let mut c = commit(ObjectId::from_bytes(b"tree"), "update account");
        c.parents.push(ObjectId::from_bytes(b"parent"));
        let decoded = Commit::from_stored_object(&c.to_stored_object().unwrap()).unwrap();
        assert_eq!(decoded, c);
        assert_eq!(decoded.parent(), Some(&ObjectId::from_bytes(b"parent")));
    }

    #[test]
    fn commit_fields_change_identity() {
        let base = commit(ObjectId::from_bytes(b"tree"), "update account");
        let id = base.to_stored_object().unwrap().compute_id();

        let mut other_message = base.clone();
        other_message.message = "update account!".into();
        let mut other_time = base.clone();
        other_time.committer.timestamp += 1;
        let mut other_parent = base.clone();
        other_parent.parents.push(ObjectId::null());

        for variant in [other_message, other_time, other_parent] {
            assert_ne!(variant.to_stored_object().unwrap().compute_id(), id);
        }
        assert_eq!(base.to_stored_object().unwrap().compute_id(), id);
    }

    #[test]
    fn different_kinds_produce_different_ids() {
        let data = b"same data".to_vec();
        let blob = StoredObject::new(ObjectKind::Blob, data.clone());
        let tree = StoredObject::new(ObjectKind::Tree, data.clone());
        let commit = StoredObject::new(ObjectKind::Commit, data);
        assert_ne!(blob.compute_id(), tree.compute_id());
        assert_ne!(blob.compute_id(), commit.compute_id());
    }

    #[test]
    fn verify_matches_compute_id() {
        let obj = StoredObject::new(ObjectKind::Blob, b"x".to_vec());
        assert!(obj.verify(&obj.compute_id()));
        assert!(!obj.verify(&ObjectId::null()));
    }

    #[test]
    fn kind_tags_roundtrip() {
        for kind in [ObjectKind::Blob, ObjectKind::Tree, ObjectKind::Commit] {
            assert_eq!(ObjectKind::from_tag(&kind.to_string()), Some(kind));
        }
        assert_eq!(ObjectKind::from_tag("receipt"), None);
    }

    #[test]
    fn entry_mode_display() {
        assert_eq!(EntryMode::Regular.to_string(), "100644");
        assert_eq!(EntryMode::Submodule.to_string(), "160000");
    }
}
