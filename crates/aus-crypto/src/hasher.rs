use aus_types::ObjectId;

/// Domain-separated BLAKE3 content hasher.
///
/// Each hasher carries a domain tag (e.g. `"aus-blob-v1"`) that is prepended
/// to every hash computation, so a blob and a tree with identical bytes never
/// share an id.
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Hasher for blob objects.
    pub const BLOB: Self = Self {
        domain: "aus-blob-v1",
    };
    /// Hasher for tree objects.
    pub const TREE: Self = Self {
        domain: "aus-tree-v1",
    };
    /// Hasher for commit objects.
    pub const COMMIT: Self = Self {
        domain: "aus-commit-v1",
    };

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> ObjectId {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        ObjectId::from_hash(*hasher.finalize().as_bytes())
    }

    /// Verify that data produces the expected object ID.
    pub fn verify(&self, data: &[u8], expected: &ObjectId) -> bool {
        self.hash(data) == *expected
    }
}

/// Ledger entry name for an external identity key.
///
/// Lowercase hex of the plain content hash of the key. This is part of the
/// on-disk layout: changing it renames every ledger entry.
pub fn identity_key_name(key: &str) -> String {
    hex::encode(blake3::hash(key.as_bytes()).as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        let data = b"[account]\n\tfullName = A\n";
        assert_eq!(ContentHasher::BLOB.hash(data), ContentHasher::BLOB.hash(data));
    }

    #[test]
    fn different_domains_produce_different_hashes() {
        let data = b"same content";
        let blob = ContentHasher::BLOB.hash(data);
        let tree = ContentHasher::TREE.hash(data);
        let commit = ContentHasher::COMMIT.hash(data);
        assert_ne!(blob, tree);
        assert_ne!(blob, commit);
        assert_ne!(tree, commit);
    }

    #[test]
    fn verify_detects_tampering() {
        let id = ContentHasher::TREE.hash(b"original");
        assert!(ContentHasher::TREE.verify(b"original", &id));
        assert!(!ContentHasher::TREE.verify(b"tampered", &id));
    }

    #[test]
    fn hash_matches_manual_domain_prefix() {
        let manual = blake3::hash(b"aus-tree-v1:data");
        assert_eq!(ContentHasher::TREE.hash(b"data").as_bytes(), manual.as_bytes());
    }

    #[test]
    fn identity_key_name_is_stable_hex() {
        let name = identity_key_name("username:jdoe");
        assert_eq!(name.len(), 64);
        assert!(name.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(name, identity_key_name("username:jdoe"));
        assert_ne!(name, identity_key_name("username:jdoe2"));
    }
}
