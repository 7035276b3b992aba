use aus_types::ObjectId;

/// Errors from object store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested object was not found.
    #[error("object not found: {0}")]
    NotFound(ObjectId),

    /// Content hash mismatch on read (data corruption).
    #[error("hash mismatch for {id}: expected {expected}, computed {computed}")]
    HashMismatch {
        id: ObjectId,
        expected: String,
        computed: String,
    },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The object data is malformed or cannot be decoded.
    #[error("corrupt object {id}: {reason}")]
    CorruptObject { id: ObjectId, reason: String },

    /// A tree violates the canonical form (unsorted, duplicate names, or a
    /// deleted-marker entry).
    #[error("invalid tree: {0}")]
    InvalidTree(String),

    /// A caller broke an operation's precondition. This is a programming
    /// error and is never retried.
    #[error("precondition violated: {0}")]
    Precondition(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
