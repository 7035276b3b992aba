use std::path::PathBuf;

use aus_refs::{RefError, TransactionError};
use aus_remote::RemoteError;
use aus_store::StoreError;
use aus_types::AccountId;
use thiserror::Error;

use crate::gitconfig::ConfigError;

#[derive(Debug, Error)]
pub enum SyncError {
    /// A fetch failed hard; nothing was built or published.
    #[error("fetching account {id} failed after {} account(s) processed: {source}", processed.len())]
    Fetch {
        id: AccountId,
        /// Ids whose fetch completed before the failure, in request order.
        processed: Vec<AccountId>,
        #[source]
        source: RemoteError,
    },

    /// Writing objects failed after the fetch; no reference was changed.
    #[error(
        "building {} failed after {} account(s) fetched, no references changed: {source}",
        failed_at.map_or_else(|| "the external-id ledger".to_string(), |id| format!("account {id}")),
        processed.len()
    )]
    Build {
        /// Account being built, or `None` while building the ledger.
        failed_at: Option<AccountId>,
        /// Every account fetched by the run, in request order.
        processed: Vec<AccountId>,
        #[source]
        source: Box<SyncError>,
    },

    /// The reference batch stopped partway.
    #[error(
        "references partially updated: {} applied, failed at {failed}, {} not applied: {source}",
        applied.len(),
        remaining.len()
    )]
    PartialApply {
        applied: Vec<String>,
        failed: String,
        remaining: Vec<String>,
        #[source]
        source: RefError,
    },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("ref error: {0}")]
    Ref(#[from] RefError),

    #[error("cannot encode config blob: {0}")]
    ConfigBlob(#[from] ConfigError),

    #[error("invalid configuration {path}: {reason}")]
    Config { path: PathBuf, reason: String },

    #[error("not an aus repository: {0}")]
    NotARepository(PathBuf),

    #[error("repository already exists: {0}")]
    AlreadyInitialized(PathBuf),

    #[error("unknown revision: {0}")]
    UnknownRevision(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<TransactionError> for SyncError {
    fn from(err: TransactionError) -> Self {
        match err {
            TransactionError::InvalidName(source) => SyncError::Ref(source),
            TransactionError::Partial {
                applied,
                failed,
                remaining,
                source,
            } => SyncError::PartialApply {
                applied,
                failed,
                remaining,
                source,
            },
        }
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
