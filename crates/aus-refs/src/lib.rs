//! Reference management for aus.
//!
//! References are the only mutable state in a repository: named pointers to
//! commits. Two namespaces are used, one ref per account
//! (`accounts/NN/<id>`) and one shared ref for the external-identity ledger
//! (`external-identities`).
//!
//! # Modules
//!
//! - [`error`] -- Error types for ref operations
//! - [`names`] -- Ref layout and name validation
//! - [`traits`] -- The [`RefStore`] trait defining the storage interface
//! - [`memory`] -- In-memory [`InMemoryRefStore`]
//! - [`fs`] -- One-file-per-ref [`FsRefStore`]
//! - [`transaction`] -- Best-effort batched updates via [`RefTransaction`]

pub mod error;
pub mod fs;
pub mod memory;
pub mod names;
pub mod traits;
pub mod transaction;

pub use error::{RefError, Result};
pub use fs::FsRefStore;
pub use memory::InMemoryRefStore;
pub use names::{account_ref_name, validate_ref_name, ACCOUNTS_PREFIX, EXTERNAL_IDS_REF};
pub use traits::RefStore;
pub use transaction::{AppliedTransaction, RefTransaction, RefUpdate, TransactionError};
