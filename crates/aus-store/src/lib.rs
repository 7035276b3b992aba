//! Content-addressed object storage for aus.
//!
//! Every piece of synced data (configuration blobs, directory trees and
//! revision commits) is stored as an immutable object identified by its
//! BLAKE3 hash, domain-separated by object kind.
//!
//! # Object Types
//!
//! - [`Blob`] -- raw content (serialized configuration sections)
//! - [`Tree`] -- sorted, flat directory listing
//! - [`Commit`] -- revision node pointing at a tree and its parents
//!
//! # Storage Backends
//!
//! All backends implement the [`ObjectStore`] trait:
//!
//! - [`InMemoryObjectStore`] -- `HashMap`-based store for tests and embedding
//! - [`FsObjectStore`] -- one file per object under a fan-out directory
//!
//! # Design Rules
//!
//! 1. Objects are immutable once written (content-addressing guarantees this).
//! 2. Write bottom-up: blobs, then the trees naming them, then commits.
//! 3. Concurrent reads are always safe.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod fs;
pub mod memory;
pub mod object;
pub mod patch;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use fs::FsObjectStore;
pub use memory::InMemoryObjectStore;
pub use object::{Blob, Commit, EntryMode, ObjectKind, Person, StoredObject, Tree, TreeEntry};
pub use patch::{patch_entries, sort_updates, TreePatcher};
pub use traits::ObjectStore;
