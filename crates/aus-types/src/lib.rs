//! Foundation types for aus.
//!
//! Every other aus crate depends on `aus-types`.
//!
//! # Key Types
//!
//! - [`ObjectId`] -- Content-addressed identifier (BLAKE3 hash)
//! - [`AccountId`] -- Numeric account identifier on the review server
//! - [`AccountRecord`] -- Account details as fetched from the remote
//! - [`ExternalIdentity`] -- Alternate login key bound to one account
//! - [`AccountInfo`] -- An account together with all of its external identities

pub mod account;
pub mod error;
pub mod object;

pub use account::{AccountId, AccountInfo, AccountRecord, ExternalIdentity};
pub use error::TypeError;
pub use object::ObjectId;
