//! Content hashing for aus.
//!
//! Provides domain-separated BLAKE3 hashing for stored objects and the
//! deterministic naming of external-identity ledger entries.
//!
//! All crypto operations wrap established libraries; there is no custom cryptography.

pub mod hasher;

pub use hasher::{identity_key_name, ContentHasher};
