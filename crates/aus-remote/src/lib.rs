//! Account fetching for aus.
//!
//! [`AccountSource`] is the boundary the sync pipeline consumes: one call per
//! account id, `Ok(None)` for accounts that do not exist. [`GerritClient`]
//! implements it against a Gerrit review server, throttled by a shared
//! [`RateLimiter`].

pub mod auth;
pub mod client;
pub mod error;
pub mod limiter;
pub mod source;

pub use auth::{Credentials, DEFAULT_COOKIE_NAME};
pub use client::{strip_xssi_prefix, GerritClient};
pub use error::{RemoteError, Result};
pub use limiter::{RateLimiter, DEFAULT_BURST, DEFAULT_RATE_PER_SECOND};
pub use source::{AccountSource, InMemoryAccountSource};
