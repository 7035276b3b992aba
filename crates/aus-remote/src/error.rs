use thiserror::Error;

/// Errors raised while talking to the account service.
///
/// A missing account is not an error: sources return `Ok(None)` for it.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("GET {url} failed with status {status}: {body}")]
    Status { url: String, status: u16, body: String },

    #[error("GET {url} was refused with status {status}; check credentials")]
    Unauthorized { url: String, status: u16 },

    #[error("could not decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid service url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("missing capability: {0}")]
    MissingCapability(String),

    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("invalid rate limit: {0}")]
    InvalidLimit(String),
}

pub type Result<T> = std::result::Result<T, RemoteError>;
