//! Error types for the content source layer
//!
//! Commands and the generator work with `anyhow::Result`; the content source
//! keeps a typed error so callers can tell a missing document apart from a
//! broken API.

use thiserror::Error;

/// Errors raised while talking to the content API
#[derive(Error, Debug)]
pub enum Error {
    /// Transport-level failure (DNS, TLS, connection reset, timeout)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The API answered with a non-success status
    #[error("Content API returned {status} for {url}")]
    Api { status: u16, url: String },

    /// The response body did not match the expected document shape
    #[error("Failed to decode content API response: {0}")]
    Decode(#[from] serde_json::Error),

    /// No document of that type carries the requested uid
    #[error("No '{doc_type}' document with uid '{uid}'")]
    NotFound { doc_type: String, uid: String },

    /// The API root listed no master ref to query against
    #[error("Content API at {0} did not advertise a master ref")]
    NoMasterRef(String),
}

impl Error {
    /// Whether this error means the document does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

/// Result alias for content source operations
pub type Result<T> = std::result::Result<T, Error>;
