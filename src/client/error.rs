//! Upstream failure taxonomy.
//!
//! These never reach callers of [`ApiClient`](super::ApiClient): every
//! variant is logged and collapsed into "no result". They exist so the log
//! says which kind of failure happened.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    /// The provider has no such resource.
    #[error("not found: {path}")]
    NotFound { path: String },

    /// Still rate limited after the single retry.
    #[error("quota exceeded for {path} after retry")]
    QuotaExceeded { path: String },

    #[error("upstream returned HTTP {status} for {path}")]
    Status { status: u16, path: String },

    /// Connection failure, timeout, or a body that could not be read.
    #[error("request to {path} failed: {source}")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("malformed response from {path}: {source}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl FetchError {
    /// True when retrying later would not help.
    pub fn is_definitely_absent(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
