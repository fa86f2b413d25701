//! Error types for persistence and asset resolution.

use thiserror::Error;

/// Errors from the persistence API.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The configured base URL is invalid.
    #[error("invalid persistence URL: {0}")]
    InvalidUrl(String),

    /// HTTP layer failed (connection, timeout, etc.).
    #[error("persistence request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Transport failure outside HTTP.
    #[error("network error: {0}")]
    Network(String),

    /// The server holds a newer version; the local save was refused.
    #[error("version conflict: remote is at {remote_version}, local save carried {local_version}")]
    Conflict {
        /// Version the client tried to save.
        local_version: u64,
        /// Version the server holds.
        remote_version: u64,
    },

    /// No document with that id.
    #[error("document not found: {0}")]
    NotFound(String),

    /// The server answered with an unexpected status.
    #[error("unexpected status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// Payload could not be encoded or decoded.
    #[error("failed to encode or decode payload: {0}")]
    Json(#[from] serde_json::Error),
}

impl PersistenceError {
    /// Returns true for transient failures worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) | Self::Network(_) => true,
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns true if the server refused the save as stale.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// An image asset could not be resolved to a URL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("asset '{asset_ref}' could not be resolved: {reason}")]
pub struct AssetError {
    /// Reference that failed.
    pub asset_ref: String,
    /// What went wrong.
    pub reason: String,
}
