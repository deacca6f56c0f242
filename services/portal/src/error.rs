//! Custom error types for the portal client

use reqwest::StatusCode;
use thiserror::Error;

/// Custom error type for the portal client
#[derive(Error, Debug)]
pub enum PortalError {
    /// The remote API answered with a non-success status.
    ///
    /// `message` is the server's own explanation when it sent one, so it can
    /// be shown to the user verbatim.
    #[error("{message}")]
    Api { status: StatusCode, message: String },

    /// Transport-level failure talking to the remote API
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Input rejected before any request was made
    #[error("{0}")]
    Validation(String),

    /// The operation needs an authenticated session
    #[error("Not authenticated")]
    NotAuthenticated,

    /// Persisted session storage failure
    #[error("Session store error: {0}")]
    Store(#[from] common::error::StoreError),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl PortalError {
    /// HTTP status of an API error, if this is one
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            PortalError::Api { status, .. } => Some(*status),
            PortalError::Http(e) => e.status(),
            _ => None,
        }
    }
}

/// Type alias for portal results
pub type PortalResult<T> = Result<T, PortalError>;
