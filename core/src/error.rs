//! Error types for the Bandcamp API client.
//!
//! # Design
//! Variants are fine-grained for debugging, but every one of them belongs to
//! one of four categories a user can act on: log in again (`Unauthorized`),
//! fix the request (`Remote`), retry later (`Transport`), or fix the command
//! line (`Input`). `ApiError::category` exposes that grouping.

use thiserror::Error;

/// Errors returned by the client, the credential store and the ship engine.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The provider answered 401; the stored token is missing or stale.
    #[error("unauthorised, please log in first")]
    Unauthorized,

    /// The provider rejected the request with a body-level error flag,
    /// possibly on an HTTP 200.
    #[error("{0}")]
    Remote(String),

    /// Non-2xx status other than 401 without a body-level error message.
    #[error("unexpected response code {status} from the bandcamp API: {body}")]
    HttpStatus { status: u16, body: String },

    /// No response was received at all.
    #[error("network error: {0}")]
    Network(String),

    /// The response body did not match the expected schema.
    #[error("unexpected response shape: {0}")]
    Deserialization(String),

    /// The request payload could not be serialized.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Malformed user input, detected before any network activity.
    #[error("invalid input: {0}")]
    Input(String),

    /// The credential file could not be written.
    #[error("credential storage failed: {0}")]
    Storage(String),
}

/// The user-facing grouping of `ApiError` variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Unauthorized,
    Remote,
    Transport,
    Input,
}

impl ApiError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ApiError::Unauthorized => ErrorCategory::Unauthorized,
            ApiError::Remote(_) => ErrorCategory::Remote,
            ApiError::Input(_) => ErrorCategory::Input,
            ApiError::HttpStatus { .. }
            | ApiError::Network(_)
            | ApiError::Deserialization(_)
            | ApiError::Serialization(_)
            | ApiError::Storage(_) => ErrorCategory::Transport,
        }
    }

    /// Whether repeating the identical request could succeed.
    ///
    /// Body-level rejections and 401s are never transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Network(_) => true,
            ApiError::HttpStatus { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}
