//! # Payment Provider Errors
//!
//! Failures at the processor boundary. All of them map to HTTP 502 at the
//! API layer: the marketplace is fine, the money pipe is not.

use thiserror::Error;

/// Errors from the checkout provider.
#[derive(Debug, Error)]
pub enum PayError {
    /// The HTTP request to the processor failed (network, TLS, timeout).
    #[error("checkout request failed: {0}")]
    Http(String),

    /// The processor answered with a non-success status.
    #[error("checkout provider error ({status}): {message}")]
    Provider { status: u16, message: String },

    /// The processor answered 2xx but the body was not what we expect.
    #[error("invalid checkout response: {0}")]
    InvalidResponse(String),

    /// The processor does not know this session.
    #[error("unknown checkout session: {0}")]
    UnknownSession(String),
}

impl From<reqwest::Error> for PayError {
    fn from(err: reqwest::Error) -> Self {
        PayError::Http(err.to_string())
    }
}

/// Result type for provider operations.
pub type PayResult<T> = Result<T, PayError>;
