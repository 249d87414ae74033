//! Error types for talking to the FicHub API.

use crate::shape::ShapeError;
use thiserror::Error;

/// HTTP-level failure. One attempt is made per request; nothing here is retried.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Network error: could not reach {url}: {source}")]
    Network { url: String, source: reqwest::Error },

    #[error("HTTP {status} when fetching {url}: {message}")]
    HttpStatus {
        status: u16,
        url: String,
        message: String,
    },

    #[error("Failed to read response body from {url}: {source}")]
    BodyRead { url: String, source: reqwest::Error },
}

/// Anything a [FicHubClient](crate::FicHubClient) call can fail with.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Unable to load story metadata from {url}: {source}")]
    Metadata { url: String, source: ShapeError },

    #[error("Unable to load story download urls from {url}: {source}")]
    Download { url: String, source: ShapeError },

    #[error("Concurrency limit must be between {min} and {max} inclusive to respect FicHub's fair-use policy, got {value}")]
    InvalidConcurrency { value: usize, min: usize, max: usize },

    #[error("Failed to create HTTP client: {source}")]
    Build { source: reqwest::Error },

    #[error("Request limiter was closed")]
    LimiterClosed,
}

impl ClientError {
    /// The shaping failure behind this error, if any.
    pub fn shape_error(&self) -> Option<&ShapeError> {
        match self {
            ClientError::Metadata { source, .. } | ClientError::Download { source, .. } => {
                Some(source)
            }
            _ => None,
        }
    }
}
