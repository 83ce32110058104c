//! Error types for upstream retrieval.

use thiserror::Error;

/// Result type alias using SourceError.
pub type SourceResult<T> = Result<T, SourceError>;

/// Errors fetching a page from the upstream source.
///
/// Any of these fails the current chunk only; the chunk stream recovers
/// by yielding an empty result.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Unexpected response body: {0}")]
    UnexpectedResponse(String),

    #[error("Invalid source configuration: {0}")]
    Config(String),
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::UnexpectedResponse(err.to_string())
    }
}
