//! Error types for time-atlas shared types.

use thiserror::Error;

/// Result type alias using AtlasError.
pub type AtlasResult<T> = Result<T, AtlasError>;

/// Configuration and construction errors for the shared types.
#[derive(Debug, Error)]
pub enum AtlasError {
    #[error("Invalid bounding box: {0}")]
    InvalidBbox(String),

    #[error("Invalid grid resolution: {0}")]
    InvalidResolution(String),

    #[error("Invalid time slice: {0}")]
    InvalidTimeSlice(String),

    #[error("Invalid configuration for '{param}': {message}")]
    InvalidConfig { param: String, message: String },

    #[error("Vocabulary encoding failed: {0}")]
    Vocabulary(String),
}

impl AtlasError {
    /// Create an InvalidConfig error.
    pub fn invalid_config(param: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            param: param.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for AtlasError {
    fn from(err: serde_json::Error) -> Self {
        AtlasError::Vocabulary(err.to_string())
    }
}
