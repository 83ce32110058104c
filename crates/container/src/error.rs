//! Error types for writing and reading containers.

use thiserror::Error;

/// Result type alias using ContainerError.
pub type ContainerResult<T> = Result<T, ContainerError>;

#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Encoding failed: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("Decoding failed: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    #[error("Container truncated: need {expected} bytes, file has {actual}")]
    Truncated { expected: u64, actual: u64 },

    #[error("Metadata block of {0} bytes does not fit a u32 length prefix")]
    MetadataTooLarge(usize),

    #[error("Section {section}: {message}")]
    SectionOrder {
        section: &'static str,
        message: String,
    },

    #[error("Section {0} was never written")]
    MissingSection(&'static str),

    #[error("Unsupported container version: {0}")]
    UnsupportedVersion(String),

    #[error("Invalid metadata: {0}")]
    InvalidMetadata(String),
}

impl ContainerError {
    pub fn section_order(section: &'static str, message: impl Into<String>) -> Self {
        Self::SectionOrder {
            section,
            message: message.into(),
        }
    }
}
