//! Fatal pipeline errors.

use atlas_common::AtlasError;
use container::ContainerError;
use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(#[from] AtlasError),

    #[error("{count} consecutive chunks failed (last in slice {time_slice}): {last_error}")]
    ConsecutiveFailures {
        count: usize,
        time_slice: String,
        last_error: String,
    },

    #[error("No valid features were fetched across {chunks} chunk requests")]
    EmptyRun { chunks: usize },

    #[error("Container error: {0}")]
    Container(#[from] ContainerError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Writer task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
