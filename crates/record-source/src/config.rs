//! Connection and chunking settings for the upstream source.

use std::collections::BTreeMap;
use std::time::Duration;

use atlas_common::{AtlasError, AtlasResult};
use serde::{Deserialize, Serialize};

/// Upstream archive connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub base_url: String,
    /// Records requested per page
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
    /// Per-request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Extra query parameters sent with every page request. Bounds, time
    /// range and paging parameters are always computed and take precedence.
    #[serde(default)]
    pub default_params: BTreeMap<String, String>,
    /// Record kind assigned to records that carry none.
    #[serde(default)]
    pub default_record_kind: Option<String>,
}

fn default_batch_size() -> u32 {
    2000
}

fn default_timeout_ms() -> u64 {
    30_000
}

impl DatabaseConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            batch_size: default_batch_size(),
            timeout_ms: default_timeout_ms(),
            default_params: BTreeMap::new(),
            default_record_kind: None,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn validate(&self) -> AtlasResult<()> {
        if self.base_url.trim().is_empty() {
            return Err(AtlasError::invalid_config("database.base_url", "must not be empty"));
        }
        if self.batch_size == 0 {
            return Err(AtlasError::invalid_config("database.batch_size", "must be > 0"));
        }
        if self.timeout_ms == 0 {
            return Err(AtlasError::invalid_config("database.timeout_ms", "must be > 0"));
        }
        Ok(())
    }
}

/// How a run's bounds are split into request regions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_count")]
    pub chunk_rows: usize,
    #[serde(default = "default_chunk_count")]
    pub chunk_cols: usize,
    /// Degrees added on every side of each chunk. Non-zero overlap can
    /// count boundary records twice.
    #[serde(default)]
    pub overlap: f64,
    /// Pause between consecutive chunks, to stay under the upstream rate limit
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    /// Stop paging a chunk once this many records have been received
    #[serde(default = "default_max_features_per_chunk")]
    pub max_features_per_chunk: usize,
}

fn default_chunk_count() -> usize {
    4
}

fn default_delay_ms() -> u64 {
    50
}

fn default_max_features_per_chunk() -> usize {
    50_000
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_rows: default_chunk_count(),
            chunk_cols: default_chunk_count(),
            overlap: 0.0,
            delay_ms: default_delay_ms(),
            max_features_per_chunk: default_max_features_per_chunk(),
        }
    }
}

impl ChunkingConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn validate(&self) -> AtlasResult<()> {
        if self.chunk_rows == 0 || self.chunk_cols == 0 {
            return Err(AtlasError::invalid_config(
                "chunking",
                format!("{}x{} chunks requested", self.chunk_rows, self.chunk_cols),
            ));
        }
        if !self.overlap.is_finite() || self.overlap < 0.0 {
            return Err(AtlasError::invalid_config(
                "chunking.overlap",
                format!("must be a finite value >= 0, got {}", self.overlap),
            ));
        }
        if self.max_features_per_chunk == 0 {
            return Err(AtlasError::invalid_config(
                "chunking.max_features_per_chunk",
                "must be > 0",
            ));
        }
        Ok(())
    }
}
