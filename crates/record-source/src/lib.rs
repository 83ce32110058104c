//! Retrieval of historical records from the upstream archive.
//!
//! A run's bounding box is split into spatial chunks, and each chunk is
//! paged through sequentially. Every raw record is normalized into a
//! [`ProcessedFeature`](atlas_common::ProcessedFeature) on the way in, and
//! the record kinds and tags seen are collected into a per-chunk
//! [`Vocabulary`](atlas_common::Vocabulary).
//!
//! Failures are contained as close to their origin as possible:
//! - a malformed record is skipped and counted
//! - a failed chunk yields an empty [`ChunkResult`] and the stream moves on

pub mod chunker;
pub mod client;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod normalize;
pub mod stream;

pub use chunker::{create_spatial_chunks, SpatialChunk};
pub use client::HttpPageSource;
pub use config::{ChunkingConfig, DatabaseConfig};
pub use error::{SourceError, SourceResult};
pub use fetcher::{ChunkFetcher, ChunkResult, ChunkStats, FetchTotals, PageQuery, PageResponse, PageSource};
pub use normalize::{normalize_record, RawRecord};
pub use stream::ChunkStream;
