//! Paginated retrieval of one spatial chunk.

use async_trait::async_trait;
use atlas_common::{BoundingBox, ProcessedFeature, TimeRange, TimeSlice, Vocabulary};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::chunker::SpatialChunk;
use crate::config::{ChunkingConfig, DatabaseConfig};
use crate::error::SourceResult;
use crate::normalize::normalize_record;

/// One page request against the upstream source.
#[derive(Debug, Clone, PartialEq)]
pub struct PageQuery {
    pub bounds: BoundingBox,
    pub time_range: Option<TimeRange>,
    pub record_kind: Option<String>,
    /// 1-based page number
    pub page: u32,
    pub page_size: u32,
}

/// Upstream page envelope. Only `data` is required; pagination fields are
/// used when present.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageResponse {
    #[serde(default)]
    pub data: Vec<serde_json::Value>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default, alias = "pageSize")]
    pub page_size: Option<u32>,
    #[serde(default, alias = "totalPages")]
    pub total_pages: Option<u64>,
}

impl PageResponse {
    /// Reported page count, or one derived from `total` and the page size.
    pub fn page_count(&self, requested_page_size: u32) -> Option<u64> {
        if self.total_pages.is_some() {
            return self.total_pages;
        }
        let page_size = self.page_size.unwrap_or(requested_page_size) as u64;
        match (self.total, page_size) {
            (Some(total), size) if size > 0 => Some(total.div_ceil(size)),
            _ => None,
        }
    }
}

/// A paginated record source.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch a single page.
    async fn fetch_page(&self, query: &PageQuery) -> SourceResult<PageResponse>;
}

#[async_trait]
impl<T: PageSource + ?Sized> PageSource for std::sync::Arc<T> {
    async fn fetch_page(&self, query: &PageQuery) -> SourceResult<PageResponse> {
        (**self).fetch_page(query).await
    }
}

/// Record counts for one chunk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkStats {
    pub total_raw: usize,
    pub valid_processed: usize,
    pub invalid_skipped: usize,
}

impl ChunkStats {
    pub fn add(&mut self, other: &ChunkStats) {
        self.total_raw += other.total_raw;
        self.valid_processed += other.valid_processed;
        self.invalid_skipped += other.invalid_skipped;
    }
}

/// Everything retrieved for one chunk.
#[derive(Debug, Clone)]
pub struct ChunkResult {
    pub chunk: SpatialChunk,
    pub features: Vec<ProcessedFeature>,
    pub stats: ChunkStats,
    pub vocabulary: Vocabulary,
    /// Paging stopped at the per-chunk record ceiling
    pub truncated: bool,
    /// Set when the chunk failed and was replaced by an empty result
    pub error: Option<String>,
}

impl ChunkResult {
    pub fn empty(chunk: SpatialChunk) -> Self {
        Self {
            chunk,
            features: Vec::new(),
            stats: ChunkStats::default(),
            vocabulary: Vocabulary::new(),
            truncated: false,
            error: None,
        }
    }

    pub fn failed(chunk: SpatialChunk, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::empty(chunk)
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Running totals across many chunks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchTotals {
    pub chunks: usize,
    pub failed_chunks: usize,
    pub truncated_chunks: usize,
    pub records: ChunkStats,
}

impl FetchTotals {
    pub fn absorb(&mut self, result: &ChunkResult) {
        self.chunks += 1;
        if result.is_failed() {
            self.failed_chunks += 1;
        }
        if result.truncated {
            self.truncated_chunks += 1;
        }
        self.records.add(&result.stats);
    }

    pub fn merge(&mut self, other: &FetchTotals) {
        self.chunks += other.chunks;
        self.failed_chunks += other.failed_chunks;
        self.truncated_chunks += other.truncated_chunks;
        self.records.add(&other.records);
    }
}

/// Pages through chunks of a [`PageSource`].
pub struct ChunkFetcher<S> {
    source: S,
    page_size: u32,
    max_features_per_chunk: usize,
    default_record_kind: Option<String>,
}

impl<S: PageSource> ChunkFetcher<S> {
    pub fn new(source: S, database: &DatabaseConfig, chunking: &ChunkingConfig) -> Self {
        Self {
            source,
            page_size: database.batch_size.max(1),
            max_features_per_chunk: chunking.max_features_per_chunk.max(1),
            default_record_kind: database.default_record_kind.clone(),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetch every page for one chunk and normalize its records.
    ///
    /// `record_kind` is sent upstream as a filter and doubles as the kind
    /// for records that carry none. Paging stops on a short or empty page,
    /// on the reported page count or total, or once the chunk reaches the
    /// record ceiling (the result is then marked `truncated`).
    ///
    /// Page errors are returned as-is; turning them into an empty result is
    /// the caller's job.
    #[instrument(skip(self, chunk, time_slice), fields(chunk = %chunk.id))]
    pub async fn fetch_chunk(
        &self,
        chunk: &SpatialChunk,
        time_slice: Option<&TimeSlice>,
        record_kind: Option<&str>,
    ) -> SourceResult<ChunkResult> {
        let fallback_kind = record_kind.or(self.default_record_kind.as_deref());
        let mut result = ChunkResult::empty(chunk.clone());
        let mut page = 1u32;

        loop {
            let query = PageQuery {
                bounds: chunk.bounds,
                time_range: time_slice.map(|slice| slice.time_range.clone()),
                record_kind: record_kind.map(str::to_string),
                page,
                page_size: self.page_size,
            };

            let response = self.source.fetch_page(&query).await?;
            let page_count = response.page_count(self.page_size);
            let received = response.data.len();
            debug!(page, received, "Fetched page");

            for value in response.data {
                result.stats.total_raw += 1;
                match normalize_record(value, fallback_kind) {
                    Ok(feature) => {
                        result.vocabulary.observe(&feature);
                        result.features.push(feature);
                        result.stats.valid_processed += 1;
                    }
                    Err(e) => {
                        result.stats.invalid_skipped += 1;
                        debug!(error = %e, "Skipping invalid record");
                    }
                }
            }

            if result.stats.total_raw >= self.max_features_per_chunk {
                warn!(
                    records = result.stats.total_raw,
                    limit = self.max_features_per_chunk,
                    "Chunk reached record ceiling, stopping early; consider finer chunking"
                );
                result.truncated = true;
                break;
            }
            if received == 0 || received < self.page_size as usize {
                break;
            }
            if page_count.is_some_and(|count| page as u64 >= count) {
                break;
            }
            if response
                .total
                .is_some_and(|total| result.stats.total_raw as u64 >= total)
            {
                break;
            }
            page += 1;
        }

        info!(
            pages = page,
            raw = result.stats.total_raw,
            valid = result.stats.valid_processed,
            invalid = result.stats.invalid_skipped,
            "Chunk fetched"
        );
        Ok(result)
    }
}
