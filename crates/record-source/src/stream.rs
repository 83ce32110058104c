//! Sequential, rate-limited iteration over a set of chunks.

use std::time::Duration;

use atlas_common::TimeSlice;
use tracing::{info, warn};

use crate::chunker::SpatialChunk;
use crate::fetcher::{ChunkFetcher, ChunkResult, FetchTotals, PageSource};

/// Yields one [`ChunkResult`] per chunk, in order.
///
/// Chunks are fetched one at a time with `delay` between them. A chunk that
/// fails is logged and yielded as an empty result carrying the error, so a
/// single failure never ends the stream.
pub struct ChunkStream<'a, S> {
    fetcher: &'a ChunkFetcher<S>,
    chunks: &'a [SpatialChunk],
    time_slice: Option<&'a TimeSlice>,
    record_kind: Option<&'a str>,
    delay: Duration,
    position: usize,
    totals: FetchTotals,
}

impl<'a, S: PageSource> ChunkStream<'a, S> {
    pub fn new(
        fetcher: &'a ChunkFetcher<S>,
        chunks: &'a [SpatialChunk],
        time_slice: Option<&'a TimeSlice>,
        delay: Duration,
    ) -> Self {
        Self {
            fetcher,
            chunks,
            time_slice,
            record_kind: None,
            delay,
            position: 0,
            totals: FetchTotals::default(),
        }
    }

    /// Restrict the stream to one record kind.
    pub fn with_record_kind(mut self, record_kind: &'a str) -> Self {
        self.record_kind = Some(record_kind);
        self
    }

    /// Fetch the next chunk, or `None` once every chunk has been yielded.
    pub async fn next_chunk(&mut self) -> Option<ChunkResult> {
        let chunk = self.chunks.get(self.position)?;
        if self.position > 0 && !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.position += 1;

        let result = match self
            .fetcher
            .fetch_chunk(chunk, self.time_slice, self.record_kind)
            .await
        {
            Ok(result) => result,
            Err(e) => {
                warn!(
                    chunk = %chunk.id,
                    error = %e,
                    "Chunk fetch failed, continuing with empty result"
                );
                ChunkResult::failed(chunk.clone(), e.to_string())
            }
        };

        self.totals.absorb(&result);
        info!(
            chunk = %chunk.id,
            progress = %format!("{}/{}", self.position, self.chunks.len()),
            features = result.features.len(),
            failed = result.is_failed(),
            "Chunk complete"
        );
        Some(result)
    }

    pub fn remaining(&self) -> usize {
        self.chunks.len() - self.position
    }

    /// Totals over the chunks yielded so far.
    pub fn totals(&self) -> &FetchTotals {
        &self.totals
    }
}
