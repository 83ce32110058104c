//! The build pipeline: fetch every chunk for every time slice, aggregate,
//! and write one container.

use std::path::Path;

use aggregation::{
    generate_heatmap_resolutions, HeatmapResolutions, HistogramAggregator, Histograms,
    MultiResolutionAccumulator, VisualizationStats,
};
use atlas_common::{BoundingBox, TimeSlice, Vocabulary};
use container::{ContainerWriter, VisualizationMetadata, WrittenContainer};
use record_source::{
    create_spatial_chunks, ChunkFetcher, ChunkResult, ChunkStream, FetchTotals, PageSource,
    SpatialChunk,
};
use tracing::{debug, info, instrument, warn};

use crate::config::PresetConfig;
use crate::error::{PipelineError, PipelineResult};

/// Outcome of a successful build.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub container: WrittenContainer,
    pub vocabulary: Vocabulary,
    pub totals: FetchTotals,
    /// Valid features whose position fell inside the run bounds
    pub features_aggregated: u64,
    /// Valid features positioned outside the run bounds, e.g. by a centroid
    pub features_outside_bounds: u64,
}

/// One build over a page source.
pub struct Pipeline<S> {
    config: PresetConfig,
    bounds: BoundingBox,
    time_slices: Vec<TimeSlice>,
    chunks: Vec<SpatialChunk>,
    fetcher: ChunkFetcher<S>,
}

/// Per-slice state while chunks stream in.
struct SliceRun {
    accumulators: MultiResolutionAccumulator,
    totals: FetchTotals,
    aggregated: u64,
    outside: u64,
}

impl<S: PageSource> Pipeline<S> {
    /// Validate the preset and plan the run. Nothing is fetched yet.
    pub fn new(config: PresetConfig, source: S) -> PipelineResult<Self> {
        config.validate()?;

        let bounds = config.run_bounds();
        let time_slices = config.time_slices()?;
        let chunks = create_spatial_chunks(&bounds, &config.chunking)?;
        let fetcher = ChunkFetcher::new(source, &config.database, &config.chunking);

        info!(
            bounds = ?bounds,
            chunks = chunks.len(),
            time_slices = time_slices.len(),
            resolutions = config.resolutions.len(),
            "Planned build"
        );

        Ok(Self {
            config,
            bounds,
            time_slices,
            chunks,
            fetcher,
        })
    }

    pub fn bounds(&self) -> &BoundingBox {
        &self.bounds
    }

    pub fn chunks(&self) -> &[SpatialChunk] {
        &self.chunks
    }

    pub fn time_slices(&self) -> &[TimeSlice] {
        &self.time_slices
    }

    /// Fetch, aggregate and write the container to the preset's output path.
    pub async fn run(&self) -> PipelineResult<BuildReport> {
        let template = MultiResolutionAccumulator::new(&self.bounds, &self.config.resolutions)?;
        let mut histograms =
            HistogramAggregator::new(&self.time_slices, self.config.max_tag_combination_size)?;
        let mut vocabulary = Vocabulary::new();
        let mut totals = FetchTotals::default();
        let mut consecutive_failures = 0;
        let mut aggregated = 0;
        let mut outside = 0;
        let mut per_slice = Vec::with_capacity(self.time_slices.len());

        for time_slice in &self.time_slices {
            let run = self
                .run_slice(
                    time_slice,
                    template.empty_like(),
                    &mut histograms,
                    &mut vocabulary,
                    &mut consecutive_failures,
                )
                .await?;

            totals.merge(&run.totals);
            aggregated += run.aggregated;
            outside += run.outside;
            per_slice.push((time_slice.clone(), run.accumulators));
        }

        if totals.records.valid_processed == 0 {
            if !self.config.allow_empty {
                return Err(PipelineError::EmptyRun {
                    chunks: totals.chunks,
                });
            }
            warn!("No valid features fetched, writing an empty container");
        }

        let heatmaps = generate_heatmap_resolutions(&per_slice, &vocabulary);
        drop(per_slice);
        let histogram_output = histograms.finish(&vocabulary);

        let stats = VisualizationStats::compute(
            &heatmaps,
            &template.primary().resolution_key(),
            &histogram_output,
            self.time_slices.len(),
        );
        let dimensions: Vec<_> = template.iter().map(|acc| *acc.dimensions()).collect();
        let metadata = VisualizationMetadata::new(
            &dimensions,
            &self.time_slices,
            &vocabulary,
            histograms.combination_keys().iter().cloned(),
            Some(stats),
        )?;

        let container = self
            .write(heatmaps, histogram_output, metadata)
            .await?;

        info!(
            path = %container.path.display(),
            features = aggregated,
            outside_bounds = outside,
            raw_records = totals.records.total_raw,
            invalid_records = totals.records.invalid_skipped,
            chunks = totals.chunks,
            failed_chunks = totals.failed_chunks,
            truncated_chunks = totals.truncated_chunks,
            record_kinds = vocabulary.record_kinds.len(),
            tags = vocabulary.tags.len(),
            bytes = container.total_bytes,
            "Build complete"
        );

        Ok(BuildReport {
            container,
            vocabulary,
            totals,
            features_aggregated: aggregated,
            features_outside_bounds: outside,
        })
    }

    #[instrument(skip_all, fields(time_slice = %time_slice.key))]
    async fn run_slice(
        &self,
        time_slice: &TimeSlice,
        accumulators: MultiResolutionAccumulator,
        histograms: &mut HistogramAggregator,
        vocabulary: &mut Vocabulary,
        consecutive_failures: &mut usize,
    ) -> PipelineResult<SliceRun> {
        let mut stream = ChunkStream::new(
            &self.fetcher,
            &self.chunks,
            Some(time_slice),
            self.config.chunking.delay(),
        );
        if let Some(kind) = self.config.record_kind.as_deref() {
            stream = stream.with_record_kind(kind);
        }

        let mut run = SliceRun {
            accumulators,
            totals: FetchTotals::default(),
            aggregated: 0,
            outside: 0,
        };

        while let Some(result) = stream.next_chunk().await {
            self.check_failures(&result, time_slice, consecutive_failures)?;
            vocabulary.merge(&result.vocabulary);

            for feature in &result.features {
                let position = feature.position();
                if !self.bounds.contains(position.lon, position.lat) {
                    run.outside += 1;
                    continue;
                }
                run.accumulators.add(feature);
                histograms.record(&time_slice.key, feature);
                run.aggregated += 1;
            }
        }

        run.totals = *stream.totals();
        info!(
            time_slice = %time_slice.key,
            features = run.aggregated,
            raw_records = run.totals.records.total_raw,
            invalid_records = run.totals.records.invalid_skipped,
            failed_chunks = run.totals.failed_chunks,
            "Time slice complete"
        );
        Ok(run)
    }

    fn check_failures(
        &self,
        result: &ChunkResult,
        time_slice: &TimeSlice,
        consecutive_failures: &mut usize,
    ) -> PipelineResult<()> {
        let Some(error) = &result.error else {
            *consecutive_failures = 0;
            return Ok(());
        };

        *consecutive_failures += 1;
        let limit = self.config.max_consecutive_chunk_failures;
        if limit > 0 && *consecutive_failures >= limit {
            return Err(PipelineError::ConsecutiveFailures {
                count: *consecutive_failures,
                time_slice: time_slice.key.clone(),
                last_error: error.clone(),
            });
        }
        Ok(())
    }

    async fn write(
        &self,
        heatmaps: HeatmapResolutions,
        histograms: Histograms,
        metadata: VisualizationMetadata,
    ) -> PipelineResult<WrittenContainer> {
        let output = self.config.output_path.clone();
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let written = tokio::task::spawn_blocking(move || {
            write_container(&output, &heatmaps, &histograms, metadata)
        })
        .await??;
        Ok(written)
    }
}

/// Write both sections and the metadata to `path`.
pub fn write_container(
    path: &Path,
    heatmaps: &HeatmapResolutions,
    histograms: &Histograms,
    metadata: VisualizationMetadata,
) -> PipelineResult<WrittenContainer> {
    let mut writer = ContainerWriter::create(path)?;
    writer.write_heatmaps(heatmaps)?;
    writer.write_histograms(histograms)?;
    let written = writer.finish(metadata)?;
    debug!(path = %path.display(), "Sections flushed");
    Ok(written)
}

/// Plan and run a build in one call.
pub async fn run_pipeline<S: PageSource>(
    config: PresetConfig,
    source: S,
) -> PipelineResult<BuildReport> {
    Pipeline::new(config, source)?.run().await
}
