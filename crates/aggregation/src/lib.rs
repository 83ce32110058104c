//! Aggregation of normalized features into heatmaps and histograms.
//!
//! One pass over the fetched features fans out into:
//! - a [`SpatialAccumulator`] per configured grid resolution, counting
//!   features per cell for every record kind and every tag
//! - a [`HistogramAggregator`] counting features per time slice for every
//!   record kind, tag and tag combination
//!
//! After the run, the accumulated counts are turned into fixed-shape
//! [`Heatmap`]s and [`Histogram`]s using the run-wide vocabulary, so that
//! every time slice exposes the same keys even when a kind or tag has no
//! occurrences there.

pub mod accumulator;
pub mod heatmap;
pub mod histogram;
pub mod stats;

pub use accumulator::{CellCounts, MultiResolutionAccumulator, SpatialAccumulator};
pub use heatmap::{
    generate_heatmap_resolutions, generate_heatmap_timeline, generate_heatmaps, Heatmap,
    HeatmapResolutions, HeatmapTimeline, RecordKindHeatmaps,
};
pub use histogram::{
    tag_combination_key, tag_combinations, Histogram, HistogramAggregator, HistogramBin,
    Histograms, RecordKindHistograms,
};
pub use stats::VisualizationStats;
