//! Conversion of accumulated counts into fixed-length heatmap arrays.

use std::collections::BTreeMap;

use atlas_common::{GridDimensions, TimeSlice, Vocabulary};
use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::accumulator::{CellCounts, MultiResolutionAccumulator, SpatialAccumulator};

/// Row-major count and log-density arrays over every cell of a grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
#[serde(rename_all = "camelCase")]
pub struct Heatmap {
    pub count_array: Vec<u32>,
    /// `ln(count + 1) / ln(max + 1)`, all zero when the grid is empty
    pub density_array: Vec<f32>,
}

impl Heatmap {
    pub fn zeroed(cells: usize) -> Self {
        Self {
            count_array: vec![0; cells],
            density_array: vec![0.0; cells],
        }
    }

    /// Build from a dense count array, deriving densities.
    pub fn from_count_array(count_array: Vec<u32>) -> Self {
        let max = count_array.iter().copied().max().unwrap_or(0);
        let density_array = if max == 0 {
            vec![0.0; count_array.len()]
        } else {
            let denominator = (max as f64 + 1.0).ln();
            count_array
                .iter()
                .map(|&count| {
                    if count == 0 {
                        0.0
                    } else {
                        ((count as f64 + 1.0).ln() / denominator).clamp(0.0, 1.0) as f32
                    }
                })
                .collect()
        };

        Self {
            count_array,
            density_array,
        }
    }

    /// Build from sparse counts on the given grid.
    pub fn from_cell_counts(counts: Option<&CellCounts>, dimensions: &GridDimensions) -> Self {
        let Some(counts) = counts else {
            return Self::zeroed(dimensions.len());
        };

        let mut count_array = vec![0u32; dimensions.len()];
        for (cell, &count) in counts {
            if let Some(slot) = count_array.get_mut(cell.index(dimensions.cols_amount)) {
                *slot = count;
            }
        }
        Self::from_count_array(count_array)
    }

    pub fn len(&self) -> usize {
        self.count_array.len()
    }

    pub fn is_empty(&self) -> bool {
        self.count_array.is_empty()
    }

    pub fn max_count(&self) -> u32 {
        self.count_array.iter().copied().max().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.count_array.iter().map(|&c| c as u64).sum()
    }
}

/// Heatmaps for one record kind: all of its records, plus one per tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct RecordKindHeatmaps {
    pub base: Heatmap,
    pub tags: BTreeMap<String, Heatmap>,
}

/// time slice key -> record kind -> heatmaps
pub type HeatmapTimeline = BTreeMap<String, BTreeMap<String, RecordKindHeatmaps>>;

/// resolution key ("75x75") -> timeline
pub type HeatmapResolutions = BTreeMap<String, HeatmapTimeline>;

/// Heatmaps for every kind and tag of `vocabulary`, from one accumulator.
///
/// Kinds and tags without counts get all-zero heatmaps, so the output shape
/// depends only on the vocabulary and the grid.
pub fn generate_heatmaps(
    accumulator: &SpatialAccumulator,
    vocabulary: &Vocabulary,
) -> BTreeMap<String, RecordKindHeatmaps> {
    let dimensions = accumulator.dimensions();

    vocabulary
        .record_kinds
        .iter()
        .map(|kind| {
            let base = Heatmap::from_cell_counts(accumulator.base_counts(kind), dimensions);
            let tags = vocabulary
                .tags
                .iter()
                .map(|tag| {
                    let heatmap =
                        Heatmap::from_cell_counts(accumulator.tag_counts(tag, kind), dimensions);
                    (tag.clone(), heatmap)
                })
                .collect();
            (kind.clone(), RecordKindHeatmaps { base, tags })
        })
        .collect()
}

/// Single-slice timeline for one accumulator.
pub fn generate_heatmap_timeline(
    accumulator: &SpatialAccumulator,
    time_slice: &TimeSlice,
    vocabulary: &Vocabulary,
) -> HeatmapTimeline {
    let mut timeline = HeatmapTimeline::new();
    timeline.insert(
        time_slice.key.clone(),
        generate_heatmaps(accumulator, vocabulary),
    );
    timeline
}

/// Heatmaps for every resolution and slice of a run.
pub fn generate_heatmap_resolutions(
    slices: &[(TimeSlice, MultiResolutionAccumulator)],
    vocabulary: &Vocabulary,
) -> HeatmapResolutions {
    let mut resolutions = HeatmapResolutions::new();

    for (time_slice, accumulators) in slices {
        for accumulator in accumulators.iter() {
            let timeline = resolutions.entry(accumulator.resolution_key()).or_default();
            timeline.insert(
                time_slice.key.clone(),
                generate_heatmaps(accumulator, vocabulary),
            );
        }
        debug!(slice = %time_slice.key, "Generated heatmaps");
    }

    resolutions
}
