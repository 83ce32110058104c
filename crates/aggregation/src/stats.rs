//! Summary statistics stored alongside an artifact.

use std::collections::BTreeMap;

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::heatmap::HeatmapResolutions;
use crate::histogram::Histograms;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Encode, Decode)]
#[serde(rename_all = "camelCase")]
pub struct VisualizationStats {
    pub total_features: u64,
    pub features_per_record_kind: BTreeMap<String, u64>,
    pub time_slice_count: usize,
    pub grid_cell_count: usize,
    pub resolution_count: usize,
}

impl VisualizationStats {
    /// Totals from the primary resolution's heatmaps, or from the histograms
    /// when no heatmaps were produced.
    pub fn compute(
        heatmaps: &HeatmapResolutions,
        primary_resolution: &str,
        histograms: &Histograms,
        time_slice_count: usize,
    ) -> Self {
        let mut features_per_record_kind = BTreeMap::new();
        let mut grid_cell_count = 0;

        match heatmaps.get(primary_resolution) {
            Some(timeline) if !timeline.is_empty() => {
                for by_kind in timeline.values() {
                    for (kind, kind_heatmaps) in by_kind {
                        *features_per_record_kind.entry(kind.clone()).or_insert(0) +=
                            kind_heatmaps.base.total();
                        grid_cell_count = kind_heatmaps.base.len();
                    }
                }
            }
            _ => {
                for (kind, kind_histograms) in histograms {
                    features_per_record_kind.insert(kind.clone(), kind_histograms.base.total_features);
                }
            }
        }

        Self {
            total_features: features_per_record_kind.values().sum(),
            features_per_record_kind,
            time_slice_count,
            grid_cell_count,
            resolution_count: heatmaps.len(),
        }
    }
}
