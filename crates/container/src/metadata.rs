//! The metadata block at the head of every container.

use std::collections::BTreeMap;

use aggregation::VisualizationStats;
use atlas_common::{
    GridDimensions, HeatmapBlueprint, ResolutionConfig, TimeRange, TimeSlice, Vocabulary,
};
use bincode::{Decode, Encode};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ContainerError, ContainerResult};

/// Format version written into new containers. Readers accept any 2.x.
pub const FORMAT_VERSION: &str = "2.0.0";

/// Byte range of a section, relative to the start of the data region.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct SectionInfo {
    pub offset: u64,
    pub length: u64,
}

impl SectionInfo {
    /// First byte past the section, or `None` if the range overflows.
    pub fn end(&self) -> Option<u64> {
        self.offset.checked_add(self.length)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct SectionTable {
    pub heatmaps: SectionInfo,
    pub histograms: SectionInfo,
}

/// Everything a consumer needs to list periods, kinds, tags and cells
/// without decoding either data section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
#[serde(rename_all = "camelCase")]
pub struct VisualizationMetadata {
    pub version: String,
    /// RFC 3339 generation time
    pub timestamp: String,
    /// Dimensions of the primary resolution
    pub heatmap_dimensions: GridDimensions,
    /// Cells of the primary resolution
    pub heatmap_blueprint: HeatmapBlueprint,
    pub time_slices: Vec<TimeSlice>,
    pub time_range: Option<TimeRange>,
    pub record_kinds: Vec<String>,
    pub tags: Vec<String>,
    pub tag_combinations: Vec<String>,
    pub resolutions: Vec<ResolutionConfig>,
    /// Keyed by resolution key, e.g. "16x16"
    pub resolution_dimensions: BTreeMap<String, GridDimensions>,
    pub sections: SectionTable,
    pub stats: Option<VisualizationStats>,
}

impl VisualizationMetadata {
    /// Metadata for a run. `dimensions` lists every resolution, primary first.
    /// Sections are filled in by the writer.
    pub fn new(
        dimensions: &[GridDimensions],
        time_slices: &[TimeSlice],
        vocabulary: &Vocabulary,
        tag_combinations: impl IntoIterator<Item = String>,
        stats: Option<VisualizationStats>,
    ) -> ContainerResult<Self> {
        let primary = dimensions.first().copied().ok_or_else(|| {
            ContainerError::InvalidMetadata("at least one resolution is required".to_string())
        })?;

        Ok(Self {
            version: FORMAT_VERSION.to_string(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            heatmap_dimensions: primary,
            heatmap_blueprint: primary.blueprint(),
            time_slices: time_slices.to_vec(),
            time_range: TimeRange::spanning(time_slices),
            record_kinds: vocabulary.record_kinds.iter().cloned().collect(),
            tags: vocabulary.tags.iter().cloned().collect(),
            tag_combinations: tag_combinations.into_iter().collect(),
            resolutions: dimensions.iter().map(GridDimensions::resolution).collect(),
            resolution_dimensions: dimensions
                .iter()
                .map(|dims| (dims.resolution().key(), *dims))
                .collect(),
            sections: SectionTable::default(),
            stats,
        })
    }

    /// Whether this reader understands the container's major version.
    pub fn is_supported_version(&self) -> bool {
        let wanted = FORMAT_VERSION.split('.').next();
        self.version.split('.').next() == wanted
    }

    pub fn resolution_keys(&self) -> Vec<String> {
        self.resolutions.iter().map(ResolutionConfig::key).collect()
    }
}
