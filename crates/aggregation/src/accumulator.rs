//! Per-cell occurrence counts for one or more grid resolutions.

use std::collections::{HashMap, HashSet};

use atlas_common::{
    AtlasError, AtlasResult, BoundingBox, CellId, GridDimensions, ProcessedFeature,
    ResolutionConfig,
};

/// Sparse counts keyed by cell.
pub type CellCounts = HashMap<CellId, u32>;

/// Counts for a single grid resolution.
///
/// `base` maps record kind to cell counts; `tags` maps tag to record kind
/// to cell counts. Lookups for kinds or tags never seen return zero.
#[derive(Debug, Clone)]
pub struct SpatialAccumulator {
    dimensions: GridDimensions,
    base: HashMap<String, CellCounts>,
    tags: HashMap<String, HashMap<String, CellCounts>>,
    accepted: u64,
    dropped: u64,
}

impl SpatialAccumulator {
    pub fn new(dimensions: GridDimensions) -> Self {
        Self {
            dimensions,
            base: HashMap::new(),
            tags: HashMap::new(),
            accepted: 0,
            dropped: 0,
        }
    }

    pub fn dimensions(&self) -> &GridDimensions {
        &self.dimensions
    }

    /// Key of this accumulator's resolution, e.g. "75x75".
    pub fn resolution_key(&self) -> String {
        self.dimensions.resolution().key()
    }

    /// Count a feature. Returns `false` when its position lies outside the
    /// grid, in which case nothing is counted.
    pub fn add(&mut self, feature: &ProcessedFeature) -> bool {
        let Some(cell) = self.dimensions.cell_for(feature.position()) else {
            self.dropped += 1;
            return false;
        };

        *self
            .base
            .entry(feature.record_kind.clone())
            .or_default()
            .entry(cell)
            .or_insert(0) += 1;

        for tag in &feature.tags {
            *self
                .tags
                .entry(tag.clone())
                .or_default()
                .entry(feature.record_kind.clone())
                .or_default()
                .entry(cell)
                .or_insert(0) += 1;
        }

        self.accepted += 1;
        true
    }

    pub fn count(&self, record_kind: &str, cell: CellId) -> u32 {
        self.base_counts(record_kind)
            .and_then(|counts| counts.get(&cell).copied())
            .unwrap_or(0)
    }

    pub fn tag_count(&self, tag: &str, record_kind: &str, cell: CellId) -> u32 {
        self.tag_counts(tag, record_kind)
            .and_then(|counts| counts.get(&cell).copied())
            .unwrap_or(0)
    }

    pub fn base_counts(&self, record_kind: &str) -> Option<&CellCounts> {
        self.base.get(record_kind)
    }

    pub fn tag_counts(&self, tag: &str, record_kind: &str) -> Option<&CellCounts> {
        self.tags.get(tag).and_then(|by_kind| by_kind.get(record_kind))
    }

    /// Features counted so far.
    pub fn accepted(&self) -> u64 {
        self.accepted
    }

    /// Features rejected as outside the grid.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

/// One [`SpatialAccumulator`] per resolution, fed from a single stream.
///
/// Accumulators keep the order the resolutions were configured in; the
/// first one is the primary resolution.
#[derive(Debug, Clone)]
pub struct MultiResolutionAccumulator {
    accumulators: Vec<SpatialAccumulator>,
}

impl MultiResolutionAccumulator {
    pub fn new(bounds: &BoundingBox, resolutions: &[ResolutionConfig]) -> AtlasResult<Self> {
        if resolutions.is_empty() {
            return Err(AtlasError::InvalidResolution(
                "at least one resolution is required".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        let mut accumulators = Vec::with_capacity(resolutions.len());
        for resolution in resolutions {
            if !seen.insert(resolution.key()) {
                return Err(AtlasError::InvalidResolution(format!(
                    "{} is configured twice",
                    resolution.key()
                )));
            }
            let dimensions = GridDimensions::from_bounds(bounds, resolution)?;
            accumulators.push(SpatialAccumulator::new(dimensions));
        }

        Ok(Self { accumulators })
    }

    /// Project a feature into every resolution.
    pub fn add(&mut self, feature: &ProcessedFeature) {
        for accumulator in &mut self.accumulators {
            accumulator.add(feature);
        }
    }

    pub fn fold<'a>(&mut self, features: impl IntoIterator<Item = &'a ProcessedFeature>) {
        for feature in features {
            self.add(feature);
        }
    }

    pub fn get(&self, resolution_key: &str) -> Option<&SpatialAccumulator> {
        self.accumulators
            .iter()
            .find(|accumulator| accumulator.resolution_key() == resolution_key)
    }

    pub fn primary(&self) -> &SpatialAccumulator {
        &self.accumulators[0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &SpatialAccumulator> {
        self.accumulators.iter()
    }

    pub fn len(&self) -> usize {
        self.accumulators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accumulators.is_empty()
    }

    /// Fresh, empty accumulators with the same grids.
    pub fn empty_like(&self) -> Self {
        Self {
            accumulators: self
                .accumulators
                .iter()
                .map(|accumulator| SpatialAccumulator::new(accumulator.dimensions))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlas_common::Geometry;
    use std::collections::BTreeSet;

    fn feature(kind: &str, lon: f64, lat: f64, tags: &[&str]) -> ProcessedFeature {
        ProcessedFeature {
            title: String::new(),
            dataset: String::new(),
            url: String::new(),
            record_kind: kind.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect::<BTreeSet<_>>(),
            start_year: 1900,
            end_year: 1901,
            geometry: Geometry::point(lon, lat),
        }
    }

    fn accumulator() -> SpatialAccumulator {
        let bounds = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let dims = GridDimensions::from_bounds(&bounds, &ResolutionConfig::new(10, 10)).unwrap();
        SpatialAccumulator::new(dims)
    }

    #[test]
    fn test_add_counts_base_and_tags() {
        let mut acc = accumulator();
        assert!(acc.add(&feature("image", 2.5, 3.5, &["historic", "canal"])));
        assert!(acc.add(&feature("image", 2.6, 3.4, &["historic"])));

        let cell = CellId::new(3, 2);
        assert_eq!(acc.count("image", cell), 2);
        assert_eq!(acc.tag_count("historic", "image", cell), 2);
        assert_eq!(acc.tag_count("canal", "image", cell), 1);
        assert_eq!(acc.accepted(), 2);
    }

    #[test]
    fn test_unknown_keys_are_zero() {
        let acc = accumulator();
        assert_eq!(acc.count("never-seen", CellId::new(0, 0)), 0);
        assert_eq!(acc.tag_count("nope", "image", CellId::new(0, 0)), 0);
        assert!(acc.base_counts("never-seen").is_none());
    }

    #[test]
    fn test_outside_feature_is_dropped() {
        let mut acc = accumulator();
        assert!(!acc.add(&feature("text", 11.0, 5.0, &["x"])));
        assert_eq!(acc.dropped(), 1);
        assert_eq!(acc.accepted(), 0);
        assert!(acc.tag_counts("x", "text").is_none());
    }

    #[test]
    fn test_multi_resolution_rejects_duplicates() {
        let bounds = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let resolutions = [ResolutionConfig::new(8, 8), ResolutionConfig::new(8, 8)];
        assert!(MultiResolutionAccumulator::new(&bounds, &resolutions).is_err());
        assert!(MultiResolutionAccumulator::new(&bounds, &[]).is_err());
    }
}
