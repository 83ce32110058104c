//! Common types shared across the time-atlas crates.
//!
//! Everything here is plain data: bounding boxes, calendar slices, grid
//! geometry, normalized features and the discovered vocabulary. The fetch,
//! aggregation and container crates all speak in these types.

pub mod bbox;
pub mod error;
pub mod feature;
pub mod grid;
pub mod time;
pub mod vocabulary;

pub use bbox::{BboxParseError, BoundingBox};
pub use error::{AtlasError, AtlasResult};
pub use feature::{Coordinates, FeatureError, Geometry, ProcessedFeature};
pub use grid::{BlueprintCell, CellId, GridDimensions, HeatmapBlueprint, ResolutionConfig};
pub use time::{TimeRange, TimeSlice};
pub use vocabulary::Vocabulary;
