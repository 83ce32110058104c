//! Time-atlas preprocessor.
//!
//! Pulls geotagged historical records from the upstream archive for every
//! configured time slice, aggregates them into multi-resolution heatmaps and
//! temporal histograms, and writes everything into a single binary container.

pub mod config;
pub mod error;
pub mod inspect;
pub mod pipeline;

pub use config::{BoundsConfig, PresetConfig, PresetFile, PRODUCTION_PRESET};
pub use error::{PipelineError, PipelineResult};
pub use pipeline::{run_pipeline, write_container, BuildReport, Pipeline};
