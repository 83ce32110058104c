//! Binary container for visualization artifacts.
//!
//! # Layout
//!
//! ```text
//! offset 0        u32 big-endian   metadata length M
//! offset 4        M bytes          VisualizationMetadata
//! offset 4+M      H bytes          heatmaps section
//! offset 4+M+H    G bytes          histograms section
//! ```
//!
//! Every block is bincode-encoded with the standard configuration. Section
//! offsets in the metadata are relative to the start of the data region
//! (`4 + M`), so either section can be read with one seek and one read,
//! and metadata-only queries never touch the sections at all.

pub mod error;
pub mod metadata;
pub mod reader;
pub mod writer;

pub use error::{ContainerError, ContainerResult};
pub use metadata::{SectionInfo, SectionTable, VisualizationMetadata, FORMAT_VERSION};
pub use reader::{read_metadata, ContainerReader, Section};
pub use writer::{ContainerWriter, WrittenContainer};

/// Size of the big-endian metadata length prefix.
pub const HEADER_LEN: u64 = 4;

pub(crate) fn bincode_config() -> bincode::config::Configuration {
    bincode::config::standard()
}
