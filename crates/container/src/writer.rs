//! Streaming container writer.
//!
//! Sections are encoded straight into an anonymous spool file as they are
//! produced, so only one section is ever being encoded at a time. Once both
//! are written, `finish` knows every length: it writes the header and
//! metadata into a temporary file next to the target, appends the spool,
//! and renames the result into place.

use std::fs::File;
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use aggregation::{HeatmapResolutions, Histograms};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{ContainerError, ContainerResult};
use crate::metadata::{SectionInfo, SectionTable, VisualizationMetadata};
use crate::{bincode_config, HEADER_LEN};

pub struct ContainerWriter {
    output_path: PathBuf,
    spool: BufWriter<File>,
    spooled: u64,
    heatmaps: Option<SectionInfo>,
    histograms: Option<SectionInfo>,
}

/// Summary of a finished container.
#[derive(Debug, Clone)]
pub struct WrittenContainer {
    pub path: PathBuf,
    pub metadata: VisualizationMetadata,
    pub metadata_length: u32,
    pub total_bytes: u64,
}

impl ContainerWriter {
    /// Start a container that will be written to `output_path` on `finish`.
    pub fn create(output_path: impl AsRef<Path>) -> ContainerResult<Self> {
        let spool = tempfile::tempfile()?;
        Ok(Self {
            output_path: output_path.as_ref().to_path_buf(),
            spool: BufWriter::new(spool),
            spooled: 0,
            heatmaps: None,
            histograms: None,
        })
    }

    /// Append the heatmaps section. Must come first.
    pub fn write_heatmaps(&mut self, heatmaps: &HeatmapResolutions) -> ContainerResult<SectionInfo> {
        if self.heatmaps.is_some() {
            return Err(ContainerError::section_order("heatmaps", "already written"));
        }
        if self.histograms.is_some() {
            return Err(ContainerError::section_order(
                "heatmaps",
                "must be written before histograms",
            ));
        }

        let section = self.append(heatmaps)?;
        debug!(bytes = section.length, "Spooled heatmaps section");
        self.heatmaps = Some(section);
        Ok(section)
    }

    /// Append the histograms section. Must follow the heatmaps.
    pub fn write_histograms(&mut self, histograms: &Histograms) -> ContainerResult<SectionInfo> {
        if self.histograms.is_some() {
            return Err(ContainerError::section_order("histograms", "already written"));
        }
        if self.heatmaps.is_none() {
            return Err(ContainerError::section_order(
                "histograms",
                "heatmaps must be written first",
            ));
        }

        let section = self.append(histograms)?;
        debug!(bytes = section.length, "Spooled histograms section");
        self.histograms = Some(section);
        Ok(section)
    }

    fn append<T: bincode::Encode>(&mut self, value: &T) -> ContainerResult<SectionInfo> {
        let offset = self.spooled;
        let length = bincode::encode_into_std_write(value, &mut self.spool, bincode_config())? as u64;
        self.spooled += length;
        Ok(SectionInfo { offset, length })
    }

    /// Write `[u32 BE length][metadata][heatmaps][histograms]` to the output
    /// path. `metadata.sections` is overwritten with the real offsets.
    pub fn finish(self, mut metadata: VisualizationMetadata) -> ContainerResult<WrittenContainer> {
        let heatmaps = self.heatmaps.ok_or(ContainerError::MissingSection("heatmaps"))?;
        let histograms = self
            .histograms
            .ok_or(ContainerError::MissingSection("histograms"))?;
        metadata.sections = SectionTable {
            heatmaps,
            histograms,
        };

        let metadata_bytes = bincode::encode_to_vec(&metadata, bincode_config())?;
        let metadata_length = u32::try_from(metadata_bytes.len())
            .map_err(|_| ContainerError::MetadataTooLarge(metadata_bytes.len()))?;

        let mut spool = self.spool.into_inner().map_err(|e| e.into_error())?;
        spool.seek(SeekFrom::Start(0))?;

        let parent = match self.output_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let staged = NamedTempFile::new_in(&parent)?;
        let mut out = BufWriter::new(staged);
        out.write_all(&metadata_length.to_be_bytes())?;
        out.write_all(&metadata_bytes)?;
        let copied = io::copy(&mut spool, &mut out)?;
        if copied != self.spooled {
            return Err(ContainerError::Truncated {
                expected: self.spooled,
                actual: copied,
            });
        }
        out.flush()?;

        let staged = out.into_inner().map_err(|e| e.into_error())?;
        staged.as_file().sync_all()?;
        staged
            .persist(&self.output_path)
            .map_err(|e| ContainerError::Io(e.error))?;

        let total_bytes = HEADER_LEN + metadata_length as u64 + self.spooled;
        info!(
            path = %self.output_path.display(),
            metadata_bytes = metadata_length,
            heatmaps_bytes = heatmaps.length,
            histograms_bytes = histograms.length,
            total_bytes,
            "Container written"
        );

        Ok(WrittenContainer {
            path: self.output_path,
            metadata,
            metadata_length,
            total_bytes,
        })
    }
}
