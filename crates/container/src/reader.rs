//! Random-access container reader.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use aggregation::{HeatmapResolutions, Histograms};
use bincode::Decode;

use crate::error::{ContainerError, ContainerResult};
use crate::metadata::{SectionInfo, VisualizationMetadata};
use crate::{bincode_config, HEADER_LEN};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Heatmaps,
    Histograms,
}

impl Section {
    pub fn name(&self) -> &'static str {
        match self {
            Section::Heatmaps => "heatmaps",
            Section::Histograms => "histograms",
        }
    }
}

/// Reads a container's metadata on open, and sections on demand.
#[derive(Debug)]
pub struct ContainerReader {
    file: File,
    metadata: VisualizationMetadata,
    metadata_length: u32,
    file_length: u64,
}

impl ContainerReader {
    /// Open a container, decoding only the header and metadata.
    pub fn open(path: impl AsRef<Path>) -> ContainerResult<Self> {
        let mut file = File::open(path.as_ref())?;
        let file_length = file.metadata()?.len();

        let (metadata, metadata_length) = {
            let mut reader = BufReader::new(&mut file);
            read_header(&mut reader, file_length)?
        };

        if !metadata.is_supported_version() {
            return Err(ContainerError::UnsupportedVersion(metadata.version.clone()));
        }

        let end = data_end(&metadata, metadata_length)?;
        if end > file_length {
            return Err(ContainerError::Truncated {
                expected: end,
                actual: file_length,
            });
        }

        Ok(Self {
            file,
            metadata,
            metadata_length,
            file_length,
        })
    }

    pub fn metadata(&self) -> &VisualizationMetadata {
        &self.metadata
    }

    pub fn into_metadata(self) -> VisualizationMetadata {
        self.metadata
    }

    pub fn metadata_length(&self) -> u32 {
        self.metadata_length
    }

    pub fn file_length(&self) -> u64 {
        self.file_length
    }

    /// Absolute file offset of the first byte after the metadata.
    pub fn data_offset(&self) -> u64 {
        HEADER_LEN + self.metadata_length as u64
    }

    pub fn section_info(&self, section: Section) -> SectionInfo {
        match section {
            Section::Heatmaps => self.metadata.sections.heatmaps,
            Section::Histograms => self.metadata.sections.histograms,
        }
    }

    /// Raw bytes of one section: a single seek to `4 + M + offset` and an
    /// exact read of `length` bytes.
    pub fn section_bytes(&mut self, section: Section) -> ContainerResult<Vec<u8>> {
        let info = self.section_info(section);
        let length = usize::try_from(info.length).map_err(|_| {
            ContainerError::InvalidMetadata(format!("{} section length overflows", section.name()))
        })?;

        self.file
            .seek(SeekFrom::Start(self.data_offset() + info.offset))?;
        let mut bytes = vec![0u8; length];
        self.file.read_exact(&mut bytes)?;
        Ok(bytes)
    }

    pub fn read_heatmaps(&mut self) -> ContainerResult<HeatmapResolutions> {
        let bytes = self.section_bytes(Section::Heatmaps)?;
        decode_exact(&bytes, Section::Heatmaps.name())
    }

    pub fn read_histograms(&mut self) -> ContainerResult<Histograms> {
        let bytes = self.section_bytes(Section::Histograms)?;
        decode_exact(&bytes, Section::Histograms.name())
    }
}

/// Read just the metadata of a container.
pub fn read_metadata(path: impl AsRef<Path>) -> ContainerResult<VisualizationMetadata> {
    Ok(ContainerReader::open(path)?.into_metadata())
}

fn read_header<R: Read>(reader: &mut R, file_length: u64) -> ContainerResult<(VisualizationMetadata, u32)> {
    if file_length < HEADER_LEN {
        return Err(ContainerError::Truncated {
            expected: HEADER_LEN,
            actual: file_length,
        });
    }

    let mut prefix = [0u8; 4];
    reader.read_exact(&mut prefix)?;
    let metadata_length = u32::from_be_bytes(prefix);

    let expected = HEADER_LEN + metadata_length as u64;
    if expected > file_length {
        return Err(ContainerError::Truncated {
            expected,
            actual: file_length,
        });
    }

    let mut metadata_bytes = vec![0u8; metadata_length as usize];
    reader.read_exact(&mut metadata_bytes)?;
    let metadata = decode_exact(&metadata_bytes, "metadata")?;
    Ok((metadata, metadata_length))
}

/// Absolute offset of the end of the last section.
fn data_end(metadata: &VisualizationMetadata, metadata_length: u32) -> ContainerResult<u64> {
    let section_end = |section: Section, info: SectionInfo| {
        info.end().ok_or_else(|| {
            ContainerError::InvalidMetadata(format!("{} section range overflows", section.name()))
        })
    };
    let heatmaps = section_end(Section::Heatmaps, metadata.sections.heatmaps)?;
    let histograms = section_end(Section::Histograms, metadata.sections.histograms)?;

    (HEADER_LEN + metadata_length as u64)
        .checked_add(heatmaps.max(histograms))
        .ok_or_else(|| ContainerError::InvalidMetadata("section table overflows".to_string()))
}

fn decode_exact<T: Decode<()>>(bytes: &[u8], what: &str) -> ContainerResult<T> {
    let (value, consumed) = bincode::decode_from_slice(bytes, bincode_config())?;
    if consumed != bytes.len() {
        return Err(ContainerError::InvalidMetadata(format!(
            "{} block has {} trailing bytes",
            what,
            bytes.len() - consumed
        )));
    }
    Ok(value)
}
