//! Run presets.
//!
//! Presets are loaded from a YAML file of named entries, or taken from the
//! built-in `production` preset. Environment variables override individual
//! values after loading.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use atlas_common::{AtlasError, AtlasResult, BoundingBox, ResolutionConfig, TimeSlice};
use record_source::{ChunkingConfig, DatabaseConfig};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const PRODUCTION_PRESET: &str = "production";

/// Unpadded run bounds in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundsConfig {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundsConfig {
    pub fn to_bbox(&self) -> BoundingBox {
        BoundingBox::new(self.min_lon, self.min_lat, self.max_lon, self.max_lat)
    }
}

/// Everything one build needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresetConfig {
    pub database: DatabaseConfig,
    pub bounds: BoundsConfig,
    /// Fraction of the width and height added on every side of `bounds`
    #[serde(default)]
    pub padding: f64,
    /// Grid resolutions; the first is the primary one
    pub resolutions: Vec<ResolutionConfig>,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    /// `[start_year, end_year)` pairs
    pub time_periods: Vec<(i32, i32)>,
    /// Only fetch records of this kind
    #[serde(default)]
    pub record_kind: Option<String>,
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
    #[serde(default = "default_max_tag_combination_size")]
    pub max_tag_combination_size: usize,
    /// Abort after this many failed chunks in a row. 0 disables the check.
    #[serde(default = "default_max_consecutive_chunk_failures")]
    pub max_consecutive_chunk_failures: usize,
    /// Write a container even when no valid features were fetched
    #[serde(default)]
    pub allow_empty: bool,
}

fn default_output_path() -> PathBuf {
    PathBuf::from("./visualization.bin")
}

/// Tag combinations grow combinatorially with this size.
pub const MAX_TAG_COMBINATION_SIZE: usize = 4;

fn default_max_tag_combination_size() -> usize {
    2
}

fn default_max_consecutive_chunk_failures() -> usize {
    8
}

/// A YAML file of named presets.
#[derive(Debug, Clone, Deserialize)]
pub struct PresetFile {
    pub presets: BTreeMap<String, PresetConfig>,
}

impl PresetFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read presets file: {}", path.display()))?;

        let file: PresetFile = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse presets file: {}", path.display()))?;

        debug!(path = %path.display(), presets = file.presets.len(), "Loaded presets");
        Ok(file)
    }

    pub fn preset(&self, name: &str) -> Result<PresetConfig> {
        self.presets.get(name).cloned().ok_or_else(|| {
            let known: Vec<&str> = self.presets.keys().map(String::as_str).collect();
            anyhow!("Unknown preset '{}', available: {}", name, known.join(", "))
        })
    }
}

impl PresetConfig {
    /// Settings used against the production archive for Amsterdam.
    pub fn production() -> Self {
        Self {
            database: DatabaseConfig::new("https://atmbackend.create.humanities.uva.nl"),
            bounds: BoundsConfig {
                min_lon: 4.81,
                min_lat: 52.2354339,
                max_lon: 4.964447,
                max_lat: 52.4443,
            },
            padding: 0.05,
            resolutions: vec![
                ResolutionConfig::new(75, 75),
                ResolutionConfig::new(8, 8),
                ResolutionConfig::new(16, 16),
            ],
            chunking: ChunkingConfig::default(),
            time_periods: vec![
                (1500, 1550),
                (1550, 1600),
                (1600, 1650),
                (1650, 1700),
                (1700, 1750),
                (1750, 1800),
                (1800, 1850),
                (1850, 1900),
                (1900, 1950),
                (1950, 2000),
                (2000, 2025),
            ],
            record_kind: None,
            output_path: default_output_path(),
            max_tag_combination_size: default_max_tag_combination_size(),
            max_consecutive_chunk_failures: default_max_consecutive_chunk_failures(),
            allow_empty: false,
        }
    }

    /// Resolve a preset by name, from `presets_file` when given. Without a
    /// file only the built-in production preset is known.
    pub fn resolve(presets_file: Option<&Path>, name: &str) -> Result<Self> {
        match presets_file {
            Some(path) => PresetFile::load(path)?.preset(name),
            None if name == PRODUCTION_PRESET => Ok(Self::production()),
            None => Err(anyhow!(
                "Preset '{}' requested but no presets file was given",
                name
            )),
        }
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from `lookup`, keyed by environment variable name.
    /// Values that do not parse are ignored with a warning.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("DATABASE_BASE_URL").filter(|v| !v.trim().is_empty()) {
            self.database.base_url = url;
        }
        override_with(&lookup, "DATABASE_BATCH_SIZE", &mut self.database.batch_size);
        override_with(&lookup, "DATABASE_TIMEOUT", &mut self.database.timeout_ms);

        override_with(&lookup, "BOUNDS_MIN_LON", &mut self.bounds.min_lon);
        override_with(&lookup, "BOUNDS_MAX_LON", &mut self.bounds.max_lon);
        override_with(&lookup, "BOUNDS_MIN_LAT", &mut self.bounds.min_lat);
        override_with(&lookup, "BOUNDS_MAX_LAT", &mut self.bounds.max_lat);

        if let Some(primary) = self.resolutions.first_mut() {
            override_with(&lookup, "GRID_COLS", &mut primary.cols);
            override_with(&lookup, "GRID_ROWS", &mut primary.rows);
        }
        override_with(&lookup, "GRID_PADDING", &mut self.padding);

        override_with(&lookup, "CHUNK_ROWS", &mut self.chunking.chunk_rows);
        override_with(&lookup, "CHUNK_COLS", &mut self.chunking.chunk_cols);
        override_with(&lookup, "CHUNK_OVERLAP", &mut self.chunking.overlap);
        override_with(&lookup, "CHUNK_DELAY_MS", &mut self.chunking.delay_ms);

        if let Some(path) = lookup("OUTPUT_PATH").filter(|v| !v.trim().is_empty()) {
            self.output_path = PathBuf::from(path);
        }
    }

    /// Check everything that can be checked before touching the network.
    pub fn validate(&self) -> AtlasResult<()> {
        self.database.validate()?;
        self.chunking.validate()?;
        self.bounds.to_bbox().validate()?;

        if !self.padding.is_finite() || self.padding < 0.0 {
            return Err(AtlasError::invalid_config(
                "padding",
                format!("must be a finite value >= 0, got {}", self.padding),
            ));
        }
        if self.resolutions.is_empty() {
            return Err(AtlasError::invalid_config(
                "resolutions",
                "at least one resolution is required",
            ));
        }
        if let Some(bad) = self.resolutions.iter().find(|r| r.cols == 0 || r.rows == 0) {
            return Err(AtlasError::InvalidResolution(format!(
                "{} has an empty axis",
                bad.key()
            )));
        }
        if self.time_periods.is_empty() {
            return Err(AtlasError::invalid_config(
                "time_periods",
                "at least one period is required",
            ));
        }
        if !(1..=MAX_TAG_COMBINATION_SIZE).contains(&self.max_tag_combination_size) {
            return Err(AtlasError::invalid_config(
                "max_tag_combination_size",
                format!(
                    "must be between 1 and {}, got {}",
                    MAX_TAG_COMBINATION_SIZE, self.max_tag_combination_size
                ),
            ));
        }

        self.time_slices().map(|_| ())
    }

    /// The configured bounds expanded by `padding`.
    pub fn run_bounds(&self) -> BoundingBox {
        self.bounds.to_bbox().pad(self.padding)
    }

    pub fn time_slices(&self) -> AtlasResult<Vec<TimeSlice>> {
        TimeSlice::from_periods(&self.time_periods)
    }
}

fn override_with<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, target: &mut T) {
    let Some(raw) = lookup(key) else {
        return;
    };
    match raw.trim().parse::<T>() {
        Ok(value) => *target = value,
        Err(_) => warn!(variable = key, value = %raw, "Ignoring unparsable environment override"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_production_preset_is_valid() {
        let preset = PresetConfig::production();
        assert!(preset.validate().is_ok());
        assert_eq!(preset.time_slices().unwrap().len(), 11);
        assert_eq!(preset.resolutions[0].key(), "75x75");

        let bounds = preset.run_bounds();
        assert!(bounds.min_lon < 4.81);
        assert!(bounds.max_lat > 52.4443);
    }

    #[test]
    fn test_env_overrides() {
        let mut preset = PresetConfig::production();
        preset.apply_overrides(lookup(&[
            ("DATABASE_BASE_URL", "http://localhost:9000"),
            ("DATABASE_BATCH_SIZE", "500"),
            ("GRID_COLS", "40"),
            ("CHUNK_DELAY_MS", "0"),
            ("OUTPUT_PATH", "/tmp/atlas.bin"),
        ]));

        assert_eq!(preset.database.base_url, "http://localhost:9000");
        assert_eq!(preset.database.batch_size, 500);
        assert_eq!(preset.resolutions[0], ResolutionConfig::new(40, 75));
        assert_eq!(preset.chunking.delay_ms, 0);
        assert_eq!(preset.output_path, PathBuf::from("/tmp/atlas.bin"));
    }

    #[test]
    fn test_unparsable_override_ignored() {
        let mut preset = PresetConfig::production();
        preset.apply_overrides(lookup(&[("CHUNK_ROWS", "many"), ("GRID_PADDING", "0.1")]));
        assert_eq!(preset.chunking.chunk_rows, 4);
        assert_eq!(preset.padding, 0.1);
    }

    #[test]
    fn test_validation_failures() {
        let mut preset = PresetConfig::production();
        preset.bounds.min_lon = 10.0;
        assert!(preset.validate().is_err());

        let mut preset = PresetConfig::production();
        preset.resolutions.clear();
        assert!(preset.validate().is_err());

        let mut preset = PresetConfig::production();
        preset.time_periods = vec![(1950, 1900)];
        assert!(preset.validate().is_err());

        let mut preset = PresetConfig::production();
        preset.chunking.overlap = -0.1;
        assert!(preset.validate().is_err());

        let mut preset = PresetConfig::production();
        preset.database.batch_size = 0;
        assert!(preset.validate().is_err());

        let mut preset = PresetConfig::production();
        preset.max_tag_combination_size = 0;
        assert!(preset.validate().is_err());
        preset.max_tag_combination_size = MAX_TAG_COMBINATION_SIZE;
        assert!(preset.validate().is_ok());
        preset.max_tag_combination_size = MAX_TAG_COMBINATION_SIZE + 1;
        assert!(preset.validate().is_err());
    }

    #[test]
    fn test_parse_presets_yaml() {
        let yaml = r#"
presets:
  local:
    database:
      base_url: "http://localhost:8080"
      batch_size: 100
    bounds:
      min_lon: 4.8
      min_lat: 52.3
      max_lon: 5.0
      max_lat: 52.4
    resolutions:
      - { cols: 10, rows: 10 }
    chunking:
      chunk_rows: 2
      chunk_cols: 2
    time_periods: [[1900, 1950], [1950, 2000]]
"#;
        let file: PresetFile = serde_yaml::from_str(yaml).unwrap();
        let preset = file.preset("local").unwrap();

        assert_eq!(preset.database.timeout_ms, 30_000);
        assert_eq!(preset.chunking.delay_ms, 50);
        assert_eq!(preset.padding, 0.0);
        assert_eq!(preset.max_tag_combination_size, 2);
        assert_eq!(preset.output_path, PathBuf::from("./visualization.bin"));
        assert!(preset.validate().is_ok());
        assert!(file.preset("missing").is_err());
    }

    #[test]
    fn test_shipped_presets_match_builtin() {
        let file: PresetFile =
            serde_yaml::from_str(include_str!("../config/presets.yaml")).unwrap();
        assert_eq!(file.preset(PRODUCTION_PRESET).unwrap(), PresetConfig::production());
        assert!(file.preset("local").unwrap().validate().is_ok());
    }

    #[test]
    fn test_resolve_without_file() {
        assert!(PresetConfig::resolve(None, PRODUCTION_PRESET).is_ok());
        assert!(PresetConfig::resolve(None, "local").is_err());
    }
}
