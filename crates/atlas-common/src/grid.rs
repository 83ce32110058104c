//! Regular lon/lat grids used for heatmap accumulation.

use std::fmt;
use std::str::FromStr;

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::bbox::BoundingBox;
use crate::error::{AtlasError, AtlasResult};
use crate::feature::Coordinates;

/// Requested grid resolution in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode)]
pub struct ResolutionConfig {
    pub cols: usize,
    pub rows: usize,
}

impl ResolutionConfig {
    pub fn new(cols: usize, rows: usize) -> Self {
        Self { cols, rows }
    }

    /// Key used for this resolution in every keyed structure, e.g. "75x75".
    pub fn key(&self) -> String {
        format!("{}x{}", self.cols, self.rows)
    }
}

/// Position of a cell on a grid. Rows count up from `min_lat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId {
    pub row: usize,
    pub col: usize,
}

impl CellId {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Row-major linear index on a grid with `cols` columns.
    pub fn index(&self, cols: usize) -> usize {
        self.row * cols + self.col
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.row, self.col)
    }
}

impl FromStr for CellId {
    type Err = AtlasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AtlasError::invalid_config("cell_id", format!("expected 'row_col', got '{}'", s));
        let (row, col) = s.split_once('_').ok_or_else(invalid)?;
        Ok(Self {
            row: row.parse().map_err(|_| invalid())?,
            col: col.parse().map_err(|_| invalid())?,
        })
    }
}

/// Geometry of one grid resolution over a bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Encode, Decode)]
#[serde(rename_all = "camelCase")]
pub struct GridDimensions {
    pub cols_amount: usize,
    pub rows_amount: usize,
    pub cell_width: f64,
    pub cell_height: f64,
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

impl GridDimensions {
    /// Derive grid dimensions from run bounds and a resolution.
    pub fn from_bounds(bounds: &BoundingBox, resolution: &ResolutionConfig) -> AtlasResult<Self> {
        bounds.validate()?;
        if resolution.cols == 0 || resolution.rows == 0 {
            return Err(AtlasError::InvalidResolution(format!(
                "{} has an empty axis",
                resolution.key()
            )));
        }

        Ok(Self {
            cols_amount: resolution.cols,
            rows_amount: resolution.rows,
            cell_width: bounds.width() / resolution.cols as f64,
            cell_height: bounds.height() / resolution.rows as f64,
            min_lon: bounds.min_lon,
            max_lon: bounds.max_lon,
            min_lat: bounds.min_lat,
            max_lat: bounds.max_lat,
        })
    }

    pub fn resolution(&self) -> ResolutionConfig {
        ResolutionConfig::new(self.cols_amount, self.rows_amount)
    }

    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::new(self.min_lon, self.min_lat, self.max_lon, self.max_lat)
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.cols_amount * self.rows_amount
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Locate the cell containing a coordinate.
    ///
    /// The grid's bounds are closed: a coordinate on the max edge belongs
    /// to the last row/column. Anything outside returns `None`.
    pub fn cell_for(&self, coordinates: Coordinates) -> Option<CellId> {
        let Coordinates { lon, lat } = coordinates;
        if !lon.is_finite() || !lat.is_finite() || !self.bounds().contains(lon, lat) {
            return None;
        }

        let col = ((lon - self.min_lon) / self.cell_width).floor() as usize;
        let row = ((lat - self.min_lat) / self.cell_height).floor() as usize;

        Some(CellId::new(
            row.min(self.rows_amount - 1),
            col.min(self.cols_amount - 1),
        ))
    }

    /// Geographic bounds of a single cell.
    pub fn cell_bounds(&self, row: usize, col: usize) -> BoundingBox {
        let min_lon = self.min_lon + col as f64 * self.cell_width;
        let min_lat = self.min_lat + row as f64 * self.cell_height;
        BoundingBox::new(
            min_lon,
            min_lat,
            min_lon + self.cell_width,
            min_lat + self.cell_height,
        )
    }

    /// Every cell of the grid in row-major order.
    pub fn blueprint(&self) -> HeatmapBlueprint {
        let mut cells = Vec::with_capacity(self.len());
        for row in 0..self.rows_amount {
            for col in 0..self.cols_amount {
                cells.push(BlueprintCell {
                    cell_id: CellId::new(row, col).to_string(),
                    row,
                    col,
                    bounds: self.cell_bounds(row, col),
                });
            }
        }

        HeatmapBlueprint {
            rows: self.rows_amount,
            cols: self.cols_amount,
            cells,
        }
    }
}

/// One cell of the blueprint shipped in the artifact metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
#[serde(rename_all = "camelCase")]
pub struct BlueprintCell {
    pub cell_id: String,
    pub row: usize,
    pub col: usize,
    pub bounds: BoundingBox,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct HeatmapBlueprint {
    pub rows: usize,
    pub cols: usize,
    pub cells: Vec<BlueprintCell>,
}
