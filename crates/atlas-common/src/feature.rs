//! Normalized records and their geometries.
//!
//! Geometries arrive as WKT strings. Only the four shapes the upstream
//! source emits are understood: `POINT`, `LINESTRING`, `MULTILINESTRING`
//! and `POLYGON`. Non-point shapes keep their coordinates plus a
//! precomputed centroid, which is what aggregation uses as the position.

use std::collections::BTreeSet;
use std::str::FromStr;

use geo::{Centroid, CoordsIter, LineString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use wkt::Wkt;

/// Per-record normalization failures. These never abort a chunk.
#[derive(Debug, Error, PartialEq)]
pub enum FeatureError {
    #[error("Invalid WKT geometry: {0}")]
    InvalidWkt(String),

    #[error("Non-finite coordinate: {0}")]
    NonFiniteCoordinate(String),

    #[error("Geometry has no coordinates: {0}")]
    EmptyGeometry(String),

    #[error("Record has no record kind")]
    MissingRecordKind,

    #[error("Inverted period: {start} > {end}")]
    InvertedPeriod { start: i32, end: i32 },

    #[error("Malformed record: {0}")]
    Malformed(String),
}

/// A WGS84 lon/lat pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lon: f64,
    pub lat: f64,
}

impl Coordinates {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

impl From<geo::Point<f64>> for Coordinates {
    fn from(point: geo::Point<f64>) -> Self {
        Self::new(point.x(), point.y())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Geometry {
    Point {
        coordinates: Coordinates,
    },
    LineString {
        coordinates: Vec<Coordinates>,
        centroid: Coordinates,
    },
    MultiLineString {
        coordinates: Vec<Vec<Coordinates>>,
        centroid: Coordinates,
    },
    Polygon {
        coordinates: Vec<Vec<Coordinates>>,
        centroid: Coordinates,
    },
}

impl Geometry {
    pub fn point(lon: f64, lat: f64) -> Self {
        Geometry::Point {
            coordinates: Coordinates::new(lon, lat),
        }
    }

    /// Parse a WKT string such as `POINT(4.89 52.37)`.
    pub fn from_wkt(wkt: &str) -> Result<Self, FeatureError> {
        let invalid = || FeatureError::InvalidWkt(wkt.to_string());

        let parsed = Wkt::<f64>::from_str(wkt.trim()).map_err(|_| invalid())?;
        let geometry: geo::Geometry<f64> = parsed.try_into().map_err(|_| invalid())?;
        Self::from_geo(geometry, wkt)
    }

    fn from_geo(geometry: geo::Geometry<f64>, wkt: &str) -> Result<Self, FeatureError> {
        if geometry
            .coords_iter()
            .any(|c| !c.x.is_finite() || !c.y.is_finite())
        {
            return Err(FeatureError::NonFiniteCoordinate(wkt.to_string()));
        }

        let centroid = |point: Option<geo::Point<f64>>| {
            point
                .map(Coordinates::from)
                .ok_or_else(|| FeatureError::EmptyGeometry(wkt.to_string()))
        };

        match geometry {
            geo::Geometry::Point(point) => Ok(Geometry::Point {
                coordinates: point.into(),
            }),
            geo::Geometry::LineString(line) => Ok(Geometry::LineString {
                centroid: centroid(line.centroid())?,
                coordinates: coordinates(&line),
            }),
            geo::Geometry::MultiLineString(lines) => Ok(Geometry::MultiLineString {
                centroid: centroid(lines.centroid())?,
                coordinates: lines.iter().map(coordinates).collect(),
            }),
            geo::Geometry::Polygon(polygon) => Ok(Geometry::Polygon {
                centroid: centroid(polygon.centroid())?,
                coordinates: std::iter::once(polygon.exterior())
                    .chain(polygon.interiors())
                    .map(coordinates)
                    .collect(),
            }),
            _ => Err(FeatureError::InvalidWkt(wkt.to_string())),
        }
    }

    /// Position used for grid assignment: the point itself, or the centroid.
    pub fn position(&self) -> Coordinates {
        match self {
            Geometry::Point { coordinates } => *coordinates,
            Geometry::LineString { centroid, .. }
            | Geometry::MultiLineString { centroid, .. }
            | Geometry::Polygon { centroid, .. } => *centroid,
        }
    }
}

fn coordinates(line: &LineString<f64>) -> Vec<Coordinates> {
    line.coords().map(|c| Coordinates::new(c.x, c.y)).collect()
}

/// A record after normalization, ready for aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedFeature {
    pub title: String,
    pub dataset: String,
    pub url: String,
    pub record_kind: String,
    pub tags: BTreeSet<String>,
    pub start_year: i32,
    pub end_year: i32,
    pub geometry: Geometry,
}

impl ProcessedFeature {
    pub fn position(&self) -> Coordinates {
        self.geometry.position()
    }
}
