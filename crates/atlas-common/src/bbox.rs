//! Bounding box types and operations.

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::error::{AtlasError, AtlasResult};

/// A geographic bounding box in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Encode, Decode)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            max_lon,
            min_lat,
            max_lat,
        }
    }

    /// Parse a bounds string: "minLon,minLat,maxLon,maxLat"
    pub fn from_bounds_string(s: &str) -> Result<Self, BboxParseError> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(BboxParseError::InvalidFormat(s.to_string()));
        }

        let parse = |part: &str| {
            part.parse::<f64>()
                .map_err(|_| BboxParseError::InvalidNumber(part.to_string()))
        };

        Ok(Self::new(
            parse(parts[0])?,
            parse(parts[1])?,
            parse(parts[2])?,
            parse(parts[3])?,
        ))
    }

    /// Check that both axes are finite and strictly increasing.
    pub fn validate(&self) -> AtlasResult<()> {
        let values = [self.min_lon, self.max_lon, self.min_lat, self.max_lat];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(AtlasError::InvalidBbox(format!(
                "non-finite coordinate in {:?}",
                self
            )));
        }
        if self.min_lon >= self.max_lon {
            return Err(AtlasError::InvalidBbox(format!(
                "minLon {} must be < maxLon {}",
                self.min_lon, self.max_lon
            )));
        }
        if self.min_lat >= self.max_lat {
            return Err(AtlasError::InvalidBbox(format!(
                "minLat {} must be < maxLat {}",
                self.min_lat, self.max_lat
            )));
        }
        Ok(())
    }

    /// Width in degrees of longitude.
    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    /// Height in degrees of latitude.
    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// Check if a point is contained within this bbox (edges inclusive).
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        lon >= self.min_lon && lon <= self.max_lon && lat >= self.min_lat && lat <= self.max_lat
    }

    /// Expand each axis by `fraction` of its own extent on both sides.
    pub fn pad(&self, fraction: f64) -> Self {
        let lon_pad = self.width() * fraction;
        let lat_pad = self.height() * fraction;
        Self {
            min_lon: self.min_lon - lon_pad,
            max_lon: self.max_lon + lon_pad,
            min_lat: self.min_lat - lat_pad,
            max_lat: self.max_lat + lat_pad,
        }
    }

    /// Clamp this bbox so it never extends past `outer`.
    pub fn clamp_to(&self, outer: &BoundingBox) -> Self {
        Self {
            min_lon: self.min_lon.max(outer.min_lon),
            max_lon: self.max_lon.min(outer.max_lon),
            min_lat: self.min_lat.max(outer.min_lat),
            max_lat: self.max_lat.min(outer.max_lat),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BboxParseError {
    #[error("Invalid bounds format: {0}. Expected 'minLon,minLat,maxLon,maxLat'")]
    InvalidFormat(String),

    #[error("Invalid number in bounds: {0}")]
    InvalidNumber(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bounds_string() {
        let bbox = BoundingBox::from_bounds_string("4.8, 52.3, 5.0, 52.4").unwrap();
        assert_eq!(bbox.min_lon, 4.8);
        assert_eq!(bbox.min_lat, 52.3);
        assert_eq!(bbox.max_lon, 5.0);
        assert_eq!(bbox.max_lat, 52.4);
    }

    #[test]
    fn test_validate_rejects_inverted_axes() {
        assert!(BoundingBox::new(5.0, 52.3, 4.8, 52.4).validate().is_err());
        assert!(BoundingBox::new(4.8, 52.4, 5.0, 52.4).validate().is_err());
        assert!(BoundingBox::new(f64::NAN, 52.3, 5.0, 52.4).validate().is_err());
        assert!(BoundingBox::new(4.8, 52.3, 5.0, 52.4).validate().is_ok());
    }

    #[test]
    fn test_pad() {
        let bbox = BoundingBox::new(0.0, 0.0, 10.0, 20.0).pad(0.05);
        assert_eq!(bbox.min_lon, -0.5);
        assert_eq!(bbox.max_lon, 10.5);
        assert_eq!(bbox.min_lat, -1.0);
        assert_eq!(bbox.max_lat, 21.0);
    }
}
