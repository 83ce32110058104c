//! Common test fixtures for time-atlas tests.
//!
//! Pre-defined bounds, periods and features representing the scenarios the
//! pipeline sees against the Amsterdam archive.

use std::collections::BTreeSet;

use atlas_common::{BoundingBox, Geometry, ProcessedFeature, TimeSlice};

/// Common bounding box definitions for testing, as (min_lon, min_lat, max_lon, max_lat).
pub mod bbox {
    /// Production Amsterdam bounds before padding
    pub const AMSTERDAM: (f64, f64, f64, f64) = (4.81, 52.2354339, 4.964447, 52.4443);

    /// Small city-centre box, convenient for 2x2 chunking checks
    pub const CENTRE: (f64, f64, f64, f64) = (4.8, 52.3, 5.0, 52.4);

    /// Unit-ish box with round cell sizes
    pub const TEN_BY_TEN: (f64, f64, f64, f64) = (0.0, 0.0, 10.0, 10.0);

    /// Invalid bbox (min > max)
    pub const INVALID: (f64, f64, f64, f64) = (10.0, 10.0, 5.0, 5.0);
}

/// Build a `BoundingBox` from one of the tuples in [`bbox`].
pub fn bounds(tuple: (f64, f64, f64, f64)) -> BoundingBox {
    BoundingBox::new(tuple.0, tuple.1, tuple.2, tuple.3)
}

/// Half-century periods used by most pipeline tests.
pub const SHORT_PERIODS: &[(i32, i32)] = &[(1850, 1900), (1900, 1950), (1950, 2000)];

/// The eleven production periods, 1500 through 2025.
pub const PRODUCTION_PERIODS: &[(i32, i32)] = &[
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
];

/// Time slices for a list of periods. Panics on invalid periods.
pub fn time_slices(periods: &[(i32, i32)]) -> Vec<TimeSlice> {
    TimeSlice::from_periods(periods).expect("fixture periods are valid")
}

/// Point feature with the given kind, position and tags, dated 1900-1910.
pub fn point_feature(record_kind: &str, lon: f64, lat: f64, tags: &[&str]) -> ProcessedFeature {
    ProcessedFeature {
        title: format!("{} at {:.4},{:.4}", record_kind, lon, lat),
        dataset: "fixture".to_string(),
        url: "https://example.org/record".to_string(),
        record_kind: record_kind.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect::<BTreeSet<_>>(),
        start_year: 1900,
        end_year: 1910,
        geometry: Geometry::point(lon, lat),
    }
}

/// Same as [`point_feature`] with an explicit period.
pub fn dated_feature(
    record_kind: &str,
    lon: f64,
    lat: f64,
    tags: &[&str],
    start_year: i32,
    end_year: i32,
) -> ProcessedFeature {
    ProcessedFeature {
        start_year,
        end_year,
        ..point_feature(record_kind, lon, lat, tags)
    }
}
