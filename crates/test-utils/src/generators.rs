//! Generators for synthetic upstream records and pages.
//!
//! The upstream source speaks terse JSON (`ds`, `geom`, `per`, `tit`, ...).
//! These helpers build that shape so fetcher and pipeline tests can serve
//! predictable pages without a real archive.

use atlas_common::BoundingBox;
use serde_json::{json, Value};

/// A raw point record as served by the upstream source.
///
/// ```
/// use test_utils::raw_point_record;
///
/// let record = raw_point_record("image", 4.89, 52.37, &["historic"], 1900, 1910);
/// assert_eq!(record["geom"], "POINT(4.89 52.37)");
/// assert_eq!(record["per"][0], 1900);
/// ```
pub fn raw_point_record(
    record_kind: &str,
    lon: f64,
    lat: f64,
    tags: &[&str],
    start_year: i32,
    end_year: i32,
) -> Value {
    json!({
        "ds": "generated",
        "geom": format!("POINT({} {})", lon, lat),
        "per": [start_year, end_year],
        "tit": format!("{} record", record_kind),
        "url": "https://example.org/generated",
        "recordtype": record_kind,
        "tags": tags,
    })
}

/// A raw record whose geometry cannot be parsed.
pub fn raw_malformed_record() -> Value {
    json!({
        "ds": "generated",
        "geom": "POINT(not-a-number 52.3)",
        "per": [1900, 1910],
        "tit": "broken",
        "url": "https://example.org/broken",
        "recordtype": "text",
    })
}

/// Wrap records into an upstream page response.
pub fn page_json(records: Vec<Value>, total: u64, page: u32, page_size: u32) -> Value {
    let total_pages = if page_size == 0 {
        0
    } else {
        total.div_ceil(page_size as u64)
    };
    json!({
        "data": records,
        "total": total,
        "page": page,
        "page_size": page_size,
        "total_pages": total_pages,
    })
}

/// Deterministically scatter `count` points across a bounding box.
///
/// Positions walk a fixed low-discrepancy sequence, so repeated calls with
/// the same arguments produce the same records.
pub fn scatter_points(bounds: &BoundingBox, count: usize) -> Vec<(f64, f64)> {
    const PHI_LON: f64 = 0.618_033_988_749_895;
    const PHI_LAT: f64 = 0.754_877_666_246_693;

    (0..count)
        .map(|i| {
            let u = ((i as f64 + 0.5) * PHI_LON).fract();
            let v = ((i as f64 + 0.5) * PHI_LAT).fract();
            (
                bounds.min_lon + u * bounds.width(),
                bounds.min_lat + v * bounds.height(),
            )
        })
        .collect()
}
