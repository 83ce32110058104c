//! Conversion of raw upstream records into [`ProcessedFeature`]s.
//!
//! Upstream records use terse field names:
//!
//! | field        | meaning                         |
//! |--------------|---------------------------------|
//! | `ds`         | dataset id                      |
//! | `geom`       | WKT geometry                    |
//! | `per`        | `[start_year, end_year]`        |
//! | `tit`        | title                           |
//! | `url`        | source URL                      |
//! | `recordtype` | record kind (optional)          |
//! | `tags`       | free-form tags (optional)       |

use std::collections::BTreeSet;

use atlas_common::{FeatureError, Geometry, ProcessedFeature};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct RawRecord {
    pub ds: String,
    pub geom: String,
    pub per: [i32; 2],
    #[serde(default)]
    pub tit: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, alias = "recordType", alias = "record_type")]
    pub recordtype: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl RawRecord {
    /// Normalize this record. `fallback_kind` is used when the record
    /// carries no kind of its own.
    pub fn into_feature(self, fallback_kind: Option<&str>) -> Result<ProcessedFeature, FeatureError> {
        let [start_year, end_year] = self.per;
        if start_year > end_year {
            return Err(FeatureError::InvertedPeriod {
                start: start_year,
                end: end_year,
            });
        }

        let record_kind = self
            .recordtype
            .as_deref()
            .map(str::trim)
            .filter(|kind| !kind.is_empty())
            .or(fallback_kind)
            .ok_or(FeatureError::MissingRecordKind)?
            .to_string();

        let geometry = Geometry::from_wkt(&self.geom)?;

        let tags = self
            .tags
            .unwrap_or_default()
            .into_iter()
            .map(|tag| tag.trim().to_string())
            .filter(|tag| !tag.is_empty())
            .collect::<BTreeSet<_>>();

        Ok(ProcessedFeature {
            title: self.tit,
            dataset: self.ds,
            url: self.url,
            record_kind,
            tags,
            start_year,
            end_year,
            geometry,
        })
    }
}

/// Decode and normalize one record from a page's `data` array.
pub fn normalize_record(
    value: serde_json::Value,
    fallback_kind: Option<&str>,
) -> Result<ProcessedFeature, FeatureError> {
    let raw: RawRecord =
        serde_json::from_value(value).map_err(|e| FeatureError::Malformed(e.to_string()))?;
    raw.into_feature(fallback_kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_point_record() {
        let feature = normalize_record(
            json!({
                "ds": "beeldbank",
                "geom": "POINT(4.8936 52.3728)",
                "per": [1900, 1910],
                "tit": "Dam Square",
                "url": "https://example.org/1",
                "recordtype": "image",
                "tags": ["historic", " square ", "", "historic"]
            }),
            None,
        )
        .unwrap();

        assert_eq!(feature.record_kind, "image");
        assert_eq!(feature.dataset, "beeldbank");
        assert_eq!(feature.title, "Dam Square");
        assert_eq!(feature.tags.len(), 2);
        assert!(feature.tags.contains("square"));
        assert_eq!(feature.position().lon, 4.8936);
    }

    #[test]
    fn test_record_kind_fallback() {
        let record = json!({"ds": "a", "geom": "POINT(1 2)", "per": [1900, 1901]});

        assert_eq!(
            normalize_record(record.clone(), None),
            Err(FeatureError::MissingRecordKind)
        );
        let feature = normalize_record(record, Some("text")).unwrap();
        assert_eq!(feature.record_kind, "text");
        assert!(feature.tags.is_empty());
    }

    #[test]
    fn test_camel_case_record_type_alias() {
        let record = json!({"ds": "a", "geom": "POINT(1 2)", "per": [1900, 1901], "recordType": "event"});
        assert_eq!(normalize_record(record, Some("text")).unwrap().record_kind, "event");
    }

    #[test]
    fn test_invalid_records() {
        let missing_geom = json!({"ds": "a", "per": [1900, 1901], "recordtype": "text"});
        assert!(matches!(
            normalize_record(missing_geom, None),
            Err(FeatureError::Malformed(_))
        ));

        let bad_period = json!({"ds": "a", "geom": "POINT(1 2)", "per": ["x", 1901], "recordtype": "text"});
        assert!(matches!(
            normalize_record(bad_period, None),
            Err(FeatureError::Malformed(_))
        ));

        let inverted = json!({"ds": "a", "geom": "POINT(1 2)", "per": [1950, 1900], "recordtype": "text"});
        assert_eq!(
            normalize_record(inverted, None),
            Err(FeatureError::InvertedPeriod { start: 1950, end: 1900 })
        );

        let bad_wkt = json!({"ds": "a", "geom": "POINT(1)", "per": [1900, 1901], "recordtype": "text"});
        assert!(matches!(
            normalize_record(bad_wkt, None),
            Err(FeatureError::InvalidWkt(_))
        ));
    }
}
