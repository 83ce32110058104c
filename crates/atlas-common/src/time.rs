//! Calendar periods used as temporal aggregation buckets.

use bincode::{Decode, Encode};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{AtlasError, AtlasResult};

/// An inclusive ISO-8601 date range, as sent to the upstream source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct TimeRange {
    /// First day, e.g. "1900-01-01"
    pub start: String,
    /// Last day, e.g. "1949-12-31"
    pub end: String,
}

impl TimeRange {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// Range covering an ordered list of slices, from the first start to the last end.
    pub fn spanning(slices: &[TimeSlice]) -> Option<Self> {
        let first = slices.first()?;
        let last = slices.last()?;
        Some(Self::new(
            first.time_range.start.clone(),
            last.time_range.end.clone(),
        ))
    }
}

/// A half-open calendar period `[start_year, end_year)`.
///
/// `key` ("1900_1950") is the mapping key used throughout the heatmap and
/// histogram structures; `label` ("1900-1950") is for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlice {
    pub key: String,
    pub label: String,
    pub time_range: TimeRange,
    pub start_year: i32,
    pub end_year: i32,
    pub duration_years: i32,
}

impl TimeSlice {
    /// Build a slice for `[start_year, end_year)`.
    pub fn new(start_year: i32, end_year: i32) -> AtlasResult<Self> {
        if start_year >= end_year {
            return Err(AtlasError::InvalidTimeSlice(format!(
                "start year {} must be before end year {}",
                start_year, end_year
            )));
        }

        let first_day = NaiveDate::from_ymd_opt(start_year, 1, 1).ok_or_else(|| {
            AtlasError::InvalidTimeSlice(format!("year {} is out of range", start_year))
        })?;
        let last_day = NaiveDate::from_ymd_opt(end_year - 1, 12, 31).ok_or_else(|| {
            AtlasError::InvalidTimeSlice(format!("year {} is out of range", end_year))
        })?;

        Ok(Self {
            key: format!("{}_{}", start_year, end_year),
            label: format!("{}-{}", start_year, end_year),
            time_range: TimeRange::new(
                first_day.format("%Y-%m-%d").to_string(),
                last_day.format("%Y-%m-%d").to_string(),
            ),
            start_year,
            end_year,
            duration_years: end_year - start_year,
        })
    }

    /// Build slices for a list of `(start, end)` periods, ordered by start year.
    pub fn from_periods(periods: &[(i32, i32)]) -> AtlasResult<Vec<Self>> {
        let mut slices = periods
            .iter()
            .map(|&(start, end)| Self::new(start, end))
            .collect::<AtlasResult<Vec<_>>>()?;
        slices.sort_by_key(|s| s.start_year);

        for pair in slices.windows(2) {
            if pair[0].key == pair[1].key {
                return Err(AtlasError::InvalidTimeSlice(format!(
                    "duplicate period {}",
                    pair[0].key
                )));
            }
        }
        Ok(slices)
    }

    /// Whether a year falls inside this half-open slice.
    pub fn contains_year(&self, year: i32) -> bool {
        year >= self.start_year && year < self.end_year
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_slice_fields() {
        let slice = TimeSlice::new(1900, 1950).unwrap();
        assert_eq!(slice.key, "1900_1950");
        assert_eq!(slice.label, "1900-1950");
        assert_eq!(slice.time_range.start, "1900-01-01");
        assert_eq!(slice.time_range.end, "1949-12-31");
        assert_eq!(slice.duration_years, 50);
        assert!(slice.contains_year(1900));
        assert!(!slice.contains_year(1950));
    }

    #[test]
    fn test_early_years_format_with_four_digits() {
        let slice = TimeSlice::new(1500, 1550).unwrap();
        assert_eq!(slice.time_range.start, "1500-01-01");
        assert_eq!(slice.time_range.end, "1549-12-31");
    }

    #[test]
    fn test_rejects_empty_period() {
        assert!(TimeSlice::new(1900, 1900).is_err());
        assert!(TimeSlice::new(1950, 1900).is_err());
    }

    #[test]
    fn test_from_periods_sorts_and_rejects_duplicates() {
        let slices = TimeSlice::from_periods(&[(1950, 2000), (1900, 1950)]).unwrap();
        assert_eq!(slices[0].key, "1900_1950");
        assert_eq!(slices[1].key, "1950_2000");

        assert!(TimeSlice::from_periods(&[(1900, 1950), (1900, 1950)]).is_err());
    }

    #[test]
    fn test_spanning_range() {
        let slices = TimeSlice::from_periods(&[(1500, 1550), (2000, 2025)]).unwrap();
        let range = TimeRange::spanning(&slices).unwrap();
        assert_eq!(range.start, "1500-01-01");
        assert_eq!(range.end, "2024-12-31");
        assert!(TimeRange::spanning(&[]).is_none());
    }
}
