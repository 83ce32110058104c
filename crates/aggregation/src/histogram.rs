//! Per-time-slice occurrence counts.
//!
//! Independent of any grid: every feature counts once per slice for its
//! record kind, once for each of its tags, and once for each combination
//! of its tags. Combination keys are derived, never stored separately:
//! sort the tag names and join them with `+`.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use atlas_common::{AtlasError, AtlasResult, ProcessedFeature, TimeRange, TimeSlice, Vocabulary};
use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
#[serde(rename_all = "camelCase")]
pub struct HistogramBin {
    pub time_slice: TimeSlice,
    pub count: u64,
}

/// One bin per requested time slice, in time order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
#[serde(rename_all = "camelCase")]
pub struct Histogram {
    pub bins: Vec<HistogramBin>,
    pub max_count: u64,
    pub time_range: TimeRange,
    pub total_features: u64,
}

impl Histogram {
    fn from_counts(time_slices: &[TimeSlice], time_range: &TimeRange, counts: Option<&Vec<u64>>) -> Self {
        let bins: Vec<HistogramBin> = time_slices
            .iter()
            .enumerate()
            .map(|(i, slice)| HistogramBin {
                time_slice: slice.clone(),
                count: counts.and_then(|c| c.get(i)).copied().unwrap_or(0),
            })
            .collect();

        Self {
            max_count: bins.iter().map(|bin| bin.count).max().unwrap_or(0),
            total_features: bins.iter().map(|bin| bin.count).sum(),
            time_range: time_range.clone(),
            bins,
        }
    }

    pub fn count_for(&self, time_slice_key: &str) -> u64 {
        self.bins
            .iter()
            .find(|bin| bin.time_slice.key == time_slice_key)
            .map(|bin| bin.count)
            .unwrap_or(0)
    }
}

/// Histograms for one record kind: all of its records, plus one per tag
/// and tag-combination key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct RecordKindHistograms {
    pub base: Histogram,
    pub tags: BTreeMap<String, Histogram>,
}

/// record kind -> histograms
pub type Histograms = BTreeMap<String, RecordKindHistograms>;

/// Key for a set of tags: sorted, `+`-joined.
pub fn tag_combination_key<S: AsRef<str>>(tags: &[S]) -> String {
    let mut sorted: Vec<&str> = tags.iter().map(|tag| tag.as_ref()).collect();
    sorted.sort_unstable();
    sorted.dedup();
    sorted.join("+")
}

/// Keys of every combination of `tags` with 2 to `max_size` members.
pub fn tag_combinations(tags: &BTreeSet<String>, max_size: usize) -> Vec<String> {
    let tags: Vec<&str> = tags.iter().map(String::as_str).collect();
    let mut keys = Vec::new();
    let mut current = Vec::with_capacity(max_size);

    for size in 2..=max_size.min(tags.len()) {
        collect_combinations(&tags, size, 0, &mut current, &mut keys);
    }
    keys
}

fn collect_combinations<'a>(
    tags: &[&'a str],
    size: usize,
    start: usize,
    current: &mut Vec<&'a str>,
    keys: &mut Vec<String>,
) {
    if current.len() == size {
        keys.push(tag_combination_key(current.as_slice()));
        return;
    }
    for i in start..tags.len() {
        current.push(tags[i]);
        collect_combinations(tags, size, i + 1, current, keys);
        current.pop();
    }
}

/// Counts features per time slice for kinds, tags and tag combinations.
#[derive(Debug, Clone)]
pub struct HistogramAggregator {
    time_slices: Vec<TimeSlice>,
    time_range: TimeRange,
    slice_index: HashMap<String, usize>,
    max_combination_size: usize,
    base: HashMap<String, Vec<u64>>,
    // kind -> tag or combination key -> per-slice counts
    tags: HashMap<String, HashMap<String, Vec<u64>>>,
    combination_keys: BTreeSet<String>,
}

impl HistogramAggregator {
    pub fn new(time_slices: &[TimeSlice], max_combination_size: usize) -> AtlasResult<Self> {
        let time_range = TimeRange::spanning(time_slices).ok_or_else(|| {
            AtlasError::InvalidTimeSlice("at least one time slice is required".to_string())
        })?;

        let slice_index = time_slices
            .iter()
            .enumerate()
            .map(|(i, slice)| (slice.key.clone(), i))
            .collect::<HashMap<_, _>>();
        if slice_index.len() != time_slices.len() {
            return Err(AtlasError::InvalidTimeSlice(
                "time slice keys must be unique".to_string(),
            ));
        }

        Ok(Self {
            time_slices: time_slices.to_vec(),
            time_range,
            slice_index,
            max_combination_size,
            base: HashMap::new(),
            tags: HashMap::new(),
            combination_keys: BTreeSet::new(),
        })
    }

    pub fn time_slices(&self) -> &[TimeSlice] {
        &self.time_slices
    }

    /// Count one feature in the given slice. Returns `false` for an
    /// unknown slice key.
    pub fn record(&mut self, time_slice_key: &str, feature: &ProcessedFeature) -> bool {
        let Some(&index) = self.slice_index.get(time_slice_key) else {
            return false;
        };
        let slots = self.time_slices.len();

        self.base
            .entry(feature.record_kind.clone())
            .or_insert_with(|| vec![0; slots])[index] += 1;

        let by_tag = self.tags.entry(feature.record_kind.clone()).or_default();
        for tag in &feature.tags {
            by_tag.entry(tag.clone()).or_insert_with(|| vec![0; slots])[index] += 1;
        }
        for key in tag_combinations(&feature.tags, self.max_combination_size) {
            by_tag.entry(key.clone()).or_insert_with(|| vec![0; slots])[index] += 1;
            self.combination_keys.insert(key);
        }

        true
    }

    pub fn fold<'a>(
        &mut self,
        time_slice_key: &str,
        features: impl IntoIterator<Item = &'a ProcessedFeature>,
    ) -> usize {
        features
            .into_iter()
            .filter(|feature| self.record(time_slice_key, feature))
            .count()
    }

    /// Every combination key observed so far.
    pub fn combination_keys(&self) -> &BTreeSet<String> {
        &self.combination_keys
    }

    /// Histograms for every kind in `vocabulary`, each with one entry per
    /// discovered tag and per observed combination key.
    pub fn finish(&self, vocabulary: &Vocabulary) -> Histograms {
        let tag_keys: Vec<&String> = vocabulary
            .tags
            .iter()
            .chain(self.combination_keys.iter())
            .collect();

        vocabulary
            .record_kinds
            .iter()
            .map(|kind| {
                let base = Histogram::from_counts(&self.time_slices, &self.time_range, self.base.get(kind));
                let kind_tags = self.tags.get(kind);
                let tags = tag_keys
                    .iter()
                    .map(|&key| {
                        let counts = kind_tags.and_then(|by_tag| by_tag.get(key));
                        (
                            key.clone(),
                            Histogram::from_counts(&self.time_slices, &self.time_range, counts),
                        )
                    })
                    .collect();
                (kind.clone(), RecordKindHistograms { base, tags })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_combination_key_is_sorted() {
        assert_eq!(tag_combination_key(&["politics", "economics"]), "economics+politics");
        assert_eq!(tag_combination_key(&["b", "a", "b"]), "a+b");
    }

    #[test]
    fn test_tag_combinations_sizes() {
        let set = tags(&["a", "b", "c"]);
        assert_eq!(tag_combinations(&set, 2), vec!["a+b", "a+c", "b+c"]);
        assert_eq!(tag_combinations(&set, 3).len(), 4);
        assert_eq!(tag_combinations(&set, 3).last().unwrap(), "a+b+c");
        assert!(tag_combinations(&tags(&["solo"]), 4).is_empty());
        assert!(tag_combinations(&set, 1).is_empty());
    }

    #[test]
    fn test_requires_time_slices() {
        assert!(HistogramAggregator::new(&[], 2).is_err());
    }
}
