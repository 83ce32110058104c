//! Runtime-discovered record kinds and tags.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::AtlasResult;
use crate::feature::ProcessedFeature;

/// The set of record kinds and tags seen so far in a run.
///
/// Only ever grows. `merge` is a set union, so the order in which chunk
/// or slice vocabularies are merged does not matter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vocabulary {
    pub record_kinds: BTreeSet<String>,
    pub tags: BTreeSet<String>,
}

impl Vocabulary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a feature's kind and tags.
    pub fn observe(&mut self, feature: &ProcessedFeature) {
        if !self.record_kinds.contains(&feature.record_kind) {
            self.record_kinds.insert(feature.record_kind.clone());
        }
        for tag in &feature.tags {
            if !self.tags.contains(tag) {
                self.tags.insert(tag.clone());
            }
        }
    }

    pub fn merge(&mut self, other: &Vocabulary) {
        self.record_kinds.extend(other.record_kinds.iter().cloned());
        self.tags.extend(other.tags.iter().cloned());
    }

    pub fn is_empty(&self) -> bool {
        self.record_kinds.is_empty() && self.tags.is_empty()
    }

    pub fn to_json(&self) -> AtlasResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> AtlasResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl<'a> FromIterator<&'a ProcessedFeature> for Vocabulary {
    fn from_iter<I: IntoIterator<Item = &'a ProcessedFeature>>(iter: I) -> Self {
        let mut vocabulary = Vocabulary::new();
        for feature in iter {
            vocabulary.observe(feature);
        }
        vocabulary
    }
}
