//! Tuple store
//!
//! Holds at most one [`RelationTuple`] per case-insensitive (subject, object)
//! key. Keys are NFKD-decomposed, so composed and combining-accent spellings of
//! a name collapse to one entry. A candidate only ever enters the store through [`TupleStore::merge`],
//! which inserts new keys and replaces existing entries whose confidence is
//! strictly lower.

use std::collections::HashMap;

use ise_core::RelationTuple;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

/// Result of merging one candidate into the store
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeOutcome {
    /// New key; the store grew by one
    Inserted,
    /// Existing entry had strictly lower confidence and was overwritten
    Replaced { previous: f32 },
    /// Existing entry had equal or higher confidence and was kept
    Rejected,
    /// Candidate had an empty subject/object or an invalid confidence
    Malformed,
}

/// Normalise an entity mention for keying and storage
pub fn normalize_entity(text: &str) -> String {
    let decomposed: String = text.nfkd().collect();
    decomposed
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Ordered, deduplicated collection of relation tuples
#[derive(Debug, Default, Clone)]
pub struct TupleStore {
    /// Entries in first-insertion order
    entries: Vec<RelationTuple>,
    /// (subject, object) -> index into `entries`
    index: HashMap<(String, String), usize>,
}

impl TupleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a candidate (subject, object, confidence).
    pub fn merge(&mut self, subject: &str, object: &str, confidence: f32) -> MergeOutcome {
        let subject = normalize_entity(subject);
        let object = normalize_entity(object);

        if subject.is_empty()
            || object.is_empty()
            || !confidence.is_finite()
            || !(0.0..=1.0).contains(&confidence)
        {
            return MergeOutcome::Malformed;
        }

        let key = (subject, object);
        match self.index.get(&key) {
            None => {
                let (subject, object) = key.clone();
                self.entries.push(RelationTuple {
                    subject,
                    object,
                    confidence,
                });
                self.index.insert(key, self.entries.len() - 1);
                MergeOutcome::Inserted
            }
            Some(&slot) => {
                let existing = &mut self.entries[slot];
                if existing.confidence < confidence {
                    let previous = existing.confidence;
                    existing.confidence = confidence;
                    MergeOutcome::Replaced { previous }
                } else {
                    MergeOutcome::Rejected
                }
            }
        }
    }

    /// Look up an entry by (case-insensitive) subject and object
    pub fn get(&self, subject: &str, object: &str) -> Option<&RelationTuple> {
        let key = (normalize_entity(subject), normalize_entity(object));
        self.index.get(&key).map(|&slot| &self.entries[slot])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in first-insertion order
    pub fn iter(&self) -> impl Iterator<Item = &RelationTuple> {
        self.entries.iter()
    }

    /// Entries by descending confidence; ties keep insertion order
    pub fn sorted(&self) -> Vec<RelationTuple> {
        sort_by_confidence(self.entries.clone())
    }

    pub fn into_sorted(self) -> Vec<RelationTuple> {
        sort_by_confidence(self.entries)
    }
}

/// Stable sort by descending confidence
pub fn sort_by_confidence(mut tuples: Vec<RelationTuple>) -> Vec<RelationTuple> {
    tuples.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    tuples
}
