//! Query augmentation
//!
//! When a round of search and extraction leaves the store short of `k`, the
//! next query is built by appending entities from already-extracted tuples
//! that the current query does not mention yet. A tuple is eligible only if
//! neither its object nor its subject appears in the query; when no tuple is
//! eligible the run cannot make further progress.

use ise_core::{AugmentationPolicy, RelationTuple};

use crate::store::{normalize_entity, sort_by_confidence};

/// Derives the next search query from extracted tuples
pub trait QueryAugmenter: Send + Sync {
    /// Returns `None` if no tuple can extend the query
    fn augment(&self, tuples: &[RelationTuple], current_query: &str) -> Option<String>;

    /// Get policy name for logging
    fn name(&self) -> &str;
}

/// Build the augmenter for a configured policy
pub fn augmenter_for(policy: AugmentationPolicy) -> Box<dyn QueryAugmenter> {
    match policy {
        AugmentationPolicy::FirstEligible => Box::new(FirstEligibleAugmenter),
        AugmentationPolicy::AllEligible => Box::new(AllEligibleAugmenter),
    }
}

/// Whitespace tokens of a query, normalised the same way as store keys
pub fn query_words(query: &str) -> Vec<String> {
    normalize_entity(query)
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// True if `phrase` occurs in `words` as a contiguous run of words
fn mentions(words: &[String], phrase: &str) -> bool {
    let needle = query_words(phrase);
    if needle.is_empty() {
        return true;
    }
    words
        .windows(needle.len())
        .any(|window| window == needle.as_slice())
}

fn is_eligible(words: &[String], tuple: &RelationTuple) -> bool {
    !mentions(words, &tuple.object) && !mentions(words, &tuple.subject)
}

fn append(words: &mut Vec<String>, tuple: &RelationTuple) {
    words.extend(query_words(&tuple.object));
    words.extend(query_words(&tuple.subject));
}

/// Appends the object and subject of the highest-confidence eligible tuple
#[derive(Debug, Default, Clone, Copy)]
pub struct FirstEligibleAugmenter;

impl QueryAugmenter for FirstEligibleAugmenter {
    fn augment(&self, tuples: &[RelationTuple], current_query: &str) -> Option<String> {
        let mut words = query_words(current_query);
        let ranked = sort_by_confidence(tuples.to_vec());

        let tuple = ranked.iter().find(|t| is_eligible(&words, t))?;
        append(&mut words, tuple);
        Some(words.join(" "))
    }

    fn name(&self) -> &str {
        "first_eligible"
    }
}

/// Appends every eligible tuple in confidence order.
///
/// Eligibility is re-checked against the growing query, so an entity shared
/// by two tuples is only added once.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllEligibleAugmenter;

impl QueryAugmenter for AllEligibleAugmenter {
    fn augment(&self, tuples: &[RelationTuple], current_query: &str) -> Option<String> {
        let mut words = query_words(current_query);
        let before = words.len();

        for tuple in sort_by_confidence(tuples.to_vec()) {
            if is_eligible(&words, &tuple) {
                append(&mut words, &tuple);
            }
        }

        (words.len() > before).then(|| words.join(" "))
    }

    fn name(&self) -> &str {
        "all_eligible"
    }
}
