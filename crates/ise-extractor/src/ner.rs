//! Named Entity Recognition (NER) module
//!
//! Rule-based recognition of the entity types the four target relations
//! need: PERSON, ORGANIZATION, and LOCATION / CITY / STATE_OR_PROVINCE /
//! COUNTRY. Combines:
//! - Regex patterns (organisation suffixes, capitalised person names)
//! - Dictionary matching (well-known organisations and places)
//!
//! Overlapping matches are resolved in favour of the longer span.

use regex::Regex;

use crate::{EntityExtractor, ExtractedEntity};
use ise_core::entity_types::{CITY, COUNTRY, LOCATION, ORGANIZATION, PERSON, STATE_OR_PROVINCE};
use ise_core::Result;

/// Words that start a capitalised run but never begin a person name
const NON_NAME_WORDS: &[&str] = &[
    "The", "A", "An", "In", "On", "At", "By", "For", "From", "With", "About", "After", "Before",
    "He", "She", "They", "We", "It", "His", "Her", "Their", "This", "That", "These", "Those",
    "Mr", "Mrs", "Ms", "Dr", "But", "And", "Or", "If", "When", "While", "As", "Since", "Today",
    "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday", "January",
    "February", "March", "April", "May", "June", "July", "August", "September", "October",
    "November", "December", "Read", "More", "Home", "Contact", "Privacy", "Terms",
];

// ============================================================================
// Rule-based NER
// ============================================================================

/// Rule-based NER using regex patterns and dictionaries
pub struct RuleBasedNer {
    /// Pattern rules (regex -> entity type, confidence)
    patterns: Vec<(Regex, &'static str, f32)>,
    /// Dictionary rules (word-bounded term regex -> entity type)
    dictionary: Vec<(Regex, &'static str)>,
}

impl RuleBasedNer {
    /// Create a new rule-based NER with default English rules
    pub fn new() -> Self {
        let mut ner = Self {
            patterns: Vec::new(),
            dictionary: Vec::new(),
        };

        ner.init_patterns();
        ner.init_dictionary();
        ner
    }

    /// Initialize regex patterns
    fn init_patterns(&mut self) {
        // Organisations by suffix: "Acme Corp", "Beta Inc.", "Stanford University"
        self.add_pattern(
            r"\b(?:[A-Z][\w&'-]*\s+){1,4}(?:Inc\.?|Corp\.?|Corporation|Company|Co\.|Ltd\.?|LLC|Group|Foundation|Institute|University|College|School|Academy|Labs|Technologies|Systems|Bank|Partners)(?:\s|$|[,;:!?)])",
            ORGANIZATION,
            0.9,
        );
        // "University of Washington", "Institute of Technology"
        self.add_pattern(
            r"\b(?:University|Institute|College|School) of(?:\s+[A-Z][\w-]+){1,3}",
            ORGANIZATION,
            0.9,
        );

        // Person names: "John Doe", "Bill H. Gates", "Mary Ann Smith"
        self.add_pattern(
            r"\b[A-Z][a-z]+(?:\s+[A-Z]\.)?(?:\s+[A-Z][a-z]+){1,2}\b",
            PERSON,
            0.7,
        );
    }

    /// Initialize dictionary of well-known organisations and places
    fn init_dictionary(&mut self) {
        let organizations = [
            "Microsoft", "Google", "Apple", "Amazon", "Meta", "Facebook", "IBM", "Intel",
            "Oracle", "Netflix", "Tesla", "OpenAI", "Nvidia", "Harvard", "Stanford", "MIT",
            "Yale", "Princeton", "Columbia", "Berkeley", "Oxford", "Cambridge",
        ];
        for term in organizations {
            self.add_term(term, ORGANIZATION);
        }

        let cities = [
            "New York City", "San Francisco", "Los Angeles", "Seattle", "Redmond", "Boston",
            "Chicago", "Palo Alto", "Cupertino", "Mountain View", "London", "Paris", "Berlin",
            "Tokyo", "Toronto", "Beijing", "Mumbai", "Sydney",
        ];
        for term in cities {
            self.add_term(term, CITY);
        }

        let states = [
            "California", "Washington", "Texas", "Florida", "Massachusetts", "New York",
            "New Jersey", "Illinois", "Ontario", "Bavaria",
        ];
        for term in states {
            self.add_term(term, STATE_OR_PROVINCE);
        }

        let countries = [
            "United States", "USA", "Canada", "Mexico", "United Kingdom", "England", "France",
            "Germany", "China", "Japan", "India", "Australia", "Brazil", "Italy", "Spain",
        ];
        for term in countries {
            self.add_term(term, COUNTRY);
        }

        for term in ["Silicon Valley", "Bay Area", "Manhattan", "Europe", "Asia"] {
            self.add_term(term, LOCATION);
        }
    }

    /// Add a regex pattern
    fn add_pattern(&mut self, pattern: &str, entity_type: &'static str, confidence: f32) {
        if let Ok(regex) = Regex::new(pattern) {
            self.patterns.push((regex, entity_type, confidence));
        }
    }

    /// Add a dictionary term (case-sensitive, word-bounded)
    fn add_term(&mut self, term: &str, entity_type: &'static str) {
        if let Ok(regex) = Regex::new(&format!(r"\b{}\b", regex::escape(term))) {
            self.dictionary.push((regex, entity_type));
        }
    }

    /// Extract entities using pattern matching
    fn extract_by_patterns(&self, text: &str) -> Vec<ExtractedEntity> {
        let mut entities = Vec::new();

        for (regex, entity_type, confidence) in &self.patterns {
            for mat in regex.find_iter(text) {
                let (start, end) = if *entity_type == PERSON {
                    match name_span(text, mat.start(), mat.end()) {
                        Some(span) => span,
                        None => continue,
                    }
                } else {
                    (mat.start(), mat.end())
                };

                if let Some(entity) = trimmed_entity(text, start, end, entity_type, *confidence) {
                    entities.push(entity);
                }
            }
        }

        entities
    }

    /// Extract entities using dictionary lookup
    fn extract_by_dictionary(&self, text: &str) -> Vec<ExtractedEntity> {
        let mut entities = Vec::new();

        for (regex, entity_type) in &self.dictionary {
            for mat in regex.find_iter(text) {
                entities.push(ExtractedEntity {
                    text: mat.as_str().to_string(),
                    entity_type: entity_type.to_string(),
                    start: mat.start(),
                    end: mat.end(),
                    confidence: 0.95,
                });
            }
        }

        entities
    }

    /// Remove overlapping entities, keeping the longest span (then highest confidence)
    fn deduplicate(&self, mut entities: Vec<ExtractedEntity>) -> Vec<ExtractedEntity> {
        entities.sort_by(|a, b| {
            (b.end - b.start)
                .cmp(&(a.end - a.start))
                .then(b.confidence.total_cmp(&a.confidence))
                .then(a.start.cmp(&b.start))
        });

        let mut result: Vec<ExtractedEntity> = Vec::new();
        for entity in entities {
            let overlaps = result
                .iter()
                .any(|kept| entity.start < kept.end && kept.start < entity.end);
            if !overlaps {
                result.push(entity);
            }
        }

        // Sort by position
        result.sort_by_key(|e| e.start);
        result
    }
}

/// Trim trailing punctuation and whitespace that suffix patterns consume
fn trimmed_entity(
    text: &str,
    start: usize,
    end: usize,
    entity_type: &str,
    confidence: f32,
) -> Option<ExtractedEntity> {
    let raw = &text[start..end];
    let trimmed = raw.trim_end_matches(|c: char| c.is_whitespace() || ".,;:!?)".contains(c));
    if trimmed.is_empty() {
        return None;
    }

    Some(ExtractedEntity {
        text: trimmed.to_string(),
        entity_type: entity_type.to_string(),
        start,
        end: start + trimmed.len(),
        confidence,
    })
}

/// Drop leading words that cannot begin a name ("In John Doe" -> "John Doe").
///
/// Returns `None` unless at least two words remain.
fn name_span(text: &str, mut start: usize, end: usize) -> Option<(usize, usize)> {
    loop {
        let span = &text[start..end];
        let first = span.split_whitespace().next()?;
        if !NON_NAME_WORDS.contains(&first) {
            break;
        }
        let rest = &span[first.len()..];
        start += first.len() + (rest.len() - rest.trim_start().len());
    }

    (text[start..end].split_whitespace().count() >= 2).then_some((start, end))
}

impl Default for RuleBasedNer {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityExtractor for RuleBasedNer {
    fn extract(&self, text: &str) -> Result<Vec<ExtractedEntity>> {
        let mut entities = Vec::new();

        // Extract by patterns
        entities.extend(self.extract_by_patterns(text));

        // Extract by dictionary
        entities.extend(self.extract_by_dictionary(text));

        Ok(self.deduplicate(entities))
    }
}

// ============================================================================
// Tests
// ============================================================================
