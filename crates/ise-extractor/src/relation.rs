//! Relation Extraction (RE) module
//!
//! Extracts relations between entities from text.
//! Supports both rule-based and LLM-based extraction.

use std::collections::HashMap;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::{ExtractedEntity, ExtractedRelation, RelationFinder};
use ise_core::{CandidateRelation, IseError, RelationKind, Result};

// ============================================================================
// Rule-based RE
// ============================================================================

/// Which entity of the pair appears first in the text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityOrder {
    /// "John Doe works for Acme Corp"
    SubjectFirst,
    /// "Acme Corp hired John Doe"
    ObjectFirst,
}

/// Pattern for extracting relations
#[derive(Debug, Clone)]
pub struct RelationPattern {
    /// Relation the pattern detects
    pub kind: RelationKind,
    /// Required order of the entity pair
    pub order: EntityOrder,
    /// Keyword alternation matched (case-insensitive) between the entities
    pub keywords: Regex,
    /// Maximum gap between the entities (in characters)
    pub max_distance: usize,
    /// Confidence of a match at zero distance
    pub confidence: f32,
}

/// Rule-based relation extractor
pub struct RuleBasedRe {
    patterns: Vec<RelationPattern>,
    /// Pairs separated by a sentence end are never related
    sentence_break: Option<Regex>,
}

impl RuleBasedRe {
    /// Create a new rule-based RE with English patterns for all relation kinds
    pub fn new() -> Self {
        let mut re = Self {
            patterns: Vec::new(),
            sentence_break: Regex::new(r"[.!?](?:\s+[A-Z]|\s*$)|\n").ok(),
        };
        re.init_patterns();
        re
    }

    fn init_patterns(&mut self) {
        use EntityOrder::*;
        use RelationKind::*;

        // per:schools_attended
        self.add_pattern(
            SchoolsAttended,
            SubjectFirst,
            &[
                "graduated from", "graduate of", "attended", "studied at", "studied",
                "alumnus of", "alumna of", "alumni of", "enrolled at", "enrolled in",
                "degree from", "dropped out of", "student at", "educated at",
            ],
            60,
            0.85,
        );
        self.add_pattern(
            SchoolsAttended,
            ObjectFirst,
            &["graduate", "alumnus", "alumna", "alum", "dropout"],
            20,
            0.7,
        );

        // per:employee_of
        self.add_pattern(
            WorkFor,
            SubjectFirst,
            &[
                "works for", "works at", "worked for", "worked at", "working for",
                "working at", "employee of", "employed by", "employed at", "joined",
                "hired by", "job at", "career at",
            ],
            60,
            0.85,
        );
        self.add_pattern(
            WorkFor,
            SubjectFirst,
            &[
                "engineer at", "scientist at", "manager at", "analyst at", "developer at",
                "researcher at", "professor at", "director at", "executive at",
            ],
            60,
            0.75,
        );
        self.add_pattern(
            WorkFor,
            ObjectFirst,
            &["hired", "employs", "employee", "recruited", "appointed"],
            30,
            0.8,
        );

        // per:cities_of_residence
        self.add_pattern(
            LiveIn,
            SubjectFirst,
            &[
                "lives in", "lived in", "living in", "resides in", "resided in",
                "resident of", "moved to", "relocated to", "settled in", "grew up in",
                "native of", "home in", "based in",
            ],
            60,
            0.85,
        );
        self.add_pattern(LiveIn, ObjectFirst, &["resident", "native", "local"], 20, 0.7);

        // org:top_members/employees
        self.add_pattern(
            TopMemberEmployees,
            SubjectFirst,
            &[
                "ceo", "chief executive", "founder", "co-founder", "president", "chairman",
                "chairwoman", "cto", "cfo", "coo", "founded by", "co-founded by", "led by",
                "headed by", "run by",
            ],
            40,
            0.8,
        );
        self.add_pattern(
            TopMemberEmployees,
            ObjectFirst,
            &[
                "ceo of", "chief executive of", "founder of", "co-founder of", "founded",
                "co-founded", "president of", "chairman of", "chairwoman of", "leads",
                "heads", "runs", "director of",
            ],
            40,
            0.85,
        );
    }

    /// Add a relation pattern
    fn add_pattern(
        &mut self,
        kind: RelationKind,
        order: EntityOrder,
        keywords: &[&str],
        max_distance: usize,
        confidence: f32,
    ) {
        let alternation: Vec<String> = keywords.iter().map(|k| regex::escape(k)).collect();
        let pattern = format!(r"(?i)\b(?:{})\b", alternation.join("|"));

        if let Ok(keywords) = Regex::new(&pattern) {
            self.patterns.push(RelationPattern {
                kind,
                order,
                keywords,
                max_distance,
                confidence,
            });
        }
    }

    fn crosses_sentence(&self, between: &str) -> bool {
        self.sentence_break
            .as_ref()
            .is_some_and(|regex| regex.is_match(between))
    }

    /// Patterns registered for a relation kind
    pub fn patterns_for(&self, kind: RelationKind) -> impl Iterator<Item = &RelationPattern> {
        self.patterns.iter().filter(move |p| p.kind == kind)
    }

    /// Find relations between entity pairs based on patterns
    fn find_pattern_relations(
        &self,
        text: &str,
        entities: &[ExtractedEntity],
        kind: RelationKind,
    ) -> Vec<ExtractedRelation> {
        let subjects: Vec<&ExtractedEntity> = entities
            .iter()
            .filter(|e| kind.subject_types().contains(&e.entity_type.as_str()))
            .collect();
        let objects: Vec<&ExtractedEntity> = entities
            .iter()
            .filter(|e| kind.object_types().contains(&e.entity_type.as_str()))
            .collect();

        // Best relation per (subject, object) occurrence pair
        let mut best: HashMap<(usize, usize), ExtractedRelation> = HashMap::new();

        for pattern in self.patterns_for(kind) {
            for subject in &subjects {
                for object in &objects {
                    let (first, second) = match pattern.order {
                        EntityOrder::SubjectFirst => (subject, object),
                        EntityOrder::ObjectFirst => (object, subject),
                    };
                    if first.end > second.start {
                        continue;
                    }

                    let Some(between) = text.get(first.end..second.start) else {
                        continue;
                    };
                    let distance = between.chars().count();
                    if distance > pattern.max_distance
                        || self.crosses_sentence(between)
                        || !pattern.keywords.is_match(between)
                    {
                        continue;
                    }

                    let confidence = pattern.confidence * proximity(distance, pattern.max_distance);
                    let key = (subject.start, object.start);
                    if best.get(&key).is_some_and(|r| r.confidence >= confidence) {
                        continue;
                    }
                    best.insert(
                        key,
                        ExtractedRelation {
                            subject: (*subject).clone(),
                            predicate: kind.target_label().to_string(),
                            object: (*object).clone(),
                            confidence,
                        },
                    );
                }
            }
        }

        let mut relations: Vec<ExtractedRelation> = best.into_values().collect();
        relations.sort_by_key(|r| (r.subject.start.min(r.object.start), r.object.start));
        relations
    }
}

/// Linear decay from 1.0 at zero gap to 0.5 at the pattern's maximum gap
fn proximity(distance: usize, max_distance: usize) -> f32 {
    if max_distance == 0 {
        return 1.0;
    }
    1.0 - 0.5 * (distance as f32 / max_distance as f32)
}

impl Default for RuleBasedRe {
    fn default() -> Self {
        Self::new()
    }
}

impl RelationFinder for RuleBasedRe {
    fn find(
        &self,
        text: &str,
        entities: &[ExtractedEntity],
        kind: RelationKind,
    ) -> Result<Vec<ExtractedRelation>> {
        Ok(self.find_pattern_relations(text, entities, kind))
    }
}

// ============================================================================
// LLM-based RE
// ============================================================================

/// LLM-based relation extractor: prompt construction and tolerant response parsing
pub struct LlmRe {
    system_prompt: String,
}

impl LlmRe {
    /// Create a new LLM RE with the default system prompt
    pub fn new() -> Self {
        Self {
            system_prompt: include_str!("prompts/re_system.txt").to_string(),
        }
    }

    /// Create with a custom system prompt
    pub fn with_system_prompt(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
        }
    }

    /// Build the extraction prompt
    pub fn build_prompt(&self, text: &str, entity_types: &[&str], target_label: &str) -> String {
        format!(
            "{}\n\nEntity types: {}\n\nRelation label: {}\n\nText:\n{}\n\nJSON:",
            self.system_prompt.trim_end(),
            entity_types.join(", "),
            target_label,
            text
        )
    }

    /// Parse an LLM response into candidate relations.
    ///
    /// Accepts a bare JSON array, a `{"relations": [...]}` wrapper, fenced
    /// code blocks and surrounding prose. Individual malformed entries are
    /// skipped; a response with no JSON array at all is an error.
    pub fn parse_response(&self, response: &str) -> Result<Vec<CandidateRelation>> {
        let entries = parse_entries(response).ok_or_else(|| {
            IseError::ExtractionError("LLM response contained no JSON relation array".to_string())
        })?;

        Ok(entries
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| {
                let candidate = candidate_from_value(entry);
                if candidate.is_none() {
                    debug!(index, entry = %entry, "Skipping malformed LLM relation");
                }
                candidate
            })
            .collect())
    }
}

impl Default for LlmRe {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_entries(response: &str) -> Option<Vec<Value>> {
    let body = strip_code_fence(response.trim());

    let value = serde_json::from_str::<Value>(body).ok().or_else(|| {
        // Fall back to the outermost bracketed span inside prose
        let start = body.find('[')?;
        let end = body.rfind(']')?;
        serde_json::from_str::<Value>(body.get(start..=end)?).ok()
    })?;

    match value {
        Value::Array(items) => Some(items),
        Value::Object(mut map) => match map.remove("relations") {
            Some(Value::Array(items)) => Some(items),
            _ => None,
        },
        _ => None,
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn candidate_from_value(entry: &Value) -> Option<CandidateRelation> {
    let object = entry.as_object()?;
    let subject = object.get("subject")?.as_str()?;
    let relation = object.get("relation")?.as_str()?;
    let target = object.get("object")?.as_str()?;
    let confidence = object.get("confidence")?.as_f64()? as f32;

    Some(CandidateRelation::new(subject, relation, target, confidence))
}

// ============================================================================
// Tests
// ============================================================================
