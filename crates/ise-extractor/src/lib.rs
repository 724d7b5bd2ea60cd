//! ISE Extractor - Relation extraction collaborators
//!
//! Implements Named Entity Recognition (NER) and
//! Relation Extraction (RE) for the four bootstrap relations,
//! with a rule-based pipeline and an LLM-backed alternative.

use ise_core::{RelationKind, Result};

/// Extracted entity from text
#[derive(Debug, Clone)]
pub struct ExtractedEntity {
    pub text: String,
    pub entity_type: String,
    pub start: usize,
    pub end: usize,
    pub confidence: f32,
}

/// Extracted relation between entities
#[derive(Debug, Clone)]
pub struct ExtractedRelation {
    pub subject: ExtractedEntity,
    pub predicate: String,
    pub object: ExtractedEntity,
    pub confidence: f32,
}

/// Trait for entity extractors
pub trait EntityExtractor: Send + Sync {
    fn extract(&self, text: &str) -> Result<Vec<ExtractedEntity>>;
}

/// Trait for relation finders working over already-recognised entities
pub trait RelationFinder: Send + Sync {
    fn find(
        &self,
        text: &str,
        entities: &[ExtractedEntity],
        kind: RelationKind,
    ) -> Result<Vec<ExtractedRelation>>;
}

pub mod llm;
pub mod model;
pub mod ner;
pub mod relation;

pub use llm::{create_llm_client, LlmClient, OllamaClient, OpenAiClient};
pub use model::ExtractionModel;
pub use ner::RuleBasedNer;
pub use relation::{LlmRe, RuleBasedRe};
