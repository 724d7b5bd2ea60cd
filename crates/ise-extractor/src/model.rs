//! Extraction model handle
//!
//! [`ExtractionModel`] is loaded once per run and shared with the bootstrap
//! controller behind an `Arc`. It owns either the rule-based NER + RE
//! pipeline or an LLM client, and implements the core
//! [`RelationExtractor`] collaborator trait for both.

use async_trait::async_trait;
use ise_core::{
    CandidateRelation, ExtractionConfig, ExtractorBackend, IseError, RelationExtractor,
    RelationKind, Result,
};
use tracing::debug;

use crate::llm::{create_llm_client, LlmClient};
use crate::ner::RuleBasedNer;
use crate::relation::{LlmRe, RuleBasedRe};
use crate::{EntityExtractor, RelationFinder};

enum Backend {
    Rules { ner: RuleBasedNer, re: RuleBasedRe },
    Llm { client: Box<dyn LlmClient>, re: LlmRe },
}

/// Loaded relation-extraction model
pub struct ExtractionModel {
    backend: Backend,
}

impl ExtractionModel {
    /// Load the backend selected by config
    pub fn load(config: &ExtractionConfig) -> Result<Self> {
        match config.backend {
            ExtractorBackend::Rules => Ok(Self::rule_based()),
            ExtractorBackend::Llm => Ok(Self::with_llm(create_llm_client(&config.llm)?)),
        }
    }

    /// Rule-based NER + keyword relation patterns
    pub fn rule_based() -> Self {
        Self {
            backend: Backend::Rules {
                ner: RuleBasedNer::new(),
                re: RuleBasedRe::new(),
            },
        }
    }

    /// LLM-backed extraction through the given client
    pub fn with_llm(client: Box<dyn LlmClient>) -> Self {
        Self {
            backend: Backend::Llm {
                client,
                re: LlmRe::new(),
            },
        }
    }

    /// Which backend this model runs
    pub fn backend(&self) -> ExtractorBackend {
        match self.backend {
            Backend::Rules { .. } => ExtractorBackend::Rules,
            Backend::Llm { .. } => ExtractorBackend::Llm,
        }
    }

    fn extract_with_rules(
        ner: &RuleBasedNer,
        re: &RuleBasedRe,
        text: &str,
        entity_types: &[&str],
        kind: RelationKind,
    ) -> Result<Vec<CandidateRelation>> {
        let entities: Vec<_> = ner
            .extract(text)?
            .into_iter()
            .filter(|e| entity_types.contains(&e.entity_type.as_str()))
            .collect();
        debug!(entities = entities.len(), "Recognised entities");

        Ok(re
            .find(text, &entities, kind)?
            .into_iter()
            .map(|r| CandidateRelation::new(r.subject.text, r.predicate, r.object.text, r.confidence))
            .collect())
    }
}

fn relation_for_label(target_label: &str) -> Result<RelationKind> {
    RelationKind::ALL
        .into_iter()
        .find(|kind| kind.target_label() == target_label)
        .ok_or_else(|| {
            IseError::ExtractionError(format!("Unsupported relation label: {target_label}"))
        })
}

#[async_trait]
impl RelationExtractor for ExtractionModel {
    async fn extract_relations(
        &self,
        text: &str,
        entity_types: &[&str],
        target_label: &str,
        threshold: f32,
    ) -> Result<Vec<CandidateRelation>> {
        let candidates = match &self.backend {
            Backend::Rules { ner, re } => {
                let kind = relation_for_label(target_label)?;
                Self::extract_with_rules(ner, re, text, entity_types, kind)?
            }
            Backend::Llm { client, re } => {
                let prompt = re.build_prompt(text, entity_types, target_label);
                let response = client
                    .generate(&prompt)
                    .await
                    .map_err(|e| IseError::ExtractionError(e.to_string()))?;
                re.parse_response(&response)?
            }
        };

        Ok(candidates
            .into_iter()
            .filter(|c| c.confidence >= threshold)
            .collect())
    }

    fn name(&self) -> &str {
        match self.backend {
            Backend::Rules { .. } => "rules",
            Backend::Llm { .. } => "llm",
        }
    }
}
