//! ISE Core - Domain models, collaborator traits, and shared types
//!
//! This crate defines the core abstractions used throughout the ISE system:
//! - Relation models (relation kinds, candidate relations, relation tuples)
//! - Search result types
//! - Common error types
//! - Collaborator traits (search, page fetching, relation extraction)
//! - Configuration management

pub mod config;

pub use config::{
    AppConfig, AugmentationPolicy, BootstrapConfig, ConfigError, ExtractionConfig,
    ExtractorBackend, FetchConfig, LlmConfig, LlmProvider, LoggingConfig, SearchConfig,
};

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for ISE operations
#[derive(Error, Debug)]
pub enum IseError {
    #[error("Search provider unavailable: {0}")]
    SearchUnavailable(String),

    #[error("Fetch timed out after {timeout:?}: {url}")]
    FetchTimeout { url: String, timeout: Duration },

    #[error("Fetch failed for {url}: {reason}")]
    FetchError { url: String, reason: String },

    #[error("Relation extraction failed: {0}")]
    ExtractionError(String),

    #[error("Invalid run parameter: {0}")]
    InvalidParameter(String),

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<ConfigError> for IseError {
    fn from(err: ConfigError) -> Self {
        Self::ConfigError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, IseError>;

// ============================================================================
// Relation Kinds
// ============================================================================

/// Entity type labels understood by the extraction collaborators
pub mod entity_types {
    pub const PERSON: &str = "PERSON";
    pub const ORGANIZATION: &str = "ORGANIZATION";
    pub const LOCATION: &str = "LOCATION";
    pub const CITY: &str = "CITY";
    pub const STATE_OR_PROVINCE: &str = "STATE_OR_PROVINCE";
    pub const COUNTRY: &str = "COUNTRY";
}

/// The four relations a run can target, selected on the command line by `r`
///
/// - `1` Schools_Attended: PERSON -> ORGANIZATION
/// - `2` Work_For: PERSON -> ORGANIZATION
/// - `3` Live_In: PERSON -> LOCATION | CITY | STATE_OR_PROVINCE | COUNTRY
/// - `4` Top_Member_Employees: ORGANIZATION -> PERSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    SchoolsAttended,
    WorkFor,
    LiveIn,
    TopMemberEmployees,
}

impl RelationKind {
    /// All relation kinds in selector order
    pub const ALL: [RelationKind; 4] = [
        Self::SchoolsAttended,
        Self::WorkFor,
        Self::LiveIn,
        Self::TopMemberEmployees,
    ];

    /// Resolve the numeric selector `r` (1..=4)
    pub fn from_selector(r: u8) -> Result<Self> {
        match r {
            1 => Ok(Self::SchoolsAttended),
            2 => Ok(Self::WorkFor),
            3 => Ok(Self::LiveIn),
            4 => Ok(Self::TopMemberEmployees),
            other => Err(IseError::InvalidParameter(format!(
                "relation selector must be between 1 and 4, got {other}"
            ))),
        }
    }

    /// Numeric selector for this relation
    pub fn selector(&self) -> u8 {
        match self {
            Self::SchoolsAttended => 1,
            Self::WorkFor => 2,
            Self::LiveIn => 3,
            Self::TopMemberEmployees => 4,
        }
    }

    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::SchoolsAttended => "Schools_Attended",
            Self::WorkFor => "Work_For",
            Self::LiveIn => "Live_In",
            Self::TopMemberEmployees => "Top_Member_Employees",
        }
    }

    /// Relation label produced by the extractor for this relation
    pub fn target_label(&self) -> &'static str {
        match self {
            Self::SchoolsAttended => "per:schools_attended",
            Self::WorkFor => "per:employee_of",
            Self::LiveIn => "per:cities_of_residence",
            Self::TopMemberEmployees => "org:top_members/employees",
        }
    }

    /// Entity types allowed as the subject
    pub fn subject_types(&self) -> &'static [&'static str] {
        use entity_types::*;
        match self {
            Self::SchoolsAttended | Self::WorkFor | Self::LiveIn => &[PERSON],
            Self::TopMemberEmployees => &[ORGANIZATION],
        }
    }

    /// Entity types allowed as the object
    pub fn object_types(&self) -> &'static [&'static str] {
        use entity_types::*;
        match self {
            Self::SchoolsAttended | Self::WorkFor => &[ORGANIZATION],
            Self::LiveIn => &[LOCATION, CITY, STATE_OR_PROVINCE, COUNTRY],
            Self::TopMemberEmployees => &[PERSON],
        }
    }

    /// Entity types the NER stage must recognise for this relation
    pub fn entity_types(&self) -> &'static [&'static str] {
        use entity_types::*;
        match self {
            Self::LiveIn => &[
                ORGANIZATION,
                PERSON,
                LOCATION,
                CITY,
                STATE_OR_PROVINCE,
                COUNTRY,
            ],
            _ => &[ORGANIZATION, PERSON],
        }
    }
}

impl std::fmt::Display for RelationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// Extraction Models
// ============================================================================

/// A candidate relation as produced by an extraction collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRelation {
    /// Subject entity text
    pub subject: String,

    /// Relation label (e.g. "per:employee_of")
    pub relation: String,

    /// Object entity text
    pub object: String,

    /// Extraction confidence (0.0 - 1.0)
    pub confidence: f32,
}

impl CandidateRelation {
    /// Create a new candidate
    pub fn new(
        subject: impl Into<String>,
        relation: impl Into<String>,
        object: impl Into<String>,
        confidence: f32,
    ) -> Self {
        Self {
            subject: subject.into(),
            relation: relation.into(),
            object: object.into(),
            confidence,
        }
    }
}

/// One accumulated fact: a case-normalised (subject, object) pair with its best confidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationTuple {
    pub subject: String,
    pub object: String,
    pub confidence: f32,
}

// ============================================================================
// Search Types
// ============================================================================

/// One result page returned by a search provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Page URL
    pub url: String,

    /// Result title
    pub title: Option<String>,

    /// Result snippet
    pub snippet: Option<String>,

    /// Display host
    pub display_link: Option<String>,
}

impl SearchHit {
    /// Create a hit with only a URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: None,
            snippet: None,
            display_link: None,
        }
    }
}

// ============================================================================
// Traits
// ============================================================================

/// Web search collaborator
#[async_trait::async_trait]
pub trait SearchProvider: Send + Sync {
    /// Return result pages for the query, in ranked order
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}

/// Page fetching and plain-text extraction collaborator
#[async_trait::async_trait]
pub trait TextFetcher: Send + Sync {
    /// Fetch the page and return its plain text
    async fn fetch_text(&self, url: &str, timeout: Duration) -> Result<String>;
}

/// Named-entity + relation extraction collaborator
#[async_trait::async_trait]
pub trait RelationExtractor: Send + Sync {
    /// Extract candidate relations from text.
    ///
    /// Implementations only return candidates whose confidence is at least
    /// `threshold`; an empty result is not an error.
    async fn extract_relations(
        &self,
        text: &str,
        entity_types: &[&str],
        target_label: &str,
        threshold: f32,
    ) -> Result<Vec<CandidateRelation>>;

    /// Get extractor name for logging
    fn name(&self) -> &str;
}

// ============================================================================
// Tests
// ============================================================================
