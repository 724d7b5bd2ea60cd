//! ISE Bootstrap - Iterative set expansion for relation extraction
//!
//! Starting from a seed query and a target relation, the controller
//! repeatedly searches the web, extracts relation tuples from unseen result
//! pages, merges them into a deduplicated store, and, while fewer than `k`
//! tuples are known, reformulates the query from facts it has already found.
//!
//! Author: hephaex@gmail.com

use chrono::{DateTime, Utc};
use ise_core::{IseError, RelationKind, RelationTuple, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod augment;
pub mod controller;
pub mod seen;
pub mod store;
pub mod text;

pub use augment::{augmenter_for, AllEligibleAugmenter, FirstEligibleAugmenter, QueryAugmenter};
pub use controller::{BootstrapController, ControllerConfig};
pub use seen::SeenSet;
pub use store::{MergeOutcome, TupleStore};

// ============================================================================
// Run Parameters
// ============================================================================

/// Validated inputs for one bootstrapping run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunParams {
    /// Initial search query
    pub seed_query: String,

    /// Relation to extract
    pub relation: RelationKind,

    /// Minimum extraction confidence
    pub threshold: f32,

    /// Number of distinct tuples requested
    pub k: usize,
}

impl RunParams {
    /// Validate and build run parameters
    pub fn new(
        seed_query: impl Into<String>,
        relation: RelationKind,
        threshold: f32,
        k: usize,
    ) -> Result<Self> {
        let seed_query = seed_query.into();

        if seed_query.trim().is_empty() {
            return Err(IseError::InvalidParameter(
                "seed query must not be empty".to_string(),
            ));
        }
        if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
            return Err(IseError::InvalidParameter(format!(
                "threshold must be between 0 and 1, got {threshold}"
            )));
        }
        if k == 0 {
            return Err(IseError::InvalidParameter(
                "k must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            seed_query,
            relation,
            threshold,
            k,
        })
    }

    /// Build from the numeric relation selector `r` (1..=4)
    pub fn from_selector(
        seed_query: impl Into<String>,
        r: u8,
        threshold: f32,
        k: usize,
    ) -> Result<Self> {
        Self::new(seed_query, RelationKind::from_selector(r)?, threshold, k)
    }
}

// ============================================================================
// Run Report
// ============================================================================

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// `k` distinct tuples collected
    ReachedTarget,
    /// No tuple could extend the query
    StoppedEarly,
    /// Cancellation was requested
    Cancelled,
    /// The configured iteration limit was hit
    IterationCap,
}

impl std::fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReachedTarget => write!(f, "reached k"),
            Self::StoppedEarly => write!(f, "stopped early"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::IterationCap => write!(f, "iteration limit reached"),
        }
    }
}

/// Result of a bootstrapping run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Run identifier (also attached to the tracing span)
    pub run_id: Uuid,

    /// Relation that was extracted
    pub relation: RelationKind,

    /// Tuples by descending confidence
    pub tuples: Vec<RelationTuple>,

    /// Number of iterations executed
    pub iterations: u32,

    /// Final number of distinct tuples
    pub extracted: usize,

    /// How the run ended
    pub outcome: RunOutcome,

    /// Query used by the last iteration
    pub final_query: String,

    /// Pages fetched and run through extraction
    pub pages_processed: usize,

    /// Pages skipped after a fetch or extraction failure
    pub pages_skipped: usize,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    /// True if the run collected `k` tuples
    pub fn reached_target(&self) -> bool {
        self.outcome == RunOutcome::ReachedTarget
    }
}

// ============================================================================
// Tests
// ============================================================================
