//! Bootstrapping controller
//!
//! Drives search -> fetch -> extract -> merge -> augment until the store
//! holds `k` tuples or the query can no longer be extended. Pages are handled
//! strictly one at a time, so merges are applied in candidate order within a
//! page and in page order across an iteration.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use ise_core::{AppConfig, IseError, RelationExtractor, Result, SearchProvider, TextFetcher};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

use crate::augment::{augmenter_for, FirstEligibleAugmenter, QueryAugmenter};
use crate::seen::SeenSet;
use crate::store::{MergeOutcome, TupleStore};
use crate::text::truncate_text;
use crate::{RunOutcome, RunParams, RunReport};

// ============================================================================
// Configuration
// ============================================================================

/// Controller tuning knobs
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Wall-clock limit for fetching one page
    pub fetch_timeout: Duration,

    /// Page text is truncated to this many characters before extraction
    pub max_chars: usize,

    /// Stop after this many iterations even if `k` is not reached
    pub max_iterations: Option<u32>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(20),
            max_chars: 20_000,
            max_iterations: None,
        }
    }
}

impl ControllerConfig {
    /// Create from app config
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            fetch_timeout: Duration::from_secs(config.fetch.timeout_secs),
            max_chars: config.fetch.max_chars,
            max_iterations: config.bootstrap.max_iterations,
        }
    }
}

/// Mutable state owned by a single run
struct RunState {
    query: String,
    store: TupleStore,
    seen: SeenSet,
    iteration: u32,
    pages_processed: usize,
    pages_skipped: usize,
}

/// What happened to one page
enum PageResult {
    Processed { merged: usize },
    Failed(IseError),
}

// ============================================================================
// Controller
// ============================================================================

/// Iterative set expansion controller
pub struct BootstrapController {
    search: Arc<dyn SearchProvider>,
    fetcher: Arc<dyn TextFetcher>,
    extractor: Arc<dyn RelationExtractor>,
    augmenter: Box<dyn QueryAugmenter>,
    config: ControllerConfig,
}

impl BootstrapController {
    /// Create a controller with default settings
    pub fn new(
        search: Arc<dyn SearchProvider>,
        fetcher: Arc<dyn TextFetcher>,
        extractor: Arc<dyn RelationExtractor>,
    ) -> Self {
        Self {
            search,
            fetcher,
            extractor,
            augmenter: Box::new(FirstEligibleAugmenter),
            config: ControllerConfig::default(),
        }
    }

    /// Create from app config (timeouts, truncation cap, augmentation policy)
    pub fn from_config(
        search: Arc<dyn SearchProvider>,
        fetcher: Arc<dyn TextFetcher>,
        extractor: Arc<dyn RelationExtractor>,
        config: &AppConfig,
    ) -> Self {
        Self::new(search, fetcher, extractor)
            .with_augmenter(augmenter_for(config.bootstrap.augmentation))
            .with_config(ControllerConfig::from_app_config(config))
    }

    /// Set the query augmentation strategy
    pub fn with_augmenter(mut self, augmenter: Box<dyn QueryAugmenter>) -> Self {
        self.augmenter = augmenter;
        self
    }

    /// Set controller configuration
    pub fn with_config(mut self, config: ControllerConfig) -> Self {
        self.config = config;
        self
    }

    /// Run until `k` tuples are collected or progress stalls
    pub async fn run(&self, params: &RunParams) -> Result<RunReport> {
        self.run_with_cancel(params, &CancellationToken::new()).await
    }

    /// Run with an external cancellation signal.
    ///
    /// The token is checked between pages and between iterations; a cancelled
    /// run returns whatever the store holds at that point.
    pub async fn run_with_cancel(
        &self,
        params: &RunParams,
        cancel: &CancellationToken,
    ) -> Result<RunReport> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "bootstrap_run",
            %run_id,
            relation = %params.relation,
            k = params.k,
        );

        self.execute(run_id, params, cancel).instrument(span).await
    }

    async fn execute(
        &self,
        run_id: Uuid,
        params: &RunParams,
        cancel: &CancellationToken,
    ) -> Result<RunReport> {
        let started_at = Utc::now();
        let mut state = RunState {
            query: params.seed_query.clone(),
            store: TupleStore::new(),
            seen: SeenSet::new(),
            iteration: 0,
            pages_processed: 0,
            pages_skipped: 0,
        };

        info!(
            search = self.search.name(),
            extractor = self.extractor.name(),
            augmenter = self.augmenter.name(),
            threshold = params.threshold,
            "Bootstrapping run started"
        );

        let outcome = loop {
            if state.store.len() >= params.k {
                break RunOutcome::ReachedTarget;
            }
            if cancel.is_cancelled() {
                break RunOutcome::Cancelled;
            }
            if let Some(max) = self.config.max_iterations {
                if state.iteration >= max {
                    break RunOutcome::IterationCap;
                }
            }

            state.iteration += 1;
            info!(iteration = state.iteration, query = %state.query, "Issuing search query");

            let hits = self.search.search(&state.query).await?;
            debug!("Search returned {} results", hits.len());

            for hit in hits {
                if cancel.is_cancelled() {
                    break;
                }
                if !state.seen.insert(&hit.url) {
                    debug!(url = %hit.url, "Skipping already seen URL");
                    continue;
                }

                match self.process_page(&hit.url, params, &mut state.store).await {
                    PageResult::Processed { merged } => {
                        state.pages_processed += 1;
                        info!(
                            url = %hit.url,
                            merged,
                            total = state.store.len(),
                            "Finished processing page"
                        );
                    }
                    PageResult::Failed(err) => {
                        state.pages_skipped += 1;
                        warn!(url = %hit.url, error = %err, "Skipping page");
                    }
                }

                if state.store.len() >= params.k {
                    break;
                }
            }

            if state.store.len() >= params.k {
                break RunOutcome::ReachedTarget;
            }
            if cancel.is_cancelled() {
                break RunOutcome::Cancelled;
            }

            match self.augmenter.augment(&state.store.sorted(), &state.query) {
                Some(next) => {
                    info!(query = %next, "Query updated");
                    state.query = next;
                }
                None => {
                    info!("Unable to update query (no eligible relation tuple)");
                    break RunOutcome::StoppedEarly;
                }
            }
        };

        let extracted = state.store.len();
        info!(
            %outcome,
            iterations = state.iteration,
            extracted,
            "Bootstrapping run finished"
        );

        Ok(RunReport {
            run_id,
            relation: params.relation,
            tuples: state.store.into_sorted(),
            iterations: state.iteration,
            extracted,
            outcome,
            final_query: state.query,
            pages_processed: state.pages_processed,
            pages_skipped: state.pages_skipped,
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// Fetch, truncate, extract and merge a single page.
    ///
    /// Stops merging as soon as the store reaches `k`.
    async fn process_page(
        &self,
        url: &str,
        params: &RunParams,
        store: &mut TupleStore,
    ) -> PageResult {
        let timeout = self.config.fetch_timeout;
        let text = match tokio::time::timeout(timeout, self.fetcher.fetch_text(url, timeout)).await
        {
            Ok(Ok(text)) => text,
            Ok(Err(err)) => return PageResult::Failed(err),
            Err(_) => {
                return PageResult::Failed(IseError::FetchTimeout {
                    url: url.to_string(),
                    timeout,
                })
            }
        };

        let (text, original_len) = truncate_text(text, self.config.max_chars);
        if let Some(original) = original_len {
            info!(
                url,
                "Truncated from {} to {} characters", original, self.config.max_chars
            );
        }

        let target = params.relation.target_label();
        let candidates = match self
            .extractor
            .extract_relations(
                &text,
                params.relation.entity_types(),
                target,
                params.threshold,
            )
            .await
        {
            Ok(candidates) => candidates,
            Err(err) => return PageResult::Failed(err),
        };

        let mut merged = 0;
        for candidate in candidates {
            if candidate.relation != target {
                continue;
            }

            let outcome = store.merge(&candidate.subject, &candidate.object, candidate.confidence);
            match outcome {
                MergeOutcome::Malformed => {
                    debug!(?candidate, "Skipping malformed candidate");
                }
                MergeOutcome::Rejected => {
                    debug!(
                        subject = %candidate.subject,
                        object = %candidate.object,
                        confidence = candidate.confidence,
                        "Duplicate with lower confidence"
                    );
                }
                MergeOutcome::Inserted | MergeOutcome::Replaced { .. } => {
                    merged += 1;
                    debug!(
                        subject = %candidate.subject,
                        object = %candidate.object,
                        confidence = candidate.confidence,
                        ?outcome,
                        "Merged tuple"
                    );
                }
            }

            if store.len() >= params.k {
                break;
            }
        }

        PageResult::Processed { merged }
    }
}
