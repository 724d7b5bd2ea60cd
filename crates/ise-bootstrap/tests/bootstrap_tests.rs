//! Bootstrapping controller tests against scripted collaborators
//!
//! Author: hephaex@gmail.com

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use ise_bootstrap::{
    AllEligibleAugmenter, BootstrapController, ControllerConfig, RunOutcome, RunParams,
};
use ise_core::{
    CandidateRelation, IseError, RelationExtractor, RelationKind, Result, SearchHit,
    SearchProvider, TextFetcher,
};
use tokio_util::sync::CancellationToken;

const WORK_FOR: &str = "per:employee_of";

// =============================================================================
// Scripted collaborators
// =============================================================================

/// Returns the same hits for every query unless a query-specific list exists
#[derive(Default)]
struct ScriptedSearch {
    by_query: HashMap<String, Vec<String>>,
    fallback: Vec<String>,
    fail: bool,
    queries: Mutex<Vec<String>>,
}

impl ScriptedSearch {
    fn always(urls: &[&str]) -> Self {
        Self {
            fallback: urls.iter().map(|u| u.to_string()).collect(),
            ..Default::default()
        }
    }

    fn with_query(mut self, query: &str, urls: &[&str]) -> Self {
        self.by_query.insert(
            query.to_string(),
            urls.iter().map(|u| u.to_string()).collect(),
        );
        self
    }

    fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchProvider for ScriptedSearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        self.queries.lock().unwrap().push(query.to_string());
        if self.fail {
            return Err(IseError::SearchUnavailable("quota exceeded".to_string()));
        }
        let urls = self.by_query.get(query).unwrap_or(&self.fallback);
        Ok(urls.iter().map(SearchHit::new).collect())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

enum Page {
    Text(String),
    Error,
    Hang,
}

/// Serves page text by URL; unknown URLs fail
#[derive(Default)]
struct ScriptedFetcher {
    pages: HashMap<String, Page>,
    cancel_on: Option<(String, CancellationToken)>,
    fetched: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    fn page(mut self, url: &str, text: &str) -> Self {
        self.pages.insert(url.to_string(), Page::Text(text.to_string()));
        self
    }

    fn failing(mut self, url: &str) -> Self {
        self.pages.insert(url.to_string(), Page::Error);
        self
    }

    fn hanging(mut self, url: &str) -> Self {
        self.pages.insert(url.to_string(), Page::Hang);
        self
    }

    /// Cancel the run while this URL is being fetched
    fn cancelling_on(mut self, url: &str, token: &CancellationToken) -> Self {
        self.cancel_on = Some((url.to_string(), token.clone()));
        self
    }

    fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextFetcher for ScriptedFetcher {
    async fn fetch_text(&self, url: &str, _timeout: Duration) -> Result<String> {
        self.fetched.lock().unwrap().push(url.to_string());
        if let Some((cancel_url, token)) = &self.cancel_on {
            if cancel_url == url {
                token.cancel();
            }
        }
        match self.pages.get(url) {
            Some(Page::Text(text)) => Ok(text.clone()),
            Some(Page::Hang) => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(String::new())
            }
            Some(Page::Error) | None => Err(IseError::FetchError {
                url: url.to_string(),
                reason: "HTTP 500".to_string(),
            }),
        }
    }
}

/// Maps page text to candidate relations; records the text it was given
#[derive(Default)]
struct ScriptedExtractor {
    by_text: HashMap<String, Vec<CandidateRelation>>,
    failing: Vec<String>,
    seen_lengths: Mutex<Vec<usize>>,
}

impl ScriptedExtractor {
    fn on(mut self, text: &str, candidates: Vec<CandidateRelation>) -> Self {
        self.by_text.insert(text.to_string(), candidates);
        self
    }

    fn failing_on(mut self, text: &str) -> Self {
        self.failing.push(text.to_string());
        self
    }
}

#[async_trait]
impl RelationExtractor for ScriptedExtractor {
    async fn extract_relations(
        &self,
        text: &str,
        _entity_types: &[&str],
        _target_label: &str,
        threshold: f32,
    ) -> Result<Vec<CandidateRelation>> {
        self.seen_lengths.lock().unwrap().push(text.chars().count());
        if self.failing.iter().any(|t| t == text) {
            return Err(IseError::ConfigError("model weights unavailable".to_string()));
        }
        Ok(self
            .by_text
            .get(text)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|c| c.confidence >= threshold)
            .collect())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

fn work_for(subject: &str, object: &str, confidence: f32) -> CandidateRelation {
    CandidateRelation::new(subject, WORK_FOR, object, confidence)
}

fn controller(
    search: &Arc<ScriptedSearch>,
    fetcher: &Arc<ScriptedFetcher>,
    extractor: &Arc<ScriptedExtractor>,
) -> BootstrapController {
    BootstrapController::new(search.clone(), fetcher.clone(), extractor.clone())
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_example_scenario_reaches_k() {
    let search = Arc::new(ScriptedSearch::always(&["http://p1", "http://p2", "http://p3"]));
    let fetcher = Arc::new(
        ScriptedFetcher::default()
            .page("http://p1", "page one")
            .page("http://p2", "page two")
            .page("http://p3", "page three"),
    );
    let extractor = Arc::new(
        ScriptedExtractor::default()
            .on("page one", vec![work_for("John Doe", "Acme Corp", 0.9)])
            .on(
                "page two",
                vec![
                    work_for("john doe", "acme corp", 0.75),
                    work_for("Jane Roe", "Beta Inc", 0.8),
                ],
            ),
    );

    let params = RunParams::new("John Doe works", RelationKind::WorkFor, 0.7, 2).unwrap();
    let report = controller(&search, &fetcher, &extractor)
        .run(&params)
        .await
        .unwrap();

    assert_eq!(report.outcome, RunOutcome::ReachedTarget);
    assert_eq!(report.extracted, 2);
    assert_eq!(report.iterations, 1);
    assert_eq!(report.tuples[0].subject, "john doe");
    assert_eq!(report.tuples[0].object, "acme corp");
    assert_eq!(report.tuples[0].confidence, 0.9);
    assert_eq!(report.tuples[1].subject, "jane roe");
    assert_eq!(report.tuples[1].confidence, 0.8);
    // Third page never fetched once k was reached
    assert_eq!(fetcher.fetched(), vec!["http://p1", "http://p2"]);
}

#[tokio::test]
async fn test_below_threshold_candidates_ignored() {
    let search = Arc::new(ScriptedSearch::always(&["http://p1"]));
    let fetcher = Arc::new(ScriptedFetcher::default().page("http://p1", "page one"));
    let extractor = Arc::new(ScriptedExtractor::default().on(
        "page one",
        vec![work_for("john", "acme", 0.5), work_for("jane", "beta", 0.8)],
    ));

    let params = RunParams::new("seed", RelationKind::WorkFor, 0.7, 5).unwrap();
    let report = controller(&search, &fetcher, &extractor)
        .run(&params)
        .await
        .unwrap();

    assert_eq!(report.extracted, 1);
    assert_eq!(report.tuples[0].subject, "jane");
}

#[tokio::test]
async fn test_terminates_with_exactly_k_tuples() {
    // Every page yields one new tuple; each query gets two fresh pages
    let search = Arc::new(
        ScriptedSearch::default()
            .with_query("seed", &["http://a1", "http://a2"])
            .with_query("seed x1 s1", &["http://b1", "http://b2"])
            .with_query("seed x1 s1 x2 s2", &["http://c1", "http://c2"]),
    );
    let mut fetcher = ScriptedFetcher::default();
    let mut extractor = ScriptedExtractor::default();
    for (i, url) in ["a1", "a2", "b1", "b2", "c1", "c2"].iter().enumerate() {
        let text = format!("text {url}");
        fetcher = fetcher.page(&format!("http://{url}"), &text);
        extractor = extractor.on(
            &text,
            vec![work_for(
                &format!("s{}", i + 1),
                &format!("x{}", i + 1),
                0.99 - i as f32 * 0.01,
            )],
        );
    }
    let (search, fetcher, extractor) = (search, Arc::new(fetcher), Arc::new(extractor));

    let params = RunParams::new("seed", RelationKind::WorkFor, 0.5, 5).unwrap();
    let report = controller(&search, &fetcher, &extractor)
        .run(&params)
        .await
        .unwrap();

    assert_eq!(report.outcome, RunOutcome::ReachedTarget);
    assert_eq!(report.tuples.len(), 5);
    assert_eq!(report.iterations, 3);
    assert_eq!(
        search.queries(),
        vec!["seed", "seed x1 s1", "seed x1 s1 x2 s2"]
    );
}

#[tokio::test]
async fn test_no_progress_stops_early() {
    let search = Arc::new(ScriptedSearch::always(&["http://p1"]));
    let fetcher = Arc::new(ScriptedFetcher::default().page("http://p1", "page one"));
    let extractor = Arc::new(
        ScriptedExtractor::default().on("page one", vec![work_for("john", "acme", 0.9)]),
    );

    let params = RunParams::new("john acme", RelationKind::WorkFor, 0.5, 3).unwrap();
    let report = controller(&search, &fetcher, &extractor)
        .run(&params)
        .await
        .unwrap();

    assert_eq!(report.outcome, RunOutcome::StoppedEarly);
    assert!(!report.reached_target());
    assert_eq!(report.extracted, 1);
    assert_eq!(report.iterations, 1);
}

#[tokio::test]
async fn test_seen_urls_never_refetched() {
    let search = Arc::new(ScriptedSearch::always(&["http://p1", "http://p2"]));
    let fetcher = Arc::new(
        ScriptedFetcher::default()
            .page("http://p1", "page one")
            .page("http://p2", "page two"),
    );
    let extractor = Arc::new(
        ScriptedExtractor::default()
            .on("page one", vec![work_for("john", "acme", 0.9)])
            .on("page two", vec![work_for("jane", "beta", 0.8)]),
    );

    let params = RunParams::new("seed", RelationKind::WorkFor, 0.5, 10).unwrap();
    let report = controller(&search, &fetcher, &extractor)
        .run(&params)
        .await
        .unwrap();

    // Iteration 1 fetches both pages; iterations 2 and 3 see only known URLs
    assert_eq!(fetcher.fetched(), vec!["http://p1", "http://p2"]);
    assert_eq!(report.pages_processed, 2);
    assert_eq!(report.iterations, 3);
    assert_eq!(report.outcome, RunOutcome::StoppedEarly);
    assert_eq!(report.final_query, "seed acme john beta jane");
}

#[tokio::test]
async fn test_failed_pages_are_skipped() {
    let search = Arc::new(ScriptedSearch::always(&[
        "http://broken",
        "http://slow",
        "http://good",
    ]));
    let fetcher = Arc::new(
        ScriptedFetcher::default()
            .failing("http://broken")
            .hanging("http://slow")
            .page("http://good", "good page"),
    );
    let extractor = Arc::new(
        ScriptedExtractor::default().on("good page", vec![work_for("john", "acme", 0.9)]),
    );

    let params = RunParams::new("seed", RelationKind::WorkFor, 0.5, 1).unwrap();
    let report = controller(&search, &fetcher, &extractor)
        .with_config(ControllerConfig {
            fetch_timeout: Duration::from_millis(50),
            ..Default::default()
        })
        .run(&params)
        .await
        .unwrap();

    assert_eq!(report.outcome, RunOutcome::ReachedTarget);
    assert_eq!(report.pages_skipped, 2);
    assert_eq!(report.pages_processed, 1);
}

#[tokio::test]
async fn test_search_failure_is_fatal() {
    let search = Arc::new(ScriptedSearch {
        fail: true,
        ..Default::default()
    });
    let fetcher = Arc::new(ScriptedFetcher::default());
    let extractor = Arc::new(ScriptedExtractor::default());

    let params = RunParams::new("seed", RelationKind::WorkFor, 0.5, 1).unwrap();
    let err = controller(&search, &fetcher, &extractor)
        .run(&params)
        .await
        .unwrap_err();

    assert!(matches!(err, IseError::SearchUnavailable(_)));
}

#[tokio::test]
async fn test_other_relation_labels_and_malformed_entries_skipped() {
    let search = Arc::new(ScriptedSearch::always(&["http://p1"]));
    let fetcher = Arc::new(ScriptedFetcher::default().page("http://p1", "page one"));
    let extractor = Arc::new(ScriptedExtractor::default().on(
        "page one",
        vec![
            CandidateRelation::new("john", "per:schools_attended", "mit", 0.95),
            work_for("", "acme", 0.9),
            work_for("jane", "beta", 0.8),
        ],
    ));

    let params = RunParams::new("seed", RelationKind::WorkFor, 0.5, 1).unwrap();
    let report = controller(&search, &fetcher, &extractor)
        .run(&params)
        .await
        .unwrap();

    assert_eq!(report.extracted, 1);
    assert_eq!(report.tuples[0].subject, "jane");
    assert_eq!(report.outcome, RunOutcome::ReachedTarget);
}

#[tokio::test]
async fn test_text_truncated_before_extraction() {
    let long_text = "a".repeat(500);
    let search = Arc::new(ScriptedSearch::always(&["http://p1"]));
    let fetcher = Arc::new(ScriptedFetcher::default().page("http://p1", &long_text));
    let extractor = Arc::new(ScriptedExtractor::default());

    let params = RunParams::new("seed", RelationKind::WorkFor, 0.5, 1).unwrap();
    let report = controller(&search, &fetcher, &extractor)
        .with_config(ControllerConfig {
            max_chars: 100,
            ..Default::default()
        })
        .run(&params)
        .await
        .unwrap();

    assert_eq!(*extractor.seen_lengths.lock().unwrap(), vec![100]);
    assert_eq!(report.outcome, RunOutcome::StoppedEarly);
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let search = Arc::new(ScriptedSearch::always(&["http://p1"]));
    let fetcher = Arc::new(ScriptedFetcher::default());
    let extractor = Arc::new(ScriptedExtractor::default());

    let cancel = CancellationToken::new();
    cancel.cancel();

    let params = RunParams::new("seed", RelationKind::WorkFor, 0.5, 1).unwrap();
    let report = controller(&search, &fetcher, &extractor)
        .run_with_cancel(&params, &cancel)
        .await
        .unwrap();

    assert_eq!(report.outcome, RunOutcome::Cancelled);
    assert_eq!(report.iterations, 0);
    assert!(search.queries().is_empty());
}

#[tokio::test]
async fn test_cancelled_between_pages() {
    let cancel = CancellationToken::new();
    let search = Arc::new(ScriptedSearch::always(&["http://p1", "http://p2"]));
    let fetcher = Arc::new(
        ScriptedFetcher::default()
            .page("http://p1", "page one")
            .page("http://p2", "page two")
            .cancelling_on("http://p1", &cancel),
    );
    let extractor = Arc::new(
        ScriptedExtractor::default()
            .on("page one", vec![work_for("john", "acme", 0.9)])
            .on("page two", vec![work_for("jane", "beta", 0.8)]),
    );

    let params = RunParams::new("seed", RelationKind::WorkFor, 0.5, 5).unwrap();
    let report = controller(&search, &fetcher, &extractor)
        .run_with_cancel(&params, &cancel)
        .await
        .unwrap();

    assert_eq!(report.outcome, RunOutcome::Cancelled);
    assert_eq!(fetcher.fetched(), vec!["http://p1"]);
    assert_eq!(report.iterations, 1);
    assert_eq!(report.pages_processed, 1);
    assert_eq!(report.extracted, 1);
    assert_eq!(report.tuples[0].subject, "john");
    assert_eq!(report.tuples[0].object, "acme");
    assert_eq!(search.queries(), vec!["seed"]);
}

#[tokio::test]
async fn test_any_extractor_error_skips_page() {
    let search = Arc::new(ScriptedSearch::always(&["http://p1", "http://p2"]));
    let fetcher = Arc::new(
        ScriptedFetcher::default()
            .page("http://p1", "page one")
            .page("http://p2", "page two"),
    );
    let extractor = Arc::new(
        ScriptedExtractor::default()
            .failing_on("page one")
            .on("page two", vec![work_for("jane", "beta", 0.8)]),
    );

    let params = RunParams::new("seed", RelationKind::WorkFor, 0.5, 1).unwrap();
    let report = controller(&search, &fetcher, &extractor)
        .run(&params)
        .await
        .unwrap();

    assert_eq!(report.outcome, RunOutcome::ReachedTarget);
    assert_eq!(report.pages_skipped, 1);
    assert_eq!(report.pages_processed, 1);
    assert_eq!(report.tuples[0].subject, "jane");
}

#[tokio::test]
async fn test_iteration_cap() {
    let search = Arc::new(ScriptedSearch::default().with_query("seed", &["http://p1"]));
    let fetcher = Arc::new(ScriptedFetcher::default().page("http://p1", "page one"));
    let extractor = Arc::new(ScriptedExtractor::default().on(
        "page one",
        vec![work_for("john", "acme", 0.9), work_for("jane", "beta", 0.8)],
    ));

    let params = RunParams::new("seed", RelationKind::WorkFor, 0.5, 10).unwrap();
    let report = controller(&search, &fetcher, &extractor)
        .with_config(ControllerConfig {
            max_iterations: Some(2),
            ..Default::default()
        })
        .run(&params)
        .await
        .unwrap();

    assert_eq!(report.outcome, RunOutcome::IterationCap);
    assert_eq!(report.iterations, 2);
}

#[tokio::test]
async fn test_all_eligible_policy() {
    let search = Arc::new(ScriptedSearch::default().with_query("seed", &["http://p1"]));
    let fetcher = Arc::new(ScriptedFetcher::default().page("http://p1", "page one"));
    let extractor = Arc::new(ScriptedExtractor::default().on(
        "page one",
        vec![work_for("john", "acme", 0.9), work_for("jane", "beta", 0.8)],
    ));

    let params = RunParams::new("seed", RelationKind::WorkFor, 0.5, 3).unwrap();
    let report = controller(&search, &fetcher, &extractor)
        .with_augmenter(Box::new(AllEligibleAugmenter))
        .run(&params)
        .await
        .unwrap();

    assert_eq!(
        search.queries(),
        vec!["seed", "seed acme john beta jane"]
    );
    assert_eq!(report.outcome, RunOutcome::StoppedEarly);
}
