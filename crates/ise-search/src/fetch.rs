//! Page fetching and plain-text extraction
//!
//! Downloads a result page with reqwest and flattens its HTML to plain text
//! with scraper. Text nodes that live directly inside non-content elements
//! (scripts, styles, head metadata, page headers) are dropped, and the result
//! is NFKD-decomposed before it reaches the extractor.

use std::time::Duration;

use async_trait::async_trait;
use ise_core::{FetchConfig, IseError, Result, TextFetcher};
use reqwest::Client;
use scraper::{Html, Node};
use tracing::debug;
use unicode_normalization::UnicodeNormalization;

/// Parent elements whose direct text is never page content
const SKIPPED_PARENTS: [&str; 9] = [
    "noscript", "header", "html", "meta", "head", "input", "script", "style", "title",
];

/// HTTP page fetcher
pub struct HttpTextFetcher {
    client: Client,
}

impl HttpTextFetcher {
    /// Create a fetcher with default settings
    pub fn new() -> Result<Self> {
        Self::from_config(&FetchConfig::default())
    }

    /// Create from config
    pub fn from_config(config: &FetchConfig) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            reqwest::header::HeaderValue::from_static("en-US,en;q=0.5"),
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| IseError::ConfigError(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// Fetch raw HTML from a URL
    async fn fetch_html(&self, url: &str, timeout: Duration) -> Result<String> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| request_error(url, timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(IseError::FetchError {
                url: url.to_string(),
                reason: format!("HTTP {status}"),
            });
        }

        response
            .text()
            .await
            .map_err(|e| request_error(url, timeout, e))
    }
}

fn request_error(url: &str, timeout: Duration, err: reqwest::Error) -> IseError {
    if err.is_timeout() {
        IseError::FetchTimeout {
            url: url.to_string(),
            timeout,
        }
    } else {
        IseError::FetchError {
            url: url.to_string(),
            reason: err.to_string(),
        }
    }
}

#[async_trait]
impl TextFetcher for HttpTextFetcher {
    async fn fetch_text(&self, url: &str, timeout: Duration) -> Result<String> {
        let html = self.fetch_html(url, timeout).await?;
        let text = html_to_text(&html);
        debug!(url, chars = text.chars().count(), "Extracted plain text");
        Ok(text)
    }
}

/// Flatten an HTML document to NFKD, whitespace-normalised plain text
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut parts: Vec<&str> = Vec::new();

    for node in document.tree.root().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let keep = match node.parent().map(|p| p.value()) {
            Some(Node::Element(element)) => !SKIPPED_PARENTS.contains(&element.name()),
            _ => false,
        };
        if keep {
            parts.push(&**text);
        }
    }

    let decomposed: String = parts.join(" ").nfkd().collect();
    decomposed.split_whitespace().collect::<Vec<_>>().join(" ")
}
