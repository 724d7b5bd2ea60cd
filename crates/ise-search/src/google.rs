//! Google Custom Search JSON API client
//!
//! Author: hephaex@gmail.com

use std::time::Duration;

use async_trait::async_trait;
use ise_core::{IseError, Result, SearchConfig, SearchHit, SearchProvider};
use reqwest::Client;
use serde::Deserialize;
use url::Url;

/// Google Custom Search client
pub struct GoogleSearchClient {
    client: Client,
    api_key: String,
    engine_id: String,
    base_url: String,
    num: u8,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    /// Absent when the query has no results
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItem {
    link: String,
    title: Option<String>,
    snippet: Option<String>,
    display_link: Option<String>,
}

impl GoogleSearchClient {
    /// Create a new client against the public endpoint
    pub fn new(api_key: impl Into<String>, engine_id: impl Into<String>) -> Result<Self> {
        Self::from_config(&SearchConfig {
            api_key: Some(api_key.into()),
            engine_id: Some(engine_id.into()),
            ..SearchConfig::default()
        })
    }

    /// Create from config
    pub fn from_config(config: &SearchConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| IseError::ConfigError("Google API key required".to_string()))?;
        let engine_id = config
            .engine_id
            .clone()
            .ok_or_else(|| IseError::ConfigError("Google engine ID required".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| IseError::ConfigError(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            engine_id,
            base_url: config.base_url.clone(),
            num: config.results_per_query.clamp(1, 10),
        })
    }

    /// Set custom endpoint (tests, proxies)
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn request_url(&self, query: &str) -> Result<Url> {
        let num = self.num.to_string();
        Url::parse_with_params(
            &self.base_url,
            &[
                ("key", self.api_key.as_str()),
                ("cx", self.engine_id.as_str()),
                ("q", query),
                ("num", num.as_str()),
            ],
        )
        .map_err(|e| IseError::ConfigError(format!("Invalid search endpoint: {e}")))
    }
}

#[async_trait]
impl SearchProvider for GoogleSearchClient {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let url = self.request_url(query)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| IseError::SearchUnavailable(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(IseError::SearchUnavailable(format!(
                "Google API error {status}: {error_text}"
            )));
        }

        let result: SearchResponse = response
            .json()
            .await
            .map_err(|e| IseError::SearchUnavailable(format!("Failed to parse response: {e}")))?;

        tracing::debug!("Google returned {} items", result.items.len());

        Ok(result
            .items
            .into_iter()
            .map(|item| SearchHit {
                url: item.link,
                title: item.title,
                snippet: item.snippet,
                display_link: item.display_link,
            })
            .collect())
    }

    fn name(&self) -> &str {
        "google"
    }
}
