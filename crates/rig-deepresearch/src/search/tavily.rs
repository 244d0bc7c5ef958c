//! Tavily Search - web retrieval for the research loop
//!
//! Requests raw page content so that `SearchResult::content` carries the page
//! text rather than a short snippet; falls back to the snippet when Tavily has
//! no raw content for a page.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{RetryPolicy, SearchProvider, DEFAULT_TIMEOUT_SECS};
use crate::error::RetrievalError;
use crate::research::SearchResult;

const TAVILY_API_URL: &str = "https://api.tavily.com";

/// Tavily accepts at most this many results per request
const MAX_RESULTS_PER_REQUEST: usize = 20;

/// Search depth for Tavily API
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SearchDepth {
    /// Fast search with basic results
    #[default]
    Basic,
    /// More thorough search with detailed results
    Advanced,
}

pub struct TavilySearch {
    api_key: String,
    client: Client,
    base_url: String,
    timeout: Duration,
    retry: RetryPolicy,
    search_depth: SearchDepth,
}

impl TavilySearch {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            client: Client::new(),
            base_url: TAVILY_API_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retry: RetryPolicy::default(),
            search_depth: SearchDepth::default(),
        }
    }

    /// Create from environment variable TAVILY_API_KEY
    pub fn from_env() -> Result<Self, RetrievalError> {
        let api_key = std::env::var("TAVILY_API_KEY")
            .map_err(|_| RetrievalError::MissingApiKey("TAVILY_API_KEY"))?;
        Ok(Self::new(api_key))
    }

    /// Point at a different endpoint (proxies, mock servers)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_search_depth(mut self, depth: SearchDepth) -> Self {
        self.search_depth = depth;
        self
    }

    async fn execute_single_request(
        &self,
        request: &TavilyRequest<'_>,
    ) -> Result<TavilyResponse, RetrievalError> {
        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .timeout(self.timeout)
            .json(request)
            .send()
            .await
            .map_err(RetrievalError::from_reqwest)?;

        let status = response.status();
        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| RetrievalError::ParseError(e.to_string()));
        }

        let error_text = response.text().await.unwrap_or_default();
        Err(RetrievalError::from_status(status.as_u16(), error_text))
    }
}

/// Request body for Tavily API
#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    query: &'a str,
    max_results: usize,
    search_depth: SearchDepth,
    include_answer: bool,
    include_raw_content: bool,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    title: String,
    url: String,
    content: String,
    #[serde(default)]
    raw_content: Option<String>,
}

impl From<TavilyResult> for SearchResult {
    fn from(result: TavilyResult) -> Self {
        let content = match result.raw_content {
            Some(raw) if !raw.trim().is_empty() => raw,
            _ => result.content,
        };
        SearchResult::new(result.title, result.url, content)
    }
}

#[async_trait]
impl SearchProvider for TavilySearch {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, RetrievalError> {
        let max_results = max_results.clamp(1, MAX_RESULTS_PER_REQUEST);
        let request = TavilyRequest {
            query,
            max_results,
            search_depth: self.search_depth,
            include_answer: false,
            include_raw_content: true,
        };

        debug!(query = %query, max_results, "Tavily search");
        let response = self
            .retry
            .run(self.name(), || self.execute_single_request(&request))
            .await?;

        Ok(response
            .results
            .into_iter()
            .take(max_results)
            .map(SearchResult::from)
            .collect())
    }

    fn name(&self) -> &str {
        "tavily"
    }
}
