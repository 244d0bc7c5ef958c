//! Exa Search - neural web search with live-crawled page text

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{RetryPolicy, SearchProvider, DEFAULT_TIMEOUT_SECS};
use crate::error::RetrievalError;
use crate::research::SearchResult;

const EXA_API_URL: &str = "https://api.exa.ai";

const MAX_RESULTS_PER_REQUEST: usize = 100;

pub struct ExaSearch {
    api_key: String,
    client: Client,
    base_url: String,
    timeout: Duration,
    retry: RetryPolicy,
}

impl ExaSearch {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            client: Client::new(),
            base_url: EXA_API_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retry: RetryPolicy::default(),
        }
    }

    /// Create from environment variable EXA_API_KEY
    pub fn from_env() -> Result<Self, RetrievalError> {
        let api_key =
            std::env::var("EXA_API_KEY").map_err(|_| RetrievalError::MissingApiKey("EXA_API_KEY"))?;
        Ok(Self::new(api_key))
    }

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

    async fn execute_single_request(
        &self,
        request: &ExaRequest<'_>,
    ) -> Result<ExaResponse, RetrievalError> {
        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .header("x-api-key", &self.api_key)
            .timeout(self.timeout)
            .json(request)
            .send()
            .await
            .map_err(RetrievalError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(RetrievalError::from_status(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| RetrievalError::ParseError(e.to_string()))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExaRequest<'a> {
    query: &'a str,
    num_results: usize,
    contents: ExaContents,
}

#[derive(Debug, Serialize)]
struct ExaContents {
    text: bool,
    livecrawl: &'static str,
}

#[derive(Debug, Deserialize)]
struct ExaResponse {
    results: Vec<ExaResult>,
}

#[derive(Debug, Deserialize)]
struct ExaResult {
    #[serde(default)]
    title: Option<String>,
    url: String,
    #[serde(default)]
    text: Option<String>,
}

impl From<ExaResult> for SearchResult {
    fn from(result: ExaResult) -> Self {
        // Exa returns null titles for some pages
        let title = result
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| result.url.clone());
        SearchResult::new(title, result.url, result.text.unwrap_or_default())
    }
}

#[async_trait]
impl SearchProvider for ExaSearch {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, RetrievalError> {
        let max_results = max_results.clamp(1, MAX_RESULTS_PER_REQUEST);
        let request = ExaRequest {
            query,
            num_results: max_results,
            contents: ExaContents {
                text: true,
                livecrawl: "always",
            },
        };

        debug!(query = %query, max_results, "Exa search");
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
        "exa"
    }
}
