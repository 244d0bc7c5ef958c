//! Retrieval service
//!
//! `SearchProvider` is the web-search collaborator: one query in, at most
//! `max_results` documents out. Two HTTP implementations are provided:
//! - `TavilySearch` (Tavily Search API, raw page content)
//! - `ExaSearch` (Exa search with live-crawled page text)
//!
//! Both retry transient failures (timeouts, connection errors, 429, 5xx) with
//! exponential backoff according to a `RetryPolicy`. `RetryPolicy::none()`
//! gives a single attempt.

mod exa;
mod tavily;

pub use exa::ExaSearch;
pub use tavily::{SearchDepth, TavilySearch};

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::RetrievalError;
use crate::research::SearchResult;

/// Default timeout for search API requests
pub(crate) const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Retrieve up to `max_results` documents for `query`
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, RetrievalError>;

    /// Provider name for logging
    fn name(&self) -> &str;
}

/// Bounded exponential backoff for transient retrieval failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no retries
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Delay before retry number `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }

    /// Run `request` until it succeeds, fails permanently, or retries run out
    pub(crate) async fn run<T, F, Fut>(
        &self,
        provider: &str,
        mut request: F,
    ) -> Result<T, RetrievalError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RetrievalError>>,
    {
        let mut attempt = 0;
        loop {
            match request().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = self.delay_for(attempt);
                    warn!(provider, attempt, error = %e, "Search request failed, will retry");
                    debug!(provider, delay_ms = delay.as_millis() as u64, "Backing off");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
