use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::evaluator::ResultEvaluator;
use super::limiter::CallLimiter;
use super::state::{SearchResult, SharedResearchState};
use crate::error::{ResearchError, RetrievalError};
use crate::search::SearchProvider;

/// Runs one sub-query: retrieve, judge each candidate, keep the relevant ones.
pub struct SearchExecutor {
    search: Arc<dyn SearchProvider>,
    evaluator: ResultEvaluator,
    results_per_query: usize,
    call_timeout: Option<Duration>,
    limiter: CallLimiter,
}

impl SearchExecutor {
    pub fn new(search: Arc<dyn SearchProvider>, evaluator: ResultEvaluator) -> Self {
        Self {
            search,
            evaluator,
            results_per_query: 1,
            call_timeout: None,
            limiter: CallLimiter::unbounded(),
        }
    }

    /// Documents requested from the retrieval service per query
    pub fn with_results_per_query(mut self, k: usize) -> Self {
        self.results_per_query = k.max(1);
        self
    }

    /// Deadline for each retrieval call
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    pub(crate) fn with_limiter(mut self, limiter: CallLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    /// Search `query`, keep relevant unseen documents in `state`, and record
    /// `query` as explored whatever the outcome.
    ///
    /// Returns the documents newly kept by this call, in retrieval order.
    pub async fn run_query(
        &self,
        question: &str,
        query: &str,
        state: &SharedResearchState,
    ) -> Result<Vec<SearchResult>, ResearchError> {
        let outcome = self.search_and_filter(question, query, state).await;
        state.record_explored(&[query.to_string()]).await;
        outcome
    }

    /// `run_query` without the explored-query bookkeeping, for callers that
    /// record whole query batches themselves.
    pub(crate) async fn search_and_filter(
        &self,
        question: &str,
        query: &str,
        state: &SharedResearchState,
    ) -> Result<Vec<SearchResult>, ResearchError> {
        info!(query = %query, "Searching the web");
        let candidates = self.limiter.run(self.retrieve(query)).await?;
        debug!(query = %query, candidates = candidates.len(), "Retrieved candidates");

        let mut kept = Vec::new();
        for candidate in candidates {
            let kept_urls = state.kept_urls().await;
            let relevance = self
                .limiter
                .run(self.evaluator.evaluate(question, &candidate, &kept_urls))
                .await?;

            if !relevance.is_relevant() {
                continue;
            }

            let url = candidate.url.clone();
            // A concurrent sibling may have kept the same url since the snapshot
            if state.try_keep(candidate.clone()).await {
                info!(url = %url, "Kept search result");
                kept.push(candidate);
            } else {
                debug!(url = %url, "Lost dedup race, dropping result");
            }
        }

        Ok(kept)
    }

    async fn retrieve(&self, query: &str) -> Result<Vec<SearchResult>, RetrievalError> {
        let call = self.search.search(query, self.results_per_query);
        match self.call_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| RetrievalError::Timeout)?,
            None => call.await,
        }
    }
}

impl std::fmt::Debug for SearchExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchExecutor")
            .field("search", &self.search.name())
            .field("results_per_query", &self.results_per_query)
            .field("call_timeout", &self.call_timeout)
            .finish()
    }
}
