//! ResearchOrchestrator - the recursive research driver
//!
//! One call of `research(question, depth, breadth)`:
//! 1. sets the root question if no outer call has
//! 2. stops if `depth == 0`
//! 3. generates `breadth` sub-queries and records the batch as explored
//! 4. per sub-query, keeps relevant unseen documents
//! 5. per kept document, extracts a learning and recurses on its follow-ups
//!    with `depth - 1` and `next_breadth(breadth)`
//!
//! Siblings in steps 4 and 5 run one after another (`Concurrency::Sequential`)
//! or together (`Concurrency::Concurrent`). Errors abort the whole call under
//! `FailurePolicy::FailFast`; under `FailurePolicy::SkipBranch` a failed
//! sub-query is recorded in the state and its siblings go on.

use futures::future::{try_join_all, BoxFuture, FutureExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::config::{Concurrency, FailurePolicy, ResearchConfig};
use super::evaluator::ResultEvaluator;
use super::executor::SearchExecutor;
use super::extractor::LearningExtractor;
use super::limiter::CallLimiter;
use super::prompts::ResearchPrompts;
use super::query_generator::QueryGenerator;
use super::state::{ResearchState, SearchResult, SharedResearchState};
use crate::error::ResearchError;
use crate::llm::{LLMProvider, StructuredGenerator};
use crate::search::SearchProvider;

/// Breadth for the next recursion level: half, rounded up, never below 1
pub fn next_breadth(breadth: usize) -> usize {
    breadth.div_ceil(2).max(1)
}

#[derive(Debug)]
pub struct ResearchOrchestrator {
    queries: QueryGenerator,
    executor: SearchExecutor,
    extractor: LearningExtractor,
    limiter: CallLimiter,
    config: ResearchConfig,
}

impl ResearchOrchestrator {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        search: Arc<dyn SearchProvider>,
        config: ResearchConfig,
    ) -> Result<Self, ResearchError> {
        Self::with_generator(StructuredGenerator::new(provider), search, config)
    }

    /// Build from a preconfigured generator (e.g. with `LLMConfig` overrides).
    /// The config's call timeout replaces the generator's.
    pub fn with_generator(
        generator: StructuredGenerator,
        search: Arc<dyn SearchProvider>,
        config: ResearchConfig,
    ) -> Result<Self, ResearchError> {
        config.validate()?;

        let generator = match config.call_timeout {
            Some(limit) => generator.with_call_timeout(limit),
            None => generator,
        };
        let generator = Arc::new(generator);

        let limiter = match config.concurrency {
            Concurrency::Sequential => CallLimiter::unbounded(),
            Concurrency::Concurrent => CallLimiter::new(config.max_in_flight),
        };

        let mut executor = SearchExecutor::new(search, ResultEvaluator::new(generator.clone()))
            .with_results_per_query(config.results_per_query)
            .with_limiter(limiter.clone());
        if let Some(limit) = config.call_timeout {
            executor = executor.with_call_timeout(limit);
        }

        Ok(Self {
            queries: QueryGenerator::new(generator.clone()),
            executor,
            extractor: LearningExtractor::new(generator),
            limiter,
            config,
        })
    }

    pub fn config(&self) -> &ResearchConfig {
        &self.config
    }

    /// Research `question` with the configured depth and breadth and return
    /// everything gathered.
    pub async fn run(&self, question: &str) -> Result<ResearchState, ResearchError> {
        let state = SharedResearchState::new();
        info!(
            depth = self.config.depth,
            breadth = self.config.breadth,
            concurrency = ?self.config.concurrency,
            "Starting research"
        );

        self.research(question.to_string(), self.config.depth, self.config.breadth, &state)
            .await?;

        let state = state.snapshot().await;
        info!(
            explored = state.explored_queries().len(),
            kept = state.kept_results().len(),
            learnings = state.learnings().len(),
            "Research finished"
        );
        Ok(state)
    }

    /// Expand `question` into a research tree of at most `depth` levels,
    /// writing everything into `state`.
    pub fn research<'a>(
        &'a self,
        question: String,
        depth: usize,
        breadth: usize,
        state: &'a SharedResearchState,
    ) -> BoxFuture<'a, Result<(), ResearchError>> {
        async move {
            state.set_root_if_unset(&question).await;
            if depth == 0 {
                debug!("Depth exhausted");
                return Ok(());
            }

            let breadth = breadth.max(1);
            let queries = self
                .limiter
                .run(self.queries.generate_queries(&question, breadth))
                .await?;
            info!(depth, breadth, queries = ?queries, "Generated sub-queries");
            state.record_explored(&queries).await;

            match self.config.concurrency {
                Concurrency::Sequential => {
                    for query in &queries {
                        let outcome = self.explore_query(&question, query, depth, breadth, state).await;
                        self.contain(query, outcome, state).await?;
                    }
                }
                Concurrency::Concurrent => {
                    try_join_all(queries.iter().map(|query| {
                        let question = &question;
                        async move {
                            let outcome = self.explore_query(question, query, depth, breadth, state).await;
                            self.contain(query, outcome, state).await
                        }
                    }))
                    .await?;
                }
            }

            Ok(())
        }
        .boxed()
    }

    async fn explore_query(
        &self,
        question: &str,
        query: &str,
        depth: usize,
        breadth: usize,
        state: &SharedResearchState,
    ) -> Result<(), ResearchError> {
        let kept = self.executor.search_and_filter(question, query, state).await?;

        match self.config.concurrency {
            Concurrency::Sequential => {
                for result in kept {
                    self.learn_and_recurse(query, result, depth, breadth, state).await?;
                }
            }
            Concurrency::Concurrent => {
                try_join_all(
                    kept.into_iter()
                        .map(|result| self.learn_and_recurse(query, result, depth, breadth, state)),
                )
                .await?;
            }
        }

        Ok(())
    }

    async fn learn_and_recurse(
        &self,
        query: &str,
        result: SearchResult,
        depth: usize,
        breadth: usize,
        state: &SharedResearchState,
    ) -> Result<(), ResearchError> {
        let learning = self.limiter.run(self.extractor.extract(query, &result)).await?;
        let follow_ups = learning.follow_up_questions.clone();
        let (root_question, completed) = state.push_learning(query, learning).await;

        let next_question = ResearchPrompts::follow_up(&root_question, &completed, &follow_ups);
        debug!(url = %result.url, depth = depth - 1, "Following up");
        self.research(next_question, depth - 1, next_breadth(breadth), state)
            .await
    }

    /// Apply the failure policy at the sub-query boundary
    async fn contain(
        &self,
        query: &str,
        outcome: Result<(), ResearchError>,
        state: &SharedResearchState,
    ) -> Result<(), ResearchError> {
        match (outcome, self.config.failure_policy) {
            (Ok(()), _) => Ok(()),
            (Err(e), FailurePolicy::SkipBranch) => {
                warn!(query = %query, error = %e, "Skipping failed branch");
                state.record_failure(format!("{}: {}", query, e)).await;
                Ok(())
            }
            (Err(e), FailurePolicy::FailFast) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{GenerationError, RetrievalError};
    use crate::llm::testing::ScriptedProvider;
    use crate::research::testing::StaticSearch;
    use static_assertions::assert_impl_all;

    assert_impl_all!(ResearchOrchestrator: Send, Sync);
    assert_impl_all!(SharedResearchState: Send, Sync, Clone);

    /// Routes on the system prompt: two queries, always relevant, no follow-ups
    fn script(system: &str, _user: &str) -> Result<String, GenerationError> {
        if system == ResearchPrompts::QUERY_GENERATION_SYSTEM {
            Ok(r#"{"queries": ["a", "b"]}"#.to_string())
        } else if system == ResearchPrompts::RELEVANCE_SYSTEM {
            Ok("relevant".to_string())
        } else {
            Ok(r#"{"finding": "f", "followUpQuestions": ["why?"]}"#.to_string())
        }
    }

    fn orchestrator(
        provider: Arc<ScriptedProvider>,
        search: Arc<StaticSearch>,
        config: ResearchConfig,
    ) -> ResearchOrchestrator {
        ResearchOrchestrator::new(provider, search, config).unwrap()
    }

    #[test]
    fn test_next_breadth() {
        assert_eq!(next_breadth(1), 1);
        assert_eq!(next_breadth(2), 1);
        assert_eq!(next_breadth(3), 2);
        assert_eq!(next_breadth(4), 2);
        assert_eq!(next_breadth(5), 3);
        assert_eq!(next_breadth(0), 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = ResearchOrchestrator::new(
            Arc::new(ScriptedProvider::new(script)),
            Arc::new(StaticSearch::new(vec![])),
            ResearchConfig::new(1, 0),
        );
        assert!(matches!(result, Err(ResearchError::Config(_))));
    }

    #[tokio::test]
    async fn test_depth_zero_makes_no_calls() {
        let provider = Arc::new(ScriptedProvider::new(script));
        let search = Arc::new(StaticSearch::new(vec![]));
        let orchestrator = orchestrator(provider.clone(), search.clone(), ResearchConfig::new(0, 3));

        let state = orchestrator.run("X").await.unwrap();

        assert_eq!(state.root_question(), Some("X"));
        assert!(state.explored_queries().is_empty());
        assert_eq!(provider.calls(), 0);
        assert!(search.requested().is_empty());
    }

    #[tokio::test]
    async fn test_single_level() {
        let provider = Arc::new(ScriptedProvider::new(script));
        let search = Arc::new(StaticSearch::new(vec![SearchResult::new(
            "t",
            "https://only.example",
            "c",
        )]));
        let orchestrator = orchestrator(provider.clone(), search, ResearchConfig::new(1, 2));

        let state = orchestrator.run("X").await.unwrap();

        assert_eq!(state.explored_queries(), ["a", "b"]);
        // Both queries return the same url; only the first keeps and learns it
        assert_eq!(state.kept_results().len(), 1);
        assert_eq!(state.completed_queries(), ["a"]);
        assert_eq!(state.learnings().len(), 1);
        // generate + evaluate + extract; the second query's candidate is rejected locally
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn test_follow_up_prompt_reaches_next_level() {
        let provider = Arc::new(ScriptedProvider::new(script));
        let search = Arc::new(StaticSearch::new(vec![SearchResult::new(
            "t",
            "https://only.example",
            "c",
        )]));
        let orchestrator = orchestrator(provider.clone(), search, ResearchConfig::new(2, 2));

        orchestrator.run("Root goal").await.unwrap();

        let prompts = provider.prompts.lock().unwrap();
        let nested = prompts
            .iter()
            .find(|p| p.contains("Overall research goal: Root goal"))
            .expect("nested query generation prompt");
        assert!(nested.contains("Previous research queries:\na"));
        assert!(nested.contains("Follow-up research directions:\nwhy?"));
        assert!(nested.contains("Generate 1 search queries"));
    }

    #[tokio::test]
    async fn test_skip_branch_records_error() {
        let provider = Arc::new(ScriptedProvider::new(script));
        let search = Arc::new(StaticSearch::failing(RetrievalError::Unauthorized));
        let config = ResearchConfig::new(1, 2).with_failure_policy(FailurePolicy::SkipBranch);

        let state = orchestrator(provider, search, config).run("X").await.unwrap();

        assert_eq!(state.errors().len(), 2);
        assert!(state.errors()[0].starts_with("a: "));
        assert!(state.learnings().is_empty());
    }

    #[tokio::test]
    async fn test_fail_fast_propagates() {
        let provider = Arc::new(ScriptedProvider::new(script));
        let search = Arc::new(StaticSearch::failing(RetrievalError::Unauthorized));

        let result = orchestrator(provider, search, ResearchConfig::new(1, 2)).run("X").await;

        assert!(matches!(
            result,
            Err(ResearchError::Retrieval(RetrievalError::Unauthorized))
        ));
    }
}
