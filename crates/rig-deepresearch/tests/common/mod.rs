//! Scripted collaborators for the research integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use rig_deepresearch::research::ResearchPrompts;
use rig_deepresearch::{
    GenerationError, LLMConfig, LLMProvider, LLMResponse, Message, RetrievalError, Role,
    SearchProvider, SearchResult,
};

/// Which of the three structured call shapes a completion request is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Queries,
    Relevance,
    Learning,
}

type Route = Box<dyn Fn(CallKind, &str) -> Result<String, GenerationError> + Send + Sync>;

/// Completion double that dispatches on the system prompt
pub struct RoutedLlm {
    route: Route,
    queries: AtomicUsize,
    relevance: AtomicUsize,
    learning: AtomicUsize,
    pub prompts: Mutex<Vec<(CallKind, String)>>,
}

impl RoutedLlm {
    pub fn new(
        route: impl Fn(CallKind, &str) -> Result<String, GenerationError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            route: Box::new(route),
            queries: AtomicUsize::new(0),
            relevance: AtomicUsize::new(0),
            learning: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self, kind: CallKind) -> usize {
        self.counter(kind).load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.calls(CallKind::Queries) + self.calls(CallKind::Relevance) + self.calls(CallKind::Learning)
    }

    fn counter(&self, kind: CallKind) -> &AtomicUsize {
        match kind {
            CallKind::Queries => &self.queries,
            CallKind::Relevance => &self.relevance,
            CallKind::Learning => &self.learning,
        }
    }
}

#[async_trait]
impl LLMProvider for RoutedLlm {
    async fn complete(
        &self,
        messages: &[Message],
        _config: Option<&LLMConfig>,
    ) -> Result<LLMResponse, GenerationError> {
        let system = messages
            .iter()
            .find(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        let user = messages.last().map(|m| m.content.as_str()).unwrap_or_default();

        let kind = if system == ResearchPrompts::QUERY_GENERATION_SYSTEM {
            CallKind::Queries
        } else if system == ResearchPrompts::RELEVANCE_SYSTEM {
            CallKind::Relevance
        } else if system == ResearchPrompts::LEARNING_SYSTEM {
            CallKind::Learning
        } else {
            return Err(GenerationError::Provider(format!("unexpected system prompt: {}", system)));
        };

        self.counter(kind).fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push((kind, user.to_string()));
        (self.route)(kind, user).map(|text| LLMResponse::new(Message::assistant(&text)))
    }

    fn name(&self) -> &str {
        "routed"
    }
}

pub fn queries_json(queries: &[&str]) -> String {
    serde_json::json!({ "queries": queries }).to_string()
}

pub fn learning_json(finding: &str, follow_ups: &[&str]) -> String {
    serde_json::json!({ "finding": finding, "followUpQuestions": follow_ups }).to_string()
}

pub fn page(url: &str) -> SearchResult {
    SearchResult::new(format!("Title of {}", url), url, format!("Content of {}", url))
}

/// Retrieval double with per-query scripted outcomes.
///
/// Queries without a script get one page whose url is derived from the query.
#[derive(Default)]
pub struct MockSearch {
    scripted: HashMap<String, Result<Vec<SearchResult>, RetrievalError>>,
    delay: Option<Duration>,
    searched: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MockSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_results(mut self, query: &str, results: Vec<SearchResult>) -> Self {
        self.scripted.insert(query.to_string(), Ok(results));
        self
    }

    pub fn with_failure(mut self, query: &str, error: RetrievalError) -> Self {
        self.scripted.insert(query.to_string(), Err(error));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn searched(&self) -> Vec<String> {
        self.searched.lock().unwrap().clone()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn url_for(query: &str) -> String {
        format!("https://example.com/{}", query.replace(' ', "-"))
    }
}

#[async_trait]
impl SearchProvider for MockSearch {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, RetrievalError> {
        self.searched.lock().unwrap().push(query.to_string());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let outcome = match self.scripted.get(query) {
            Some(outcome) => outcome.clone(),
            None => Ok(vec![page(&Self::url_for(query))]),
        };
        outcome.map(|results| results.into_iter().take(max_results).collect())
    }

    fn name(&self) -> &str {
        "mock"
    }
}
