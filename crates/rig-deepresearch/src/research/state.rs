//! Research state definition
//!
//! `ResearchState` is the accumulator for one top-level research call. It is
//! shared by every branch of the recursion through `SharedResearchState`, whose
//! methods are each a single critical section:
//! - `try_keep`: url membership check and insert
//! - `push_learning`: learning and its query appended as one pair
//! - `record_explored`: a generated query batch appended in generation order

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;

/// A retrieved web document. `url` is its identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub content: String,
}

impl SearchResult {
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            content: content.into(),
        }
    }
}

/// A finding extracted from one kept document, with the questions it raises
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Learning {
    pub finding: String,
    #[serde(alias = "follow_up_questions")]
    pub follow_up_questions: Vec<String>,
}

impl Learning {
    pub fn new(finding: impl Into<String>, follow_up_questions: Vec<String>) -> Self {
        Self {
            finding: finding.into(),
            follow_up_questions,
        }
    }
}

/// Everything one research run has produced so far
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchState {
    root_question: Option<String>,
    /// Every generated sub-query, all levels, in generation order
    explored_queries: Vec<String>,
    kept_results: Vec<SearchResult>,
    #[serde(skip)]
    kept_urls: HashSet<String>,
    learnings: Vec<Learning>,
    /// `completed_queries[i]` is the query `learnings[i]` was extracted for
    completed_queries: Vec<String>,
    /// Branch failures contained by `FailurePolicy::SkipBranch`
    errors: Vec<String>,
}

impl ResearchState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root_question(&self) -> Option<&str> {
        self.root_question.as_deref()
    }

    pub fn explored_queries(&self) -> &[String] {
        &self.explored_queries
    }

    /// Kept documents in the order they were accepted
    pub fn kept_results(&self) -> &[SearchResult] {
        &self.kept_results
    }

    pub fn learnings(&self) -> &[Learning] {
        &self.learnings
    }

    pub fn completed_queries(&self) -> &[String] {
        &self.completed_queries
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn contains_url(&self, url: &str) -> bool {
        self.kept_urls.contains(url)
    }

    /// Set the root question unless an outer call already did.
    /// Returns whether it was set.
    pub fn set_root_if_unset(&mut self, question: &str) -> bool {
        if self.root_question.is_some() {
            return false;
        }
        self.root_question = Some(question.to_string());
        true
    }

    pub fn record_explored<I, S>(&mut self, queries: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.explored_queries
            .extend(queries.into_iter().map(Into::into));
    }

    /// Keep `result` unless a document with the same url is already kept
    pub fn try_keep(&mut self, result: SearchResult) -> bool {
        if !self.kept_urls.insert(result.url.clone()) {
            return false;
        }
        self.kept_results.push(result);
        true
    }

    pub fn push_learning(&mut self, query: impl Into<String>, learning: Learning) {
        self.learnings.push(learning);
        self.completed_queries.push(query.into());
    }

    pub fn record_failure(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// Render the state as a Markdown report for downstream summarization
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();

        out.push_str(&format!(
            "# Research: {}\n\n",
            self.root_question.as_deref().unwrap_or("(no question)")
        ));

        out.push_str("## Explored queries\n\n");
        for (i, query) in self.explored_queries.iter().enumerate() {
            out.push_str(&format!("{}. {}\n", i + 1, query));
        }

        out.push_str("\n## Sources\n\n");
        for result in &self.kept_results {
            out.push_str(&format!("- [{}]({})\n", result.title, result.url));
        }

        out.push_str("\n## Findings\n");
        for (i, (learning, query)) in self
            .learnings
            .iter()
            .zip(&self.completed_queries)
            .enumerate()
        {
            out.push_str(&format!("\n### {}. {}\n\n{}\n", i + 1, query, learning.finding));
            if !learning.follow_up_questions.is_empty() {
                out.push_str("\nFollow-up questions:\n");
                for question in &learning.follow_up_questions {
                    out.push_str(&format!("- {}\n", question));
                }
            }
        }

        if !self.errors.is_empty() {
            out.push_str("\n## Skipped branches\n\n");
            for error in &self.errors {
                out.push_str(&format!("- {}\n", error));
            }
        }

        out
    }
}

/// Handle to the `ResearchState` shared by every branch of one research run.
///
/// Cloning the handle shares the state; no lock is held across a remote call.
#[derive(Debug, Clone, Default)]
pub struct SharedResearchState {
    inner: Arc<Mutex<ResearchState>>,
}

impl SharedResearchState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue from an existing state (e.g. documents kept by an earlier run)
    pub fn with_state(state: ResearchState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(state)),
        }
    }

    pub async fn set_root_if_unset(&self, question: &str) -> bool {
        self.inner.lock().await.set_root_if_unset(question)
    }

    pub async fn record_explored(&self, queries: &[String]) {
        self.inner.lock().await.record_explored(queries.iter().cloned());
    }

    /// Snapshot of the kept urls, for the relevance judgment
    pub async fn kept_urls(&self) -> HashSet<String> {
        self.inner.lock().await.kept_urls.clone()
    }

    pub async fn try_keep(&self, result: SearchResult) -> bool {
        self.inner.lock().await.try_keep(result)
    }

    /// Append the learning/query pair and return the root question together
    /// with every query completed so far, as seen right after the append.
    pub async fn push_learning(&self, query: &str, learning: Learning) -> (String, Vec<String>) {
        let mut state = self.inner.lock().await;
        state.push_learning(query, learning);
        (
            state.root_question.clone().unwrap_or_default(),
            state.completed_queries.clone(),
        )
    }

    pub async fn record_failure(&self, message: impl Into<String>) {
        self.inner.lock().await.record_failure(message);
    }

    pub async fn snapshot(&self) -> ResearchState {
        self.inner.lock().await.clone()
    }
}
