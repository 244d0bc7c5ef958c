use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use super::prompts::ResearchPrompts;
use super::state::SearchResult;
use crate::error::GenerationError;
use crate::llm::StructuredGenerator;

/// Binary relevance judgment for one retrieved document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relevance {
    Relevant,
    Irrelevant,
}

impl Relevance {
    pub const LABELS: &'static [&'static str] = &["relevant", "irrelevant"];

    pub fn is_relevant(self) -> bool {
        self == Relevance::Relevant
    }
}

/// Judges whether a retrieved document helps answer the question.
///
/// A candidate whose url is already kept is `Irrelevant` without asking the
/// model, so callers never have to re-check the url afterwards.
#[derive(Debug, Clone)]
pub struct ResultEvaluator {
    generator: Arc<StructuredGenerator>,
}

impl ResultEvaluator {
    pub fn new(generator: Arc<StructuredGenerator>) -> Self {
        Self { generator }
    }

    pub async fn evaluate(
        &self,
        question: &str,
        candidate: &SearchResult,
        already_kept_urls: &HashSet<String>,
    ) -> Result<Relevance, GenerationError> {
        if already_kept_urls.contains(&candidate.url) {
            debug!(url = %candidate.url, "Already kept, skipping evaluation");
            return Ok(Relevance::Irrelevant);
        }

        let relevance: Relevance = self
            .generator
            .generate_enum(
                ResearchPrompts::RELEVANCE_SYSTEM,
                &ResearchPrompts::relevance(question, candidate, already_kept_urls),
                Relevance::LABELS,
            )
            .await?;

        debug!(url = %candidate.url, ?relevance, "Evaluated search result");
        Ok(relevance)
    }
}
