use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

use super::prompts::ResearchPrompts;
use super::state::{Learning, SearchResult};
use crate::error::GenerationError;
use crate::llm::StructuredGenerator;

/// Extracts one `Learning` from one kept document
#[derive(Debug, Clone)]
pub struct LearningExtractor {
    generator: Arc<StructuredGenerator>,
}

impl LearningExtractor {
    pub fn new(generator: Arc<StructuredGenerator>) -> Self {
        Self { generator }
    }

    pub async fn extract(
        &self,
        question: &str,
        result: &SearchResult,
    ) -> Result<Learning, GenerationError> {
        let learning: Learning = self
            .generator
            .generate_object(
                ResearchPrompts::LEARNING_SYSTEM,
                &ResearchPrompts::learning(question, result),
                &Self::schema(),
            )
            .await?;

        let finding = learning.finding.trim();
        if finding.is_empty() {
            return Err(GenerationError::schema("finding is empty"));
        }

        let follow_up_questions: Vec<String> = learning
            .follow_up_questions
            .iter()
            .map(|q| q.trim())
            .filter(|q| !q.is_empty())
            .map(str::to_string)
            .collect();

        debug!(
            url = %result.url,
            follow_ups = follow_up_questions.len(),
            "Extracted learning"
        );
        Ok(Learning::new(finding, follow_up_questions))
    }

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "finding": { "type": "string" },
                "followUpQuestions": {
                    "type": "array",
                    "items": { "type": "string" }
                }
            },
            "required": ["finding", "followUpQuestions"]
        })
    }
}
