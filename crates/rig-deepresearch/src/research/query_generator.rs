use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

use super::prompts::ResearchPrompts;
use crate::error::GenerationError;
use crate::llm::StructuredGenerator;

/// Turns a question into at most `n` search queries
#[derive(Debug, Clone)]
pub struct QueryGenerator {
    generator: Arc<StructuredGenerator>,
}

#[derive(Debug, Deserialize)]
struct QueryList {
    queries: Vec<String>,
}

impl QueryGenerator {
    /// Largest batch a single call may request
    pub const MAX_QUERIES: usize = 5;

    pub fn new(generator: Arc<StructuredGenerator>) -> Self {
        Self { generator }
    }

    /// Returns between 1 and `n` non-blank queries in generation order.
    /// `n` is clamped into `1..=MAX_QUERIES`.
    pub async fn generate_queries(
        &self,
        question: &str,
        n: usize,
    ) -> Result<Vec<String>, GenerationError> {
        let n = n.clamp(1, Self::MAX_QUERIES);

        let list: QueryList = self
            .generator
            .generate_object(
                ResearchPrompts::QUERY_GENERATION_SYSTEM,
                &ResearchPrompts::query_generation(question, n),
                &Self::schema(n),
            )
            .await?;

        let queries: Vec<String> = list
            .queries
            .into_iter()
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .take(n)
            .collect();

        if queries.is_empty() {
            return Err(GenerationError::schema("query list is empty"));
        }

        debug!(requested = n, generated = queries.len(), "Generated search queries");
        Ok(queries)
    }

    fn schema(n: usize) -> Value {
        json!({
            "type": "object",
            "properties": {
                "queries": {
                    "type": "array",
                    "items": { "type": "string" },
                    "minItems": 1,
                    "maxItems": n
                }
            },
            "required": ["queries"]
        })
    }
}
