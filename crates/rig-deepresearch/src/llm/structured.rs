//! Structured generation on top of plain completions
//!
//! The research components need typed answers from the model: a JSON object
//! of a known shape, or one label out of a closed set. `StructuredGenerator`
//! asks for that shape and validates what comes back. A response that cannot
//! be parsed is a `GenerationError`; nothing is retried or defaulted here.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::message::Message;
use super::provider::{LLMConfig, LLMProvider};
use crate::error::GenerationError;

/// Longest slice of a bad response quoted back in an error
const ERROR_PREVIEW_CHARS: usize = 200;

pub struct StructuredGenerator {
    provider: Arc<dyn LLMProvider>,
    config: Option<LLMConfig>,
    call_timeout: Option<Duration>,
}

impl StructuredGenerator {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            provider,
            config: None,
            call_timeout: None,
        }
    }

    /// Per-request overrides passed to every completion
    pub fn with_config(mut self, config: LLMConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Deadline applied to every completion call
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Generate a JSON object and deserialize it into `T`.
    ///
    /// `schema` is shown to the model verbatim; `T`'s `Deserialize` impl is the
    /// authority on what is accepted.
    pub async fn generate_object<T: DeserializeOwned>(
        &self,
        system: &str,
        prompt: &str,
        schema: &Value,
    ) -> Result<T, GenerationError> {
        let instruction = format!(
            "{}\n\nRespond with a single JSON object that matches this JSON schema, and nothing else:\n{}",
            prompt, schema
        );
        let text = self.complete(system, &instruction).await?;

        let json = extract_json(&text).ok_or_else(|| {
            GenerationError::malformed(format!("no JSON object in response: {}", preview(&text)))
        })?;
        let value: Value = serde_json::from_str(json)
            .map_err(|e| GenerationError::malformed(format!("{} in: {}", e, preview(json))))?;

        serde_json::from_value(value).map_err(|e| GenerationError::schema(e.to_string()))
    }

    /// Classify into one of `labels` and deserialize the label into `T`
    /// (typically a `#[serde(rename_all = "lowercase")]` enum).
    pub async fn generate_enum<T: DeserializeOwned>(
        &self,
        system: &str,
        prompt: &str,
        labels: &[&str],
    ) -> Result<T, GenerationError> {
        let instruction = format!(
            "{}\n\nAnswer with exactly one of: {}. Output only that word.",
            prompt,
            labels.join(", ")
        );
        let text = self.complete(system, &instruction).await?;

        let label = parse_label(&text, labels).ok_or_else(|| {
            GenerationError::schema(format!(
                "expected one of [{}], got: {}",
                labels.join(", "),
                preview(&text)
            ))
        })?;

        serde_json::from_value(Value::String(label.to_string()))
            .map_err(|e| GenerationError::schema(e.to_string()))
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String, GenerationError> {
        let messages = [Message::system(system), Message::user(user)];
        let call = self.provider.complete(&messages, self.config.as_ref());

        let response = match self.call_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| GenerationError::Timeout(limit))??,
            None => call.await?,
        };

        if let Some(usage) = response.usage {
            debug!(
                provider = self.provider.name(),
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                "Completion finished"
            );
        }

        Ok(response.message.content)
    }
}

impl std::fmt::Debug for StructuredGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StructuredGenerator")
            .field("provider", &self.provider.name())
            .field("call_timeout", &self.call_timeout)
            .finish()
    }
}

/// Locate the JSON document in a model response.
///
/// Handles bare JSON, fenced ```json blocks, and JSON surrounded by prose.
pub fn extract_json(text: &str) -> Option<&str> {
    let trimmed = text.trim();

    let body = match trimmed.find("```") {
        Some(fence) => {
            let after = &trimmed[fence + 3..];
            let after = after.strip_prefix("json").unwrap_or(after);
            match after.find("```") {
                Some(end) => after[..end].trim(),
                None => after.trim(),
            }
        }
        None => trimmed,
    };

    let start = body.find(|c: char| c == '{' || c == '[')?;
    let close = if body[start..].starts_with('{') { '}' } else { ']' };
    let end = body.rfind(close)?;

    (end > start).then(|| &body[start..=end])
}

/// Pick the label the model answered with.
///
/// Accepts a bare label (any case, quoted or punctuated) or a JSON object in
/// which the string values name exactly one label. Prose is rejected, so a
/// negated verdict such as "not relevant" never reads as a label.
fn parse_label<'a>(text: &str, labels: &[&'a str]) -> Option<&'a str> {
    let normalize = |s: &str| {
        s.trim()
            .trim_matches(|c: char| c.is_whitespace() || "\"'`.*!".contains(c))
            .to_lowercase()
    };
    let lookup = |s: &str| {
        let s = normalize(s);
        labels.iter().copied().find(|l| *l == s)
    };

    if let Some(label) = lookup(text) {
        return Some(label);
    }

    let Some(Value::Object(map)) = extract_json(text).and_then(|j| serde_json::from_str::<Value>(j).ok())
    else {
        return None;
    };

    let mut found: Vec<&'a str> = map.values().filter_map(Value::as_str).filter_map(lookup).collect();
    found.sort_unstable();
    found.dedup();
    match found.as_slice() {
        [label] => Some(*label),
        _ => None,
    }
}

fn preview(text: &str) -> String {
    let mut out: String = text.chars().take(ERROR_PREVIEW_CHARS).collect();
    if text.chars().count() > ERROR_PREVIEW_CHARS {
        out.push_str("...");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedProvider;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Queries {
        queries: Vec<String>,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(rename_all = "lowercase")]
    enum Verdict {
        Relevant,
        Irrelevant,
    }

    const LABELS: &[&str] = &["relevant", "irrelevant"];

    #[test]
    fn test_extract_json_variants() {
        assert_eq!(extract_json(r#"{"a":1}"#), Some(r#"{"a":1}"#));
        assert_eq!(
            extract_json("```json\n{\"a\": [1, 2]}\n```"),
            Some("{\"a\": [1, 2]}")
        );
        assert_eq!(
            extract_json("Here you go: {\"a\": {\"b\": 2}} hope it helps"),
            Some("{\"a\": {\"b\": 2}}")
        );
        assert_eq!(extract_json("[\"x\", \"y\"]"), Some("[\"x\", \"y\"]"));
        assert_eq!(extract_json("no json here"), None);
    }

    #[test]
    fn test_parse_label() {
        assert_eq!(parse_label("relevant", LABELS), Some("relevant"));
        assert_eq!(parse_label("  \"Irrelevant\".\n", LABELS), Some("irrelevant"));
        assert_eq!(parse_label(r#"{"evaluation": "relevant"}"#, LABELS), Some("relevant"));
        assert_eq!(parse_label("relevant or irrelevant, hard to say", LABELS), None);
        assert_eq!(parse_label("maybe", LABELS), None);
    }

    #[test]
    fn test_parse_label_rejects_negated_prose() {
        assert_eq!(parse_label("This result is not relevant.", LABELS), None);
        assert_eq!(parse_label("Not relevant", LABELS), None);
        assert_eq!(parse_label("The page is irrelevant to the query", LABELS), None);
    }

    #[test]
    fn test_parse_label_searches_every_json_value() {
        assert_eq!(
            parse_label(r#"{"reason": "off topic", "verdict": "irrelevant"}"#, LABELS),
            Some("irrelevant")
        );
        assert_eq!(
            parse_label(r#"{"a": "relevant", "b": "Relevant."}"#, LABELS),
            Some("relevant")
        );
        assert_eq!(
            parse_label(r#"{"a": "relevant", "b": "irrelevant"}"#, LABELS),
            None
        );
        assert_eq!(parse_label(r#"{"reason": "not relevant"}"#, LABELS), None);
    }

    #[tokio::test]
    async fn test_generate_enum_negated_reply_is_schema_error() {
        let generator =
            StructuredGenerator::new(Arc::new(ScriptedProvider::replying("This result is not relevant.")));

        let result: Result<Verdict, _> = generator.generate_enum("system", "prompt", LABELS).await;

        assert!(matches!(result, Err(GenerationError::Schema { .. })));
    }

    #[tokio::test]
    async fn test_generate_object_parses_fenced_json() {
        let provider = Arc::new(ScriptedProvider::replying(
            "```json\n{\"queries\": [\"rust async\", \"tokio runtime\"]}\n```",
        ));
        let generator = StructuredGenerator::new(provider.clone());

        let parsed: Queries = generator
            .generate_object("system", "prompt", &serde_json::json!({"type": "object"}))
            .await
            .unwrap();

        assert_eq!(parsed.queries, vec!["rust async", "tokio runtime"]);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_generate_object_malformed() {
        let generator = StructuredGenerator::new(Arc::new(ScriptedProvider::replying("sorry, I can't")));

        let result: Result<Queries, _> = generator
            .generate_object("system", "prompt", &serde_json::json!({}))
            .await;

        assert!(matches!(result, Err(GenerationError::Malformed { .. })));
    }

    #[tokio::test]
    async fn test_generate_object_schema_violation() {
        let generator = StructuredGenerator::new(Arc::new(ScriptedProvider::replying(
            r#"{"queries": "not a list"}"#,
        )));

        let result: Result<Queries, _> = generator
            .generate_object("system", "prompt", &serde_json::json!({}))
            .await;

        assert!(matches!(result, Err(GenerationError::Schema { .. })));
    }

    #[tokio::test]
    async fn test_generate_enum() {
        let generator = StructuredGenerator::new(Arc::new(ScriptedProvider::replying("Relevant.")));
        let verdict: Verdict = generator.generate_enum("system", "prompt", LABELS).await.unwrap();
        assert_eq!(verdict, Verdict::Relevant);

        let generator = StructuredGenerator::new(Arc::new(ScriptedProvider::replying("unsure")));
        let result: Result<Verdict, _> = generator.generate_enum("system", "prompt", LABELS).await;
        assert!(matches!(result, Err(GenerationError::Schema { .. })));
    }

    #[tokio::test]
    async fn test_provider_error_propagates() {
        let generator = StructuredGenerator::new(Arc::new(ScriptedProvider::new(|_, _| {
            Err(GenerationError::Provider("503 from upstream".to_string()))
        })));

        let result: Result<Verdict, _> = generator.generate_enum("system", "prompt", LABELS).await;
        assert_eq!(
            result,
            Err(GenerationError::Provider("503 from upstream".to_string()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_timeout() {
        struct SlowProvider;

        #[async_trait::async_trait]
        impl LLMProvider for SlowProvider {
            async fn complete(
                &self,
                _messages: &[Message],
                _config: Option<&LLMConfig>,
            ) -> Result<crate::llm::LLMResponse, GenerationError> {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(crate::llm::LLMResponse::new(Message::assistant("relevant")))
            }

            fn name(&self) -> &str {
                "slow"
            }
        }

        let generator = StructuredGenerator::new(Arc::new(SlowProvider))
            .with_call_timeout(Duration::from_secs(5));

        let result: Result<Verdict, _> = generator.generate_enum("system", "prompt", LABELS).await;
        assert_eq!(result, Err(GenerationError::Timeout(Duration::from_secs(5))));
    }
}
