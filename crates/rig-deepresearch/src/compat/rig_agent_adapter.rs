//! Adapter for using Rig Agents as the completion service
//!
//! `RigAgentAdapter` wraps any Rig `Agent<M>` so the research components can
//! talk to the 20+ providers Rig supports through the `LLMProvider` trait.
//!
//! ```rust,ignore
//! use rig::providers::anthropic;
//! use rig::client::{CompletionClient, ProviderClient};
//!
//! let agent = anthropic::Client::from_env()
//!     .agent("claude-3-5-haiku-latest")
//!     .max_tokens(4096)
//!     .build();
//! let provider = RigAgentAdapter::with_names(agent, "anthropic", "claude-3-5-haiku-latest");
//! ```
//!
//! Research calls never use tools, so only text content is read back from the
//! model; tool calls and reasoning blocks are ignored.

use async_trait::async_trait;
use std::sync::Arc;

use rig::agent::Agent;
use rig::completion::{Completion, CompletionModel, Message as RigMessage};
use rig::message::AssistantContent;
use rig::OneOrMany;

use crate::error::GenerationError;
use crate::llm::{LLMConfig, LLMProvider, LLMResponse, Message, Role, TokenUsage};

/// Adapter that wraps a Rig `Agent<M>` to implement `LLMProvider`.
pub struct RigAgentAdapter<M>
where
    M: CompletionModel + Send + Sync,
{
    agent: Arc<Agent<M>>,
    provider_name: String,
    model_name: String,
}

impl<M> RigAgentAdapter<M>
where
    M: CompletionModel + Send + Sync,
{
    pub fn new(agent: Agent<M>) -> Self {
        Self::with_names(agent, "rig", "rig-agent")
    }

    /// Create adapter with custom provider/model names for logging.
    pub fn with_names(
        agent: Agent<M>,
        provider_name: impl Into<String>,
        model_name: impl Into<String>,
    ) -> Self {
        Self {
            agent: Arc::new(agent),
            provider_name: provider_name.into(),
            model_name: model_name.into(),
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[async_trait]
impl<M> LLMProvider for RigAgentAdapter<M>
where
    M: CompletionModel + Send + Sync + 'static,
{
    async fn complete(
        &self,
        messages: &[Message],
        config: Option<&LLMConfig>,
    ) -> Result<LLMResponse, GenerationError> {
        let conversation = build_rig_conversation(messages);
        let mut builder = self
            .agent
            .completion(conversation.prompt, conversation.history)
            .await
            .map_err(|e| GenerationError::Provider(format!("Rig agent error: {}", e)))?;

        if let Some(system_preamble) = conversation.preamble {
            let preamble = match self.agent.preamble.as_deref() {
                Some(agent_preamble) => format!("{}\n\n{}", agent_preamble, system_preamble),
                None => system_preamble,
            };
            builder = builder.preamble(preamble);
        }

        if let Some(cfg) = config {
            if let Some(temperature) = cfg.temperature {
                builder = builder.temperature(temperature);
            }
            if let Some(max_tokens) = cfg.max_tokens {
                builder = builder.max_tokens(max_tokens);
            }
        }

        let response = builder
            .send()
            .await
            .map_err(|e| GenerationError::Provider(format!("Rig agent error: {}", e)))?;

        let text = text_from_rig_choice(&response.choice);
        let usage = TokenUsage::from_rig_usage(&response.usage);

        let mut llm_response = LLMResponse::new(Message::assistant(&text));
        if usage.total_tokens > 0 {
            llm_response = llm_response.with_usage(usage);
        }

        Ok(llm_response)
    }

    fn name(&self) -> &str {
        &self.provider_name
    }
}

struct RigConversation {
    prompt: RigMessage,
    history: Vec<RigMessage>,
    preamble: Option<String>,
}

/// System messages become the preamble, the last user/assistant message the
/// prompt, everything before it the history.
fn build_rig_conversation(messages: &[Message]) -> RigConversation {
    let mut system_parts = Vec::new();
    let mut rig_messages = Vec::new();

    for message in messages {
        match message.role {
            Role::System => {
                if !message.content.trim().is_empty() {
                    system_parts.push(message.content.clone());
                }
            }
            Role::User => rig_messages.push(RigMessage::user(message.content.clone())),
            Role::Assistant => rig_messages.push(RigMessage::Assistant {
                id: None,
                content: OneOrMany::one(AssistantContent::text(message.content.clone())),
            }),
        }
    }

    let prompt = rig_messages.pop().unwrap_or_else(|| RigMessage::user(""));

    let preamble = if system_parts.is_empty() {
        None
    } else {
        Some(system_parts.join("\n\n"))
    };

    RigConversation {
        prompt,
        history: rig_messages,
        preamble,
    }
}

fn text_from_rig_choice(choice: &OneOrMany<AssistantContent>) -> String {
    choice
        .iter()
        .filter_map(|item| match item {
            AssistantContent::Text(text) => Some(text.text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("")
}

impl<M> std::fmt::Debug for RigAgentAdapter<M>
where
    M: CompletionModel + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RigAgentAdapter")
            .field("provider_name", &self.provider_name)
            .field("model_name", &self.model_name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rig::message::UserContent;

    fn rig_message_text(message: &RigMessage) -> Option<String> {
        match message {
            RigMessage::User { content } => content.iter().find_map(|item| match item {
                UserContent::Text(text) => Some(text.text.clone()),
                _ => None,
            }),
            RigMessage::Assistant { content, .. } => content.iter().find_map(|item| match item {
                AssistantContent::Text(text) => Some(text.text.clone()),
                _ => None,
            }),
        }
    }

    #[test]
    fn test_system_and_user_prompt() {
        let messages = vec![
            Message::system("You evaluate search results."),
            Message::user("Is this page relevant?"),
        ];

        let conversation = build_rig_conversation(&messages);

        assert_eq!(
            conversation.preamble,
            Some("You evaluate search results.".to_string())
        );
        assert!(conversation.history.is_empty());
        assert_eq!(
            rig_message_text(&conversation.prompt).unwrap(),
            "Is this page relevant?"
        );
    }

    #[test]
    fn test_history_is_kept_in_order() {
        let messages = vec![
            Message::user("first"),
            Message::assistant("answer"),
            Message::user("second"),
        ];

        let conversation = build_rig_conversation(&messages);

        assert_eq!(conversation.preamble, None);
        assert_eq!(conversation.history.len(), 2);
        assert_eq!(rig_message_text(&conversation.history[0]).unwrap(), "first");
        assert_eq!(rig_message_text(&conversation.history[1]).unwrap(), "answer");
        assert_eq!(rig_message_text(&conversation.prompt).unwrap(), "second");
    }

    #[test]
    fn test_text_from_rig_choice_skips_tool_calls() {
        let choice = OneOrMany::many(vec![
            AssistantContent::text("{\"queries\": "),
            AssistantContent::tool_call("call_1", "search", serde_json::json!({"query": "rust"})),
            AssistantContent::text("[\"a\"]}"),
        ])
        .unwrap();

        assert_eq!(text_from_rig_choice(&choice), "{\"queries\": [\"a\"]}");
    }
}
