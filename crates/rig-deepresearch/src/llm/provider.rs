//! LLM Provider trait definition
//!
//! The completion collaborator: one request, one response, stateless from the
//! caller's point of view. Implementations bridge to specific providers via
//! Rig's `CompletionModel` (see `compat::RigAgentAdapter`).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::message::Message;
use crate::error::GenerationError;

/// Token usage statistics from an LLM completion.
///
/// ```
/// use rig_deepresearch::TokenUsage;
///
/// let mut usage = TokenUsage::new(100, 50);
/// usage += TokenUsage::new(10, 5);
/// assert_eq!(usage.total_tokens, 165);
/// ```
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    pub fn new(input: u64, output: u64) -> Self {
        Self {
            input_tokens: input,
            output_tokens: output,
            total_tokens: input + output,
        }
    }

    /// Create from rig-core Usage struct
    pub fn from_rig_usage(usage: &rig::completion::Usage) -> Self {
        Self::new(usage.input_tokens, usage.output_tokens)
    }
}

impl std::ops::AddAssign for TokenUsage {
    fn add_assign(&mut self, other: Self) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.total_tokens += other.total_tokens;
    }
}

/// Per-request overrides for a completion
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct LLMConfig {
    /// Sampling temperature (0.0 - 2.0)
    pub temperature: Option<f64>,
    /// Maximum tokens to generate in the response
    pub max_tokens: Option<u64>,
}

impl LLMConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_temperature(mut self, temp: f64) -> Self {
        self.temperature = Some(temp);
        self
    }

    pub fn with_max_tokens(mut self, tokens: u64) -> Self {
        self.max_tokens = Some(tokens);
        self
    }
}

/// LLM completion response
#[derive(Debug, Clone)]
pub struct LLMResponse {
    /// The assistant's response message
    pub message: Message,
    /// Token usage statistics (if available from provider)
    pub usage: Option<TokenUsage>,
}

impl LLMResponse {
    pub fn new(message: Message) -> Self {
        Self { message, usage: None }
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }
}

/// Core LLM Provider trait
///
/// # Example Implementation
///
/// ```rust,ignore
/// struct EchoProvider;
///
/// #[async_trait]
/// impl LLMProvider for EchoProvider {
///     async fn complete(
///         &self,
///         messages: &[Message],
///         _config: Option<&LLMConfig>,
///     ) -> Result<LLMResponse, GenerationError> {
///         let last = messages.last().map(|m| m.content.as_str()).unwrap_or("");
///         Ok(LLMResponse::new(Message::assistant(last)))
///     }
///
///     fn name(&self) -> &str { "echo" }
/// }
/// ```
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate a completion for the conversation.
    ///
    /// Transport or provider failures are reported as `GenerationError::Provider`.
    async fn complete(
        &self,
        messages: &[Message],
        config: Option<&LLMConfig>,
    ) -> Result<LLMResponse, GenerationError>;

    /// Provider name for logging
    fn name(&self) -> &str;
}
