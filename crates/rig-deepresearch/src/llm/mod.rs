//! Completion service abstractions
//!
//! ```text
//! QueryGenerator / ResultEvaluator / LearningExtractor
//!                   │ uses
//!                   ▼
//!        StructuredGenerator  (JSON objects, enumerated labels)
//!                   │ uses
//!                   ▼
//!          LLMProvider (trait)
//!                   │ implemented by
//!                   ▼
//!          RigAgentAdapter<M>  ──► Rig OpenAI / Anthropic / Ollama
//! ```

mod message;
mod provider;
mod structured;

pub use message::{Message, Role};
pub use provider::{LLMConfig, LLMProvider, LLMResponse, TokenUsage};
pub use structured::{extract_json, StructuredGenerator};
