//! rig-deepresearch: recursive deep research on top of Rig
//!
//! Turns one natural-language question into a bounded tree of web searches:
//! - `QueryGenerator`: question -> sub-queries
//! - `SearchExecutor` + `ResultEvaluator`: sub-query -> relevant, deduplicated documents
//! - `LearningExtractor`: document -> finding + follow-up questions
//! - `ResearchOrchestrator`: recursion over follow-ups with decaying depth and breadth
//!
//! Everything found is accumulated into one `SharedResearchState` per top-level call.
//!
//! # Collaborators
//!
//! The completion service is any `LLMProvider` (use `RigAgentAdapter` to wrap a Rig agent),
//! the retrieval service is any `SearchProvider` (`TavilySearch`, `ExaSearch`).
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use rig::client::{CompletionClient, ProviderClient};
//! use rig_deepresearch::{RigAgentAdapter, ResearchOrchestrator, ResearchConfig, TavilySearch};
//!
//! let agent = rig::providers::openai::Client::from_env().agent("gpt-4.1").build();
//! let provider = Arc::new(RigAgentAdapter::new(agent));
//! let search = Arc::new(TavilySearch::from_env()?);
//!
//! let orchestrator = ResearchOrchestrator::new(provider, search, ResearchConfig::default())?;
//! let state = orchestrator.run("How do vector databases index embeddings?").await?;
//! println!("{}", state.to_markdown());
//! ```

pub mod error;
pub mod llm;
pub mod compat;
pub mod search;
pub mod research;

// Re-exports for convenience
pub use error::{GenerationError, ResearchError, RetrievalError};

pub use llm::{LLMConfig, LLMProvider, LLMResponse, Message, Role, StructuredGenerator, TokenUsage};

pub use compat::RigAgentAdapter;

pub use search::{ExaSearch, RetryPolicy, SearchDepth, SearchProvider, TavilySearch};

pub use research::{
    next_breadth, Concurrency, FailurePolicy, Learning, LearningExtractor, QueryGenerator,
    Relevance, ResearchConfig, ResearchOrchestrator, ResearchState, ResultEvaluator,
    SearchExecutor, SearchResult, SharedResearchState,
};
