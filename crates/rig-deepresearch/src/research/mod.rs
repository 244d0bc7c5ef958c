//! Recursive research
//!
//! ```text
//! ResearchOrchestrator::research(question, depth, breadth)
//!   └─ QueryGenerator ─► [query; breadth]
//!        └─ SearchExecutor::search_and_filter(query)    (retrieve + ResultEvaluator)
//!             └─ LearningExtractor ─► Learning
//!                  └─ research(follow-up prompt, depth - 1, ceil(breadth / 2))
//! ```
//!
//! All branches write into one `SharedResearchState`.

mod config;
mod evaluator;
mod executor;
mod extractor;
mod limiter;
mod orchestrator;
pub mod prompts;
mod query_generator;
mod state;

pub use config::{Concurrency, FailurePolicy, ResearchConfig};
pub use evaluator::{Relevance, ResultEvaluator};
pub use executor::SearchExecutor;
pub use extractor::LearningExtractor;
pub use orchestrator::{next_breadth, ResearchOrchestrator};
pub use prompts::ResearchPrompts;
pub use query_generator::QueryGenerator;
pub use state::{Learning, ResearchState, SearchResult, SharedResearchState};
