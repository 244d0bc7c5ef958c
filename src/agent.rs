//! # Agent Module
//!
//! Wires the concrete collaborators into a `ResearchOrchestrator`:
//! - a Rig agent (OpenAI, Anthropic or Ollama) wrapped in `RigAgentAdapter`
//!   as the completion service
//! - Tavily or Exa as the retrieval service

use anyhow::{Context, Result};
use rig::client::{CompletionClient, ProviderClient};
use rig::providers::{anthropic, ollama, openai};
use rig_deepresearch::{
    ExaSearch, LLMProvider, ResearchOrchestrator, RetryPolicy, RigAgentAdapter, SearchProvider,
    SharedResearchState, TavilySearch,
};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::{Config, LlmProvider, SearchBackend};

// =============================================================================
// RESEARCH AGENT STRUCT
// =============================================================================
/// Builds the collaborators from a validated `Config` and runs research.
pub struct ResearchAgent {
    config: Config,
}

impl ResearchAgent {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run the research tree for `question`, accumulating into `state`.
    ///
    /// The state is owned by the caller so that whatever was gathered before
    /// a failure can still be reported.
    pub async fn research(&self, question: &str, state: &SharedResearchState) -> Result<()> {
        let orchestrator = self.orchestrator()?;
        let research = orchestrator.config();

        info!(
            question = %question,
            depth = research.depth,
            breadth = research.breadth,
            "Starting research task"
        );

        orchestrator
            .research(question.to_string(), research.depth, research.breadth, state)
            .await
            .context("Research failed")?;

        info!("Research completed successfully");
        Ok(())
    }

    fn orchestrator(&self) -> Result<ResearchOrchestrator> {
        let provider = self.completion_provider();
        let search = self.search_provider()?;

        ResearchOrchestrator::new(provider, search, self.config.research_config())
            .context("Invalid research configuration")
    }

    /// Build the Rig agent for the configured provider.
    ///
    /// Research calls carry their own system prompts, so the agent itself has
    /// no preamble and no tools.
    fn completion_provider(&self) -> Arc<dyn LLMProvider> {
        let model = self.config.model();
        let provider = self.config.provider;

        debug!(provider = provider.as_str(), model = %model, "Building completion agent");

        match provider {
            LlmProvider::OpenAi => {
                let agent = openai::Client::from_env()
                    .agent(model)
                    .temperature(self.config.temperature)
                    .max_tokens(self.config.max_tokens)
                    .build();
                Arc::new(RigAgentAdapter::with_names(agent, provider.as_str(), model))
            }
            LlmProvider::Anthropic => {
                let agent = anthropic::Client::from_env()
                    .agent(model)
                    .temperature(self.config.temperature)
                    .max_tokens(self.config.max_tokens)
                    .build();
                Arc::new(RigAgentAdapter::with_names(agent, provider.as_str(), model))
            }
            LlmProvider::Ollama => {
                // ollama::Client::from_env() reads OLLAMA_API_BASE_URL
                std::env::set_var("OLLAMA_API_BASE_URL", &self.config.ollama_host);
                let agent = ollama::Client::from_env()
                    .agent(model)
                    .temperature(self.config.temperature)
                    .max_tokens(self.config.max_tokens)
                    .build();
                Arc::new(RigAgentAdapter::with_names(agent, provider.as_str(), model))
            }
        }
    }

    fn search_provider(&self) -> Result<Arc<dyn SearchProvider>> {
        let retry = RetryPolicy::default().with_max_retries(self.config.search_max_retries);

        let search: Arc<dyn SearchProvider> = match self.config.search {
            SearchBackend::Tavily => Arc::new(
                TavilySearch::from_env()
                    .context("Tavily search needs an API key")?
                    .with_retry(retry),
            ),
            SearchBackend::Exa => Arc::new(
                ExaSearch::from_env()
                    .context("Exa search needs an API key")?
                    .with_retry(retry),
            ),
        };

        debug!(search = search.name(), "Search provider ready");
        Ok(search)
    }
}

// =============================================================================
// UNIT TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_creation() {
        let agent = ResearchAgent::new(Config::default());
        assert_eq!(agent.config.depth, 2);
    }

    #[test]
    fn test_search_provider_requires_key() {
        std::env::remove_var("TAVILY_API_KEY");
        let mut config = Config::default();
        config.search = SearchBackend::Tavily;

        let result = ResearchAgent::new(config).search_provider();

        assert!(result.is_err());
    }
}
