//! # Configuration Module
//!
//! Loads the CLI configuration from the environment (and an optional `.env`
//! file), then lets command-line flags override it. Everything is validated
//! up front so that a missing API key fails before any remote call is made.

use anyhow::{Context, Result};
use clap::ValueEnum;
use rig_deepresearch::{Concurrency, FailurePolicy, ResearchConfig};
use std::env;
use std::str::FromStr;
use std::time::Duration;

// =============================================================================
// PROVIDER SELECTION
// =============================================================================
/// Which Rig client backs the completion service
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LlmProvider {
    #[value(name = "openai")]
    OpenAi,
    Anthropic,
    Ollama,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmProvider::OpenAi => "openai",
            LlmProvider::Anthropic => "anthropic",
            LlmProvider::Ollama => "ollama",
        }
    }

    /// Model used when LLM_MODEL / --model is not given
    pub fn default_model(&self) -> &'static str {
        match self {
            LlmProvider::OpenAi => "gpt-4.1-mini",
            LlmProvider::Anthropic => "claude-3-5-haiku-latest",
            LlmProvider::Ollama => "llama3.2",
        }
    }

    /// Environment variable the Rig client reads its API key from
    pub fn api_key_var(&self) -> Option<&'static str> {
        match self {
            LlmProvider::OpenAi => Some("OPENAI_API_KEY"),
            LlmProvider::Anthropic => Some("ANTHROPIC_API_KEY"),
            LlmProvider::Ollama => None,
        }
    }
}

/// Which web search API backs the retrieval service
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SearchBackend {
    Tavily,
    Exa,
}

impl SearchBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchBackend::Tavily => "tavily",
            SearchBackend::Exa => "exa",
        }
    }

    pub fn api_key_var(&self) -> &'static str {
        match self {
            SearchBackend::Tavily => "TAVILY_API_KEY",
            SearchBackend::Exa => "EXA_API_KEY",
        }
    }
}

// =============================================================================
// CONFIGURATION STRUCT
// =============================================================================
#[derive(Debug, Clone)]
pub struct Config {
    pub provider: LlmProvider,

    /// Model name; `None` means the provider's default
    pub model: Option<String>,

    /// Ollama server URL (only used with `LlmProvider::Ollama`)
    pub ollama_host: String,

    pub temperature: f64,

    /// Required by Anthropic, applied to every provider
    pub max_tokens: u64,

    pub search: SearchBackend,

    /// Recursion depth of the research tree
    pub depth: usize,

    /// Sub-queries at the top level (1..=5)
    pub breadth: usize,

    /// Documents retrieved per sub-query
    pub results_per_query: usize,

    /// Deadline per remote call in seconds; 0 disables it
    pub call_timeout_secs: u64,

    /// Retries for transient search failures (timeouts, 429, 5xx)
    pub search_max_retries: u32,

    /// Run sibling branches concurrently
    pub concurrent: bool,

    /// Concurrent remote calls allowed when `concurrent` is set
    pub max_in_flight: usize,

    /// Record failed branches and keep going instead of aborting
    pub skip_failed_branches: bool,

    /// API keys as found in the environment, checked by `validate`
    llm_api_key: Option<String>,
    search_api_key: Option<String>,
}

// =============================================================================
// DEFAULT IMPLEMENTATION
// =============================================================================
impl Default for Config {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Anthropic,
            model: None,
            ollama_host: "http://localhost:11434".to_string(),
            // Low temperature: query generation and relevance judgments
            // should be focused, not creative
            temperature: 0.2,
            max_tokens: 4096,
            search: SearchBackend::Exa,
            depth: 2,
            breadth: 3,
            results_per_query: 1,
            call_timeout_secs: 120,
            search_max_retries: 3,
            concurrent: false,
            max_in_flight: 4,
            skip_failed_branches: false,
            llm_api_key: None,
            search_api_key: None,
        }
    }
}

// =============================================================================
// CONFIGURATION LOADING
// =============================================================================
impl Config {
    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists (silently ignore if not found)
        let _ = dotenvy::dotenv();

        let mut config = Config::default();

        if let Ok(val) = env::var("LLM_PROVIDER") {
            config.provider = LlmProvider::from_str(&val, true)
                .map_err(anyhow::Error::msg)
                .context("LLM_PROVIDER must be one of: openai, anthropic, ollama")?;
        }

        if let Ok(val) = env::var("LLM_MODEL") {
            config.model = Some(val);
        }

        if let Ok(val) = env::var("OLLAMA_API_BASE_URL") {
            config.ollama_host = val;
        }

        if let Ok(val) = env::var("SEARCH_PROVIDER") {
            config.search = SearchBackend::from_str(&val, true)
                .map_err(anyhow::Error::msg)
                .context("SEARCH_PROVIDER must be one of: tavily, exa")?;
        }

        config.temperature = parse_var("LLM_TEMPERATURE", config.temperature)?;
        config.max_tokens = parse_var("LLM_MAX_TOKENS", config.max_tokens)?;
        config.depth = parse_var("RESEARCH_DEPTH", config.depth)?;
        config.breadth = parse_var("RESEARCH_BREADTH", config.breadth)?;
        config.results_per_query = parse_var("RESULTS_PER_QUERY", config.results_per_query)?;
        config.call_timeout_secs = parse_var("CALL_TIMEOUT_SECS", config.call_timeout_secs)?;
        config.search_max_retries = parse_var("SEARCH_MAX_RETRIES", config.search_max_retries)?;
        config.max_in_flight = parse_var("MAX_IN_FLIGHT", config.max_in_flight)?;

        config.refresh_api_keys();
        Ok(config)
    }

    /// Re-read the API keys for the currently selected providers.
    /// Call after changing `provider` or `search`.
    pub fn refresh_api_keys(&mut self) {
        self.llm_api_key = self
            .provider
            .api_key_var()
            .and_then(|var| env::var(var).ok());
        self.search_api_key = env::var(self.search.api_key_var()).ok();
    }

    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }

    pub fn call_timeout(&self) -> Option<Duration> {
        (self.call_timeout_secs > 0).then(|| Duration::from_secs(self.call_timeout_secs))
    }

    /// The library-side configuration of the research tree
    pub fn research_config(&self) -> ResearchConfig {
        let mut config = ResearchConfig::new(self.depth, self.breadth)
            .with_results_per_query(self.results_per_query)
            .with_max_in_flight(self.max_in_flight)
            .with_concurrency(if self.concurrent {
                Concurrency::Concurrent
            } else {
                Concurrency::Sequential
            })
            .with_failure_policy(if self.skip_failed_branches {
                FailurePolicy::SkipBranch
            } else {
                FailurePolicy::FailFast
            });

        config.call_timeout = self.call_timeout();
        config
    }

    /// Fail fast with a clear message instead of failing mid-research.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.temperature) {
            anyhow::bail!(
                "LLM_TEMPERATURE must be between 0.0 and 2.0, got: {}",
                self.temperature
            );
        }

        if self.model().trim().is_empty() {
            anyhow::bail!("LLM_MODEL cannot be empty");
        }

        if self.max_tokens == 0 {
            anyhow::bail!("LLM_MAX_TOKENS must be at least 1");
        }

        if !(1..=5).contains(&self.breadth) {
            anyhow::bail!("RESEARCH_BREADTH must be between 1 and 5, got: {}", self.breadth);
        }

        if self.results_per_query == 0 {
            anyhow::bail!("RESULTS_PER_QUERY must be at least 1");
        }

        if self.max_in_flight == 0 {
            anyhow::bail!("MAX_IN_FLIGHT must be at least 1");
        }

        if let Some(var) = self.provider.api_key_var() {
            if self.llm_api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
                anyhow::bail!("{} must be set to use the {} provider", var, self.provider.as_str());
            }
        }

        if self.search_api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
            anyhow::bail!(
                "{} must be set to use {} search",
                self.search.api_key_var(),
                self.search.as_str()
            );
        }

        Ok(())
    }
}

/// Parse `var` if it is set, keep `default` otherwise
fn parse_var<T>(var: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(var) {
        Ok(val) => val
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {:?}", var, val)),
        Err(_) => Ok(default),
    }
}
