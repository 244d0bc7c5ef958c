//! # Deep Research
//!
//! Recursive web research from the command line.
//!
//! Given a question, the tool generates search queries, keeps the relevant
//! pages, extracts findings and follow-up questions from each, and recurses on
//! those follow-ups with decreasing depth and breadth. The result is a report
//! of every query explored, every source kept and every finding extracted.
//!
//! ## Quick Start
//! ```bash
//! export ANTHROPIC_API_KEY=... EXA_API_KEY=...
//! cargo run -- "What do I need to do to get hired at top SF startups?"
//! ```

// =============================================================================
// MODULE DECLARATIONS
// =============================================================================

/// Configuration management
mod config;

/// Collaborator wiring
mod agent;

// =============================================================================
// IMPORTS
// =============================================================================
use anyhow::{Context, Result};
use clap::Parser;
use rig_deepresearch::{ResearchState, SharedResearchState};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::agent::ResearchAgent;
use crate::config::{Config, LlmProvider, SearchBackend};

// =============================================================================
// CLI ARGUMENTS
// =============================================================================
#[derive(Parser, Debug)]
#[command(
    name = "deep-research",
    version,
    about = "Recursively researches a question on the web and reports the findings",
    long_about = r#"
Deep Research - breadth-then-depth web research.

For the question given it will:
  1. Generate BREADTH search queries
  2. Search the web for each and keep the relevant, unseen pages
  3. Extract a finding and follow-up questions from every kept page
  4. Research the follow-ups with DEPTH - 1 and half the breadth

Configuration is read from the environment (or a .env file); flags override it.

EXAMPLES:
  # Default: Anthropic + Exa, depth 2, breadth 3
  deep-research "How do vector databases index embeddings?"

  # Local model, Tavily search, wider and concurrent
  deep-research --provider ollama --model llama3.2 --search tavily \
      --breadth 4 --concurrent "Rust async runtimes compared"

  # Machine-readable output
  deep-research --json "Raft vs Paxos in production" > state.json
"#
)]
struct Args {
    /// The research question
    #[arg(value_name = "QUESTION")]
    question: String,

    /// Recursion depth (overrides RESEARCH_DEPTH)
    #[arg(short = 'd', long = "depth")]
    depth: Option<usize>,

    /// Sub-queries at the top level, 1-5 (overrides RESEARCH_BREADTH)
    #[arg(short = 'b', long = "breadth")]
    breadth: Option<usize>,

    /// Completion provider (overrides LLM_PROVIDER)
    #[arg(short = 'p', long = "provider", value_enum)]
    provider: Option<LlmProvider>,

    /// Model name (overrides LLM_MODEL)
    #[arg(short = 'm', long = "model", env = "LLM_MODEL")]
    model: Option<String>,

    /// Web search backend (overrides SEARCH_PROVIDER)
    #[arg(short = 's', long = "search", value_enum)]
    search: Option<SearchBackend>,

    /// Run sibling branches concurrently
    #[arg(long = "concurrent", default_value = "false")]
    concurrent: bool,

    /// Record failed branches and continue instead of aborting
    #[arg(long = "skip-failed-branches", default_value = "false")]
    skip_failed_branches: bool,

    /// Print the research state as JSON instead of a Markdown report
    #[arg(long = "json", default_value = "false")]
    json: bool,

    /// Verbose output (debug logging)
    #[arg(short = 'v', long = "verbose", default_value = "false")]
    verbose: bool,
}

impl Args {
    /// Apply command-line overrides on top of the environment configuration
    fn apply(&self, config: &mut Config) {
        if let Some(depth) = self.depth {
            config.depth = depth;
        }
        if let Some(breadth) = self.breadth {
            config.breadth = breadth;
        }
        if let Some(provider) = self.provider {
            config.provider = provider;
        }
        if let Some(model) = &self.model {
            info!(model = %model, "Using model from command line");
            config.model = Some(model.clone());
        }
        if let Some(search) = self.search {
            config.search = search;
        }
        config.concurrent |= self.concurrent;
        config.skip_failed_branches |= self.skip_failed_branches;
        config.refresh_api_keys();
    }
}

// =============================================================================
// MAIN FUNCTION
// =============================================================================
#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose)?;

    let mut config = Config::from_env()?;
    args.apply(&mut config);
    config.validate()?;

    info!(
        provider = config.provider.as_str(),
        model = %config.model(),
        search = config.search.as_str(),
        depth = config.depth,
        breadth = config.breadth,
        concurrent = config.concurrent,
        "Configuration loaded"
    );

    let agent = ResearchAgent::new(config);
    let state = SharedResearchState::new();

    let result = agent.research(&args.question, &state).await;
    let state = state.snapshot().await;

    match result {
        Ok(()) => {
            print_state(&state, args.json)?;
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Research failed");
            eprintln!("\nResearch failed: {:#}", e);

            if !state.learnings().is_empty() {
                warn!(
                    learnings = state.learnings().len(),
                    "Printing partial results gathered before the failure"
                );
                print_state(&state, args.json)?;
            }

            Err(e)
        }
    }
}

fn print_state(state: &ResearchState, json: bool) -> Result<()> {
    if json {
        let output = serde_json::to_string_pretty(state).context("Failed to serialize research state")?;
        println!("{}", output);
    } else {
        println!("\n{}", "=".repeat(60));
        println!("RESEARCH RESULTS");
        println!("{}\n", "=".repeat(60));
        println!("{}", state.to_markdown());
        println!("{}", "=".repeat(60));
    }
    Ok(())
}

// =============================================================================
// LOGGING INITIALIZATION
// =============================================================================
/// Logs go to stderr so that stdout carries only the report.
/// `--verbose` forces debug level; otherwise RUST_LOG applies, defaulting to info.
fn init_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set logging subscriber: {}", e))?;

    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parsing() {
        let args = Args::parse_from(["test", "What is Rust?"]);
        assert_eq!(args.question, "What is Rust?");
        assert_eq!(args.depth, None);
        assert!(!args.concurrent);
        assert!(!args.json);
        assert!(!args.verbose);
    }

    #[test]
    fn test_args_with_flags() {
        let args = Args::parse_from([
            "test",
            "--depth",
            "3",
            "--breadth",
            "4",
            "--provider",
            "openai",
            "--search",
            "tavily",
            "--concurrent",
            "--skip-failed-branches",
            "--json",
            "Test question",
        ]);

        assert_eq!(args.question, "Test question");
        assert_eq!(args.depth, Some(3));
        assert_eq!(args.breadth, Some(4));
        assert_eq!(args.provider, Some(LlmProvider::OpenAi));
        assert_eq!(args.search, Some(SearchBackend::Tavily));
        assert!(args.concurrent);
        assert!(args.skip_failed_branches);
        assert!(args.json);
    }

    #[test]
    fn test_overrides_apply() {
        let args = Args::parse_from(["test", "--depth", "1", "--provider", "ollama", "--concurrent", "Q"]);
        let mut config = Config::default();

        args.apply(&mut config);

        assert_eq!(config.depth, 1);
        assert_eq!(config.provider, LlmProvider::Ollama);
        assert!(config.concurrent);
        assert_eq!(config.breadth, 3);
    }
}
