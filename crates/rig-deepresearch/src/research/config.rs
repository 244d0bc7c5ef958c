//! Research configuration
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use rig_deepresearch::{Concurrency, FailurePolicy, ResearchConfig};
//!
//! let config = ResearchConfig::new(2, 4)
//!     .with_concurrency(Concurrency::Concurrent)
//!     .with_max_in_flight(8)
//!     .with_failure_policy(FailurePolicy::SkipBranch)
//!     .with_call_timeout(Duration::from_secs(30));
//!
//! assert!(config.validate().is_ok());
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ResearchError;

/// How sibling sub-queries and sibling kept results are scheduled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Concurrency {
    /// Depth-first, one remote call at a time
    #[default]
    Sequential,
    /// Siblings run concurrently, at most `max_in_flight` remote calls at once
    Concurrent,
}

/// What happens to the rest of the tree when a sub-query branch fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// The first error aborts the whole research call
    #[default]
    FailFast,
    /// The error is recorded in `ResearchState::errors` and siblings continue
    SkipBranch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchConfig {
    /// Recursion levels below the root question
    pub depth: usize,
    /// Sub-queries requested at the top level; halved (rounded up) per level
    pub breadth: usize,
    /// Documents retrieved per sub-query
    pub results_per_query: usize,
    pub concurrency: Concurrency,
    /// Upper bound on concurrent remote calls in `Concurrency::Concurrent`
    pub max_in_flight: usize,
    pub failure_policy: FailurePolicy,
    /// Deadline for every completion and retrieval call
    pub call_timeout: Option<Duration>,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            depth: 2,
            breadth: 3,
            results_per_query: 1,
            concurrency: Concurrency::default(),
            max_in_flight: 4,
            failure_policy: FailurePolicy::default(),
            call_timeout: Some(Duration::from_secs(120)),
        }
    }
}

impl ResearchConfig {
    pub fn new(depth: usize, breadth: usize) -> Self {
        Self {
            depth,
            breadth,
            ..Default::default()
        }
    }

    pub fn with_results_per_query(mut self, k: usize) -> Self {
        self.results_per_query = k;
        self
    }

    pub fn with_concurrency(mut self, concurrency: Concurrency) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    pub fn without_call_timeout(mut self) -> Self {
        self.call_timeout = None;
        self
    }

    pub fn validate(&self) -> Result<(), ResearchError> {
        if self.breadth == 0 {
            return Err(ResearchError::Config("breadth must be at least 1".to_string()));
        }
        if self.results_per_query == 0 {
            return Err(ResearchError::Config(
                "results_per_query must be at least 1".to_string(),
            ));
        }
        if self.max_in_flight == 0 {
            return Err(ResearchError::Config("max_in_flight must be at least 1".to_string()));
        }
        if self.call_timeout == Some(Duration::ZERO) {
            return Err(ResearchError::Config("call_timeout must be non-zero".to_string()));
        }
        Ok(())
    }
}
