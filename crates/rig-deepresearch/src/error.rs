//! Error types
//!
//! Two failure families come from the collaborators: the completion service
//! (`GenerationError`) and the retrieval service (`RetrievalError`).
//! `ResearchError` is what every research operation returns.

use std::time::Duration;
use thiserror::Error;

/// Completion / structured-generation failure
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerationError {
    #[error("LLM provider error: {0}")]
    Provider(String),

    #[error("LLM call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Malformed model output: {reason}")]
    Malformed { reason: String },

    #[error("Model output violates schema: {reason}")]
    Schema { reason: String },
}

impl GenerationError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed { reason: reason.into() }
    }

    pub fn schema(reason: impl Into<String>) -> Self {
        Self::Schema { reason: reason.into() }
    }
}

/// Retrieval (web search) failure
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RetrievalError {
    #[error("Request timed out")]
    Timeout,

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unauthorized - check API key")]
    Unauthorized,

    #[error("Rate limited - too many requests")]
    RateLimited,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Server error ({0}): {1}")]
    ServerError(u16, String),

    #[error("HTTP error ({0}): {1}")]
    HttpError(u16, String),

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("{0} environment variable not set")]
    MissingApiKey(&'static str),
}

impl RetrievalError {
    /// Transient failures worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RetrievalError::Timeout
                | RetrievalError::Connection(_)
                | RetrievalError::RateLimited
                | RetrievalError::ServerError(_, _)
        )
    }

    /// Map a non-success HTTP status to an error
    pub(crate) fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => RetrievalError::Unauthorized,
            429 => RetrievalError::RateLimited,
            400 => RetrievalError::BadRequest(body),
            500..=599 => RetrievalError::ServerError(status, body),
            _ => RetrievalError::HttpError(status, body),
        }
    }

    pub(crate) fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RetrievalError::Timeout
        } else if e.is_connect() {
            RetrievalError::Connection(e.to_string())
        } else {
            RetrievalError::Network(e.to_string())
        }
    }
}

/// Top-level research error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResearchError {
    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("Configuration error: {0}")]
    Config(String),
}
