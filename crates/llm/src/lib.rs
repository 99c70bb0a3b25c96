//! Narrative enrichment for the ARN analytics assistant
//!
//! Features:
//! - OpenAI-compatible chat completions backend (single attempt, no retries)
//! - Prompt builder grounded in the locally computed answer and its data

pub mod backend;
pub mod prompt;

pub use backend::{ChatCompletionEnricher, LlmConfig};
pub use prompt::{Message, PromptBuilder, Role};

use arn_assistant_core::EnrichmentError;
use thiserror::Error;

/// LLM errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout")]
    Timeout,

    #[error("API returned status {0}")]
    Status(u16),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

impl From<LlmError> for EnrichmentError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Status(code) => EnrichmentError::Status(code),
            LlmError::InvalidResponse(msg) => EnrichmentError::Malformed(msg),
            other => EnrichmentError::Request(other.to_string()),
        }
    }
}

impl From<LlmError> for arn_assistant_core::Error {
    fn from(err: LlmError) -> Self {
        arn_assistant_core::Error::Enrichment(err.into())
    }
}
