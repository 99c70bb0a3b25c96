//! Narrative enrichment interface

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Context handed to the enrichment service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentContext {
    /// Original user question
    pub question: String,
    pub intent: String,
    /// Deterministic answer already computed locally
    pub local_answer: String,
    /// Structured aggregation payload
    pub data: serde_json::Value,
}

#[derive(Error, Debug, Clone)]
pub enum EnrichmentError {
    #[error("Enrichment disabled")]
    Disabled,

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Service returned status {0}")]
    Status(u16),

    #[error("Malformed response: {0}")]
    Malformed(String),
}

/// External narrative enrichment service
///
/// Called at most once per request; the caller owns the timeout.
#[async_trait]
pub trait NarrativeEnricher: Send + Sync + 'static {
    async fn enrich(&self, context: &EnrichmentContext) -> Result<String, EnrichmentError>;

    fn name(&self) -> &str;
}
