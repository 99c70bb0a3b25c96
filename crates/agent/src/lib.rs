//! Conversational analytics engine
//!
//! Features:
//! - Keyword/pattern intent classification with tunable calibration
//! - Slot extraction (operator, year, quarter, month, metric)
//! - TTL query cache with single-flight computation
//! - Aggregation dispatcher over the regulatory data source
//! - Template-based response synthesis with charts and follow-ups
//! - Tiered fallback orchestration with optional narrative enrichment
//! - Session manager with a bounded working window

pub mod aggregation;
pub mod cache;
pub mod dispatcher;
pub mod entities;
pub mod forecast;
pub mod intent;
pub mod memory;
pub mod orchestrator;
pub mod session;
pub mod synthesizer;

pub use aggregation::AggregationResult;
pub use cache::{CacheStats, QueryCache};
pub use dispatcher::{AggregationDispatcher, DataQueryError};
pub use entities::EntityExtractor;
pub use forecast::{forecast, Forecast, Projection, SeriesPoint, TrendDirection};
pub use intent::{Classification, IntentClassifier, IntentRegistry};
pub use memory::WorkingWindow;
pub use orchestrator::{
    Assistant, AssistantReply, EnrichmentPolicy, HistoryEntry, ResetReply, ResponseTier,
    SubmitRequest, WelcomePayload,
};
pub use session::{InMemorySessionRepository, SessionManager, SessionOptions};
pub use synthesizer::{ResponseSynthesizer, SynthesizedResponse};

use arn_assistant_config::ConfigError;
use thiserror::Error;

/// Assistant errors
#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("Invalid input: {0}")]
    Input(String),

    #[error("Data query failed: {0}")]
    DataQuery(#[from] DataQueryError),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Session error: {0}")]
    Session(String),
}

impl From<ConfigError> for AssistantError {
    fn from(err: ConfigError) -> Self {
        AssistantError::Config(err.to_string())
    }
}

impl From<arn_assistant_core::EnrichmentError> for AssistantError {
    fn from(err: arn_assistant_core::EnrichmentError) -> Self {
        AssistantError::ExternalService(err.to_string())
    }
}
