//! Application State
//!
//! Shared state across all handlers.

use std::sync::Arc;

use arn_assistant_agent::{Assistant, AssistantError, InMemorySessionRepository};
use arn_assistant_config::Settings;
use arn_assistant_core::{Clock, NarrativeEnricher, RegulatoryDataSource, SystemClock};
use metrics_exporter_prometheus::PrometheusHandle;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub assistant: Arc<Assistant>,
    /// Absent when metrics are disabled
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(config: Settings, assistant: Assistant) -> Self {
        Self {
            config: Arc::new(config),
            assistant: Arc::new(assistant),
            metrics: None,
        }
    }

    /// Wire an assistant over the given data source with in-memory persistence
    pub fn build(
        config: Settings,
        source: Arc<dyn RegulatoryDataSource>,
        enricher: Option<Arc<dyn NarrativeEnricher>>,
    ) -> Result<Self, AssistantError> {
        Self::build_with_clock(config, source, enricher, Arc::new(SystemClock))
    }

    pub fn build_with_clock(
        config: Settings,
        source: Arc<dyn RegulatoryDataSource>,
        enricher: Option<Arc<dyn NarrativeEnricher>>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AssistantError> {
        let assistant = Assistant::new(
            &config,
            source,
            Arc::new(InMemorySessionRepository::new()),
            enricher,
            clock,
        )?;
        Ok(Self::new(config, assistant))
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
