//! Chat completions backend
//!
//! Talks to any OpenAI-compatible `/chat/completions` endpoint (DeepSeek by
//! default). Exactly one request per call; the caller owns the timeout.

use std::time::{Duration, Instant};

use arn_assistant_config::EnrichmentConfig;
use arn_assistant_core::{EnrichmentContext, EnrichmentError, NarrativeEnricher};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::prompt::{Message, PromptBuilder};
use crate::LlmError;

/// Backend configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub model: String,
    /// Base URL, without the `/chat/completions` suffix
    pub endpoint: String,
    pub api_key: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Transport-level timeout, a backstop behind the orchestrator's own
    pub timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self::from(&EnrichmentConfig::default())
    }
}

impl From<&EnrichmentConfig> for LlmConfig {
    fn from(config: &EnrichmentConfig) -> Self {
        Self {
            model: config.model.clone(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }
}

/// Enricher backed by a chat completions API
#[derive(Clone)]
pub struct ChatCompletionEnricher {
    client: Client,
    config: LlmConfig,
}

impl ChatCompletionEnricher {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn api_url(&self) -> String {
        format!("{}/chat/completions", self.config.endpoint)
    }

    /// Send one completion request and return the first choice's text
    pub async fn complete(&self, messages: Vec<Message>) -> Result<String, LlmError> {
        let start = Instant::now();
        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            stream: false,
        };

        let mut builder = self.client.post(self.api_url()).json(&request);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(status = status.as_u16(), body = %body, "Completion request rejected");
            return Err(LlmError::Status(status.as_u16()));
        }

        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let text = body
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("No choices returned".to_string()))?;

        tracing::debug!(
            model = %self.config.model,
            latency_ms = start.elapsed().as_millis() as u64,
            chars = text.chars().count(),
            "Completion received"
        );

        Ok(text.trim().to_string())
    }
}

#[async_trait]
impl NarrativeEnricher for ChatCompletionEnricher {
    async fn enrich(&self, context: &EnrichmentContext) -> Result<String, EnrichmentError> {
        let messages = PromptBuilder::new()
            .system_prompt()
            .with_context(context)
            .build();

        self.complete(messages).await.map_err(EnrichmentError::from)
    }

    fn name(&self) -> &str {
        &self.config.model
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: String,
}
