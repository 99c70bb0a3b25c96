//! Conversation sessions and turns

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who authored a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    /// Framing instruction placed at the start of every window
    System,
    User,
    Assistant,
}

/// A single turn in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub id: Uuid,
    pub session_id: String,
    pub role: TurnRole,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// Classified intent (assistant turns)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    /// Structured aggregation payload (assistant turns)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

impl ConversationTurn {
    pub fn new(
        session_id: impl Into<String>,
        role: TurnRole,
        text: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id: session_id.into(),
            role,
            text: text.into(),
            timestamp,
            intent: None,
            confidence: None,
            data: None,
            latency_ms: None,
        }
    }

    pub fn with_intent(mut self, intent: impl Into<String>, confidence: f32) -> Self {
        self.intent = Some(intent.into());
        self.confidence = Some(confidence);
        self
    }

    pub fn with_data(mut self, data: Option<serde_json::Value>) -> Self {
        self.data = data;
        self
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = Some(latency_ms);
        self
    }
}

/// A conversation session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSession {
    pub id: String,
    /// Authenticated user, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub context: HashMap<String, serde_json::Value>,
    pub active: bool,
}

impl ConversationSession {
    pub fn new(id: impl Into<String>, owner: Option<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            owner,
            started_at,
            ended_at: None,
            context: HashMap::new(),
            active: true,
        }
    }

    /// Mark the session as ended
    pub fn end(&mut self, at: DateTime<Utc>) {
        self.active = false;
        self.ended_at = Some(at);
    }
}
