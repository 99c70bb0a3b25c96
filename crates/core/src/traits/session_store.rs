//! Session persistence interface

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::conversation::{ConversationSession, ConversationTurn};

/// A session together with every turn persisted for it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSession {
    pub session: ConversationSession,
    pub turns: Vec<ConversationTurn>,
}

#[derive(Error, Debug, Clone)]
pub enum PersistenceError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Durable store for sessions and turns
#[async_trait]
pub trait SessionRepository: Send + Sync + 'static {
    /// Create or overwrite a session record
    async fn create(&self, session: &ConversationSession) -> Result<(), PersistenceError>;

    /// Append a turn to an existing session
    async fn append(&self, turn: &ConversationTurn) -> Result<(), PersistenceError>;

    async fn fetch_by_id(&self, id: &str) -> Result<Option<StoredSession>, PersistenceError>;

    async fn delete(&self, id: &str) -> Result<(), PersistenceError>;
}
