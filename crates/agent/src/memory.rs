//! Working Window
//!
//! Bounded in-memory slice of a conversation: the system context turn plus
//! the last N user/assistant exchanges. Older turns fall off the front; the
//! persistence repository keeps the full record.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;

use arn_assistant_core::{ConversationTurn, TurnRole};

/// Window configuration
#[derive(Debug, Clone)]
pub struct WindowConfig {
    /// Exchanges (user turn + assistant turn) kept in the window
    pub max_exchanges: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self { max_exchanges: 10 }
    }
}

/// Per-session working window
pub struct WorkingWindow {
    config: WindowConfig,
    system: RwLock<Option<ConversationTurn>>,
    turns: RwLock<VecDeque<ConversationTurn>>,
    /// Turns pushed since the last clear, evicted ones included
    total_turns: AtomicUsize,
}

impl WorkingWindow {
    pub fn new(config: WindowConfig) -> Self {
        Self {
            config,
            system: RwLock::new(None),
            turns: RwLock::new(VecDeque::new()),
            total_turns: AtomicUsize::new(0),
        }
    }

    fn capacity(&self) -> usize {
        self.config.max_exchanges.max(1) * 2
    }

    /// Add a turn, evicting the oldest exchange turns beyond capacity
    ///
    /// A system turn replaces the current system context instead.
    pub fn push(&self, turn: ConversationTurn) {
        if turn.role == TurnRole::System {
            *self.system.write() = Some(turn);
            return;
        }

        let mut turns = self.turns.write();
        turns.push_back(turn);
        while turns.len() > self.capacity() {
            turns.pop_front();
        }
        self.total_turns.fetch_add(1, Ordering::Relaxed);
    }

    pub fn system(&self) -> Option<ConversationTurn> {
        self.system.read().clone()
    }

    /// System context first, then exchange turns oldest to newest
    pub fn turns(&self) -> Vec<ConversationTurn> {
        let system = self.system.read();
        let turns = self.turns.read();
        system.iter().chain(turns.iter()).cloned().collect()
    }

    /// Up to `limit` most recent exchange turns, most recent last
    pub fn recent(&self, limit: usize) -> Vec<ConversationTurn> {
        let turns = self.turns.read();
        let skip = turns.len().saturating_sub(limit);
        turns.iter().skip(skip).cloned().collect()
    }

    /// Exchange turns currently held
    pub fn len(&self) -> usize {
        self.turns.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.read().is_empty()
    }

    pub fn total_turns(&self) -> usize {
        self.total_turns.load(Ordering::Relaxed)
    }

    /// Drop every exchange turn, keeping the system context
    pub fn clear(&self) {
        self.turns.write().clear();
        self.total_turns.store(0, Ordering::Relaxed);
    }

    /// Recent exchanges as (role, text) pairs
    pub fn recent_messages(&self) -> Vec<(String, String)> {
        self.turns
            .read()
            .iter()
            .map(|t| (role_name(t.role).to_string(), t.text.clone()))
            .collect()
    }
}

impl Default for WorkingWindow {
    fn default() -> Self {
        Self::new(WindowConfig::default())
    }
}

fn role_name(role: TurnRole) -> &'static str {
    match role {
        TurnRole::System => "system",
        TurnRole::User => "user",
        TurnRole::Assistant => "assistant",
    }
}
