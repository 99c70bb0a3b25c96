//! Session Management
//!
//! Owns per-conversation state: the session record, its bounded working
//! window and last activity. Durable storage goes through a
//! `SessionRepository`; persistence failures are logged and never fail a
//! request.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::sync::{watch, Mutex, MutexGuard};

use arn_assistant_config::SessionConfig;
use arn_assistant_core::{
    Clock, ConversationSession, ConversationTurn, PersistenceError, SessionRepository, StoredSession,
    TurnRole,
};

use uuid::Uuid;

use crate::memory::{WindowConfig, WorkingWindow};
use crate::AssistantError;

/// In-memory session repository
#[derive(Default)]
pub struct InMemorySessionRepository {
    sessions: RwLock<HashMap<String, StoredSession>>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn create(&self, session: &ConversationSession) -> Result<(), PersistenceError> {
        let mut sessions = self.sessions.write();
        match sessions.get_mut(&session.id) {
            Some(stored) => stored.session = session.clone(),
            None => {
                sessions.insert(
                    session.id.clone(),
                    StoredSession {
                        session: session.clone(),
                        turns: Vec::new(),
                    },
                );
            }
        }
        Ok(())
    }

    async fn append(&self, turn: &ConversationTurn) -> Result<(), PersistenceError> {
        let mut sessions = self.sessions.write();
        let stored = sessions
            .get_mut(&turn.session_id)
            .ok_or_else(|| PersistenceError::NotFound(turn.session_id.clone()))?;
        stored.turns.push(turn.clone());
        Ok(())
    }

    async fn fetch_by_id(&self, id: &str) -> Result<Option<StoredSession>, PersistenceError> {
        Ok(self.sessions.read().get(id).cloned())
    }

    async fn delete(&self, id: &str) -> Result<(), PersistenceError> {
        self.sessions.write().remove(id);
        Ok(())
    }
}

/// Session manager options
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub window_exchanges: usize,
    pub inactivity_ttl: Duration,
    pub max_sessions: usize,
    pub cleanup_interval: Duration,
    /// History limit when the caller gives none
    pub history_limit: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from(&SessionConfig::default())
    }
}

impl From<&SessionConfig> for SessionOptions {
    fn from(config: &SessionConfig) -> Self {
        Self {
            window_exchanges: config.window_exchanges,
            inactivity_ttl: Duration::from_secs(config.inactivity_ttl_seconds),
            max_sessions: config.max_sessions,
            cleanup_interval: Duration::from_secs(config.cleanup_interval_seconds),
            history_limit: config.history_limit,
        }
    }
}

/// Live session state
pub struct Session {
    pub id: String,
    record: RwLock<ConversationSession>,
    window: WorkingWindow,
    last_activity: RwLock<DateTime<Utc>>,
    last_turn: RwLock<Option<Uuid>>,
    /// History starts after this turn once the session is reset
    history_floor: RwLock<Option<Uuid>>,
    /// Held for the whole of a request so turns are recorded in order
    request_lock: Mutex<()>,
}

impl Session {
    fn new(record: ConversationSession, window: WorkingWindow) -> Self {
        Self {
            id: record.id.clone(),
            last_activity: RwLock::new(record.started_at),
            last_turn: RwLock::new(None),
            history_floor: RwLock::new(None),
            record: RwLock::new(record),
            window,
            request_lock: Mutex::new(()),
        }
    }

    pub fn touch(&self, now: DateTime<Utc>) {
        *self.last_activity.write() = now;
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        *self.last_activity.read()
    }

    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        match chrono::Duration::from_std(ttl) {
            Ok(ttl) => now - self.last_activity() > ttl,
            Err(_) => false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.record.read().active
    }

    pub fn record(&self) -> ConversationSession {
        self.record.read().clone()
    }

    pub fn owner(&self) -> Option<String> {
        self.record.read().owner.clone()
    }

    /// Ownerless sessions accept any caller
    fn is_owned_by(&self, owner: Option<&str>) -> bool {
        match self.record.read().owner.as_deref() {
            None => true,
            Some(expected) => owner == Some(expected),
        }
    }

    pub fn window(&self) -> &WorkingWindow {
        &self.window
    }

    /// Serialize requests within this session
    pub async fn lock_requests(&self) -> MutexGuard<'_, ()> {
        self.request_lock.lock().await
    }

    /// Drop the working window and hide earlier turns from history
    fn clear(&self) {
        self.window.clear();
        *self.history_floor.write() = *self.last_turn.read();
    }

    /// Turns recorded since the last reset
    fn since_reset(&self, turns: Vec<ConversationTurn>) -> Option<Vec<ConversationTurn>> {
        let floor = *self.history_floor.read();
        match floor {
            None => Some(turns),
            Some(floor) => {
                let position = turns.iter().position(|t| t.id == floor)?;
                Some(turns.into_iter().skip(position + 1).collect())
            }
        }
    }

    fn end(&self, at: DateTime<Utc>) -> ConversationSession {
        let mut record = self.record.write();
        record.end(at);
        record.clone()
    }
}

/// Session manager
pub struct SessionManager {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    /// Expired id -> the session that replaced it
    replacements: RwLock<HashMap<String, String>>,
    repository: Arc<dyn SessionRepository>,
    clock: Arc<dyn Clock>,
    options: SessionOptions,
    system_context: String,
}

impl SessionManager {
    pub fn new(
        repository: Arc<dyn SessionRepository>,
        clock: Arc<dyn Clock>,
        options: SessionOptions,
        system_context: impl Into<String>,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            replacements: RwLock::new(HashMap::new()),
            repository,
            clock,
            options,
            system_context: system_context.into(),
        }
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Start a background task that ends inactive sessions
    ///
    /// Returns a shutdown sender that stops the task.
    pub fn start_cleanup_task(self: &Arc<Self>) -> watch::Sender<bool> {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let manager = Arc::clone(self);
        let interval = manager.options.cleanup_interval;

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(interval);
            interval_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        let removed = manager.cleanup_expired().await;
                        if removed > 0 {
                            tracing::info!(
                                "Session cleanup: removed {} expired sessions ({} remaining)",
                                removed,
                                manager.count()
                            );
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            tracing::info!("Session cleanup task shutting down");
                            break;
                        }
                    }
                }
            }
        });

        shutdown_tx
    }

    /// Create a new session
    ///
    /// At capacity, expired sessions are evicted first, then the least
    /// recently active one.
    pub async fn create(&self, owner: Option<String>) -> Arc<Session> {
        let now = self.clock.now();
        let (session, evicted) = {
            let mut sessions = self.sessions.write();
            self.insert_new(&mut sessions, owner, now)
        };

        for old in evicted {
            self.persist_session(&old.end(now)).await;
        }
        self.persist_session(&session.record()).await;

        tracing::info!(session_id = %session.id, "Created session");
        session
    }

    /// Build and register a session, returning it with any evicted ones
    fn insert_new(
        &self,
        sessions: &mut HashMap<String, Arc<Session>>,
        owner: Option<String>,
        now: DateTime<Utc>,
    ) -> (Arc<Session>, Vec<Arc<Session>>) {
        let id = Uuid::new_v4().to_string();
        let record = ConversationSession::new(&id, owner, now);

        let window = WorkingWindow::new(WindowConfig {
            max_exchanges: self.options.window_exchanges,
        });
        window.push(ConversationTurn::new(&id, TurnRole::System, &self.system_context, now));

        let session = Arc::new(Session::new(record, window));

        let mut evicted = Vec::new();
        if sessions.len() >= self.options.max_sessions {
            evicted = self.take_expired(sessions, now);
            if sessions.len() >= self.options.max_sessions {
                let oldest = sessions
                    .values()
                    .min_by_key(|s| s.last_activity())
                    .map(|s| s.id.clone());
                if let Some(session) = oldest.and_then(|id| sessions.remove(&id)) {
                    tracing::info!(session_id = %session.id, "Evicted least recently active session");
                    evicted.push(session);
                }
            }
        }
        sessions.insert(id, Arc::clone(&session));
        (session, evicted)
    }

    /// Live session that already replaced an expired id
    fn replacement_for(
        &self,
        sessions: &HashMap<String, Arc<Session>>,
        id: &str,
        owner: Option<&str>,
        now: DateTime<Utc>,
    ) -> Option<Arc<Session>> {
        let target = self.replacements.read().get(id).cloned()?;
        sessions
            .get(&target)
            .filter(|s| s.is_active() && !s.is_expired(now, self.options.inactivity_ttl))
            .filter(|s| s.is_owned_by(owner))
            .cloned()
    }

    /// Live, unexpired session by id
    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        let now = self.clock.now();
        self.sessions
            .read()
            .get(id)
            .filter(|s| s.is_active() && !s.is_expired(now, self.options.inactivity_ttl))
            .cloned()
    }

    /// Session for the presented id, or a new one when the id is missing,
    /// unknown, expired or owned by someone else
    ///
    /// The lookup and the replacement of a stale id happen under one
    /// write lock, so concurrent callers presenting the same stale id
    /// share a single replacement.
    pub async fn resolve(&self, id: Option<&str>, owner: Option<String>) -> Arc<Session> {
        let Some(id) = id else {
            return self.create(owner).await;
        };

        let now = self.clock.now();
        let ttl = self.options.inactivity_ttl;
        let (session, created, ended, evicted) = {
            let mut sessions = self.sessions.write();
            match sessions.get(id).cloned() {
                Some(session) if !session.is_owned_by(owner.as_deref()) => {
                    tracing::warn!(session_id = %id, "Presented session belongs to another owner");
                    let (session, evicted) = self.insert_new(&mut sessions, owner, now);
                    (session, true, None, evicted)
                }
                Some(session) if session.is_active() && !session.is_expired(now, ttl) => {
                    session.touch(now);
                    (session, false, None, Vec::new())
                }
                Some(stale) => {
                    sessions.remove(id);
                    // the stale session names its replacement while the lock is held
                    let (session, evicted) = self.insert_new(&mut sessions, owner, now);
                    self.replacements.write().insert(id.to_string(), session.id.clone());
                    (session, true, Some(stale), evicted)
                }
                None => match self.replacement_for(&sessions, id, owner.as_deref(), now) {
                    Some(session) => {
                        session.touch(now);
                        (session, false, None, Vec::new())
                    }
                    None => {
                        let (session, evicted) = self.insert_new(&mut sessions, owner, now);
                        (session, true, None, evicted)
                    }
                },
            }
        };

        if let Some(stale) = ended {
            self.persist_session(&stale.end(now)).await;
            tracing::debug!(session_id = %id, "Presented session is expired");
        }
        for old in evicted {
            self.persist_session(&old.end(now)).await;
        }
        if created {
            self.persist_session(&session.record()).await;
            tracing::info!(session_id = %session.id, "Created session");
        }
        session
    }

    /// Record a turn in the session's window and the repository
    pub async fn record_turn(&self, session: &Session, turn: ConversationTurn) {
        session.touch(self.clock.now());
        session.window().push(turn.clone());
        *session.last_turn.write() = Some(turn.id);
        if let Err(e) = self.repository.append(&turn).await {
            tracing::warn!(session_id = %session.id, error = %e, "Failed to persist turn");
        }
    }

    pub async fn append(&self, session_id: &str, turn: ConversationTurn) -> Result<(), AssistantError> {
        let session = self
            .get(session_id)
            .ok_or_else(|| AssistantError::Session(format!("Unknown session: {}", session_id)))?;
        self.record_turn(&session, turn).await;
        Ok(())
    }

    /// Up to `limit` most recent turns, most recent last
    ///
    /// The repository holds every turn, so it answers first. A live
    /// session falls back to its working window when the repository
    /// cannot.
    pub async fn history(
        &self,
        session_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<ConversationTurn>, AssistantError> {
        let limit = limit.unwrap_or(self.options.history_limit);
        let live = self.sessions.read().get(session_id).cloned();

        let stored = match self.repository.fetch_by_id(session_id).await {
            Ok(stored) => stored.map(|s| s.turns),
            Err(e) => {
                tracing::warn!(session_id = %session_id, error = %e, "Failed to load history");
                if live.is_none() {
                    return Err(AssistantError::Session(e.to_string()));
                }
                None
            }
        };

        let turns = match (stored, &live) {
            (Some(turns), Some(session)) => session.since_reset(turns),
            (Some(turns), None) => Some(turns),
            (None, _) => None,
        };

        match (turns, live) {
            (Some(turns), _) => {
                let turns: Vec<ConversationTurn> = turns
                    .into_iter()
                    .filter(|t| t.role != TurnRole::System)
                    .collect();
                let skip = turns.len().saturating_sub(limit);
                Ok(turns.into_iter().skip(skip).collect())
            }
            (None, Some(session)) => Ok(session.window().recent(limit)),
            (None, None) => Err(AssistantError::Session(format!("Unknown session: {}", session_id))),
        }
    }

    /// Clear a live session the caller owns, keeping its id; any other
    /// id resolves as usual
    pub async fn reset(&self, session_id: Option<&str>, owner: Option<String>) -> Arc<Session> {
        let live = session_id
            .and_then(|id| self.get(id))
            .filter(|s| s.is_owned_by(owner.as_deref()));
        if let Some(session) = live {
            session.clear();
            session.touch(self.clock.now());
            tracing::info!(session_id = %session.id, "Reset session");
            return session;
        }
        self.resolve(session_id, owner).await
    }

    /// End a session explicitly
    pub async fn end(&self, session_id: &str) -> bool {
        let removed = {
            let mut sessions = self.sessions.write();
            let removed = sessions.remove(session_id);
            self.prune_replacements(&sessions);
            removed
        };
        match removed {
            Some(session) => {
                let record = session.end(self.clock.now());
                self.persist_session(&record).await;
                tracing::info!(session_id = %session_id, "Ended session");
                true
            }
            None => false,
        }
    }

    /// End every inactive session, returning how many were removed
    pub async fn cleanup_expired(&self) -> usize {
        let now = self.clock.now();
        let expired = {
            let mut sessions = self.sessions.write();
            self.take_expired(&mut sessions, now)
        };

        for session in &expired {
            self.persist_session(&session.end(now)).await;
        }
        expired.len()
    }

    fn take_expired(
        &self,
        sessions: &mut HashMap<String, Arc<Session>>,
        now: DateTime<Utc>,
    ) -> Vec<Arc<Session>> {
        let ttl = self.options.inactivity_ttl;
        let expired: Vec<String> = sessions
            .iter()
            .filter(|(_, s)| s.is_expired(now, ttl))
            .map(|(id, _)| id.clone())
            .collect();

        let removed = expired
            .into_iter()
            .filter_map(|id| {
                let session = sessions.remove(&id)?;
                tracing::info!(session_id = %id, "Expired session");
                Some(session)
            })
            .collect();
        self.prune_replacements(sessions);
        removed
    }

    fn prune_replacements(&self, sessions: &HashMap<String, Arc<Session>>) {
        self.replacements
            .write()
            .retain(|_, target| sessions.contains_key(target));
    }

    async fn persist_session(&self, record: &ConversationSession) {
        if let Err(e) = self.repository.create(record).await {
            tracing::warn!(session_id = %record.id, error = %e, "Failed to persist session");
        }
    }

    pub fn count(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn list(&self) -> Vec<String> {
        self.sessions.read().keys().cloned().collect()
    }
}
