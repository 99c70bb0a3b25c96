//! Query Cache
//!
//! TTL store mapping (intent, slots) to a computed aggregation payload,
//! shared by every session.
//!
//! - Payloads are immutable `Arc<Value>` snapshots swapped in whole, so a
//!   reader sees either nothing or a complete payload
//! - Expiry is lazy: a stale entry reads as a miss and stays until
//!   `purge_expired` runs
//! - Concurrent misses on one key run a single computation; the other callers
//!   wait on a per-key gate and then read the stored result

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use arn_assistant_core::{Clock, Slots};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tokio::sync::{watch, Mutex};

struct CacheEntry {
    payload: Arc<Value>,
    created_at: DateTime<Utc>,
    ttl: Duration,
    hits: AtomicU64,
}

impl CacheEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now - self.created_at > self.ttl
    }
}

/// Cache counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Stored entries, stale ones included
    pub entries: usize,
    pub expired: usize,
    pub hits: u64,
    pub misses: u64,
    pub stores: u64,
}

/// Query cache
pub struct QueryCache {
    entries: DashMap<String, Arc<CacheEntry>>,
    in_flight: DashMap<String, Arc<Mutex<()>>>,
    clock: Arc<dyn Clock>,
    default_ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    stores: AtomicU64,
}

impl QueryCache {
    pub fn new(clock: Arc<dyn Clock>, default_ttl: StdDuration) -> Self {
        Self {
            entries: DashMap::new(),
            in_flight: DashMap::new(),
            clock,
            default_ttl: Duration::from_std(default_ttl).unwrap_or_else(|_| Duration::seconds(1800)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            stores: AtomicU64::new(0),
        }
    }

    /// Deterministic key for an intent and its slots
    ///
    /// Slots are hashed in name order, so insertion order never matters.
    pub fn key(intent: &str, slots: &Slots) -> String {
        let mut hasher = Sha256::new();
        hasher.update(intent.as_bytes());
        hasher.update(b"|");
        hasher.update(slots.canonical().as_bytes());
        format!("{}:{:x}", intent, hasher.finalize())
    }

    /// Fresh payload for the key, counting a hit or a miss
    pub fn get(&self, key: &str) -> Option<Arc<Value>> {
        let found = self.lookup(key);
        if found.is_none() {
            self.misses.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("arn_cache_misses_total").increment(1);
            tracing::debug!(cache_key = %key, "Cache miss");
        }
        found
    }

    fn lookup(&self, key: &str) -> Option<Arc<Value>> {
        // clone the Arc out so no shard lock is held by the caller
        let entry = self.entries.get(key).map(|e| Arc::clone(e.value()))?;
        if entry.is_expired(self.clock.now()) {
            return None;
        }

        entry.hits.fetch_add(1, Ordering::Relaxed);
        self.hits.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("arn_cache_hits_total").increment(1);
        tracing::debug!(cache_key = %key, "Cache hit");
        Some(Arc::clone(&entry.payload))
    }

    /// Store a payload, replacing any previous entry atomically
    pub fn set(&self, key: &str, payload: Value, ttl: Option<StdDuration>) -> Arc<Value> {
        let ttl = ttl
            .and_then(|t| Duration::from_std(t).ok())
            .unwrap_or(self.default_ttl);
        let payload = Arc::new(payload);

        self.entries.insert(
            key.to_string(),
            Arc::new(CacheEntry {
                payload: Arc::clone(&payload),
                created_at: self.clock.now(),
                ttl,
                hits: AtomicU64::new(0),
            }),
        );
        self.stores.fetch_add(1, Ordering::Relaxed);
        payload
    }

    /// Read the key, or compute and store it with at most one computation
    /// in flight per key
    ///
    /// Failed computations are not stored.
    pub async fn get_or_try_compute<F, Fut, E>(&self, key: &str, compute: F) -> Result<Arc<Value>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, E>>,
    {
        if let Some(payload) = self.get(key) {
            return Ok(payload);
        }

        let gate = self
            .in_flight
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone();

        let result = {
            let _guard = gate.lock().await;
            match self.lookup(key) {
                // another caller finished while we waited
                Some(payload) => Ok(payload),
                None => compute().await.map(|value| self.set(key, value, None)),
            }
        };

        drop(gate);
        self.in_flight
            .remove_if(key, |_, gate| Arc::strong_count(gate) == 1);

        result
    }

    /// Hit count of a stored entry
    pub fn entry_hits(&self, key: &str) -> Option<u64> {
        self.entries
            .get(key)
            .map(|e| e.hits.load(Ordering::Relaxed))
    }

    pub fn invalidate(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Delete stale entries, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now();
        let expired = self
            .entries
            .iter()
            .filter(|e| e.value().is_expired(now))
            .count();

        CacheStats {
            entries: self.entries.len(),
            expired,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stores: self.stores.load(Ordering::Relaxed),
        }
    }

    /// Start a background task that purges stale entries
    ///
    /// Send `true` on the returned channel to stop it.
    pub fn start_purge_task(self: &Arc<Self>, interval: StdDuration) -> watch::Sender<bool> {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let cache = Arc::clone(self);

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(interval);
            interval_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        let removed = cache.purge_expired();
                        if removed > 0 {
                            tracing::info!(
                                "Cache purge: removed {} expired entries ({} remaining)",
                                removed,
                                cache.len()
                            );
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            tracing::info!("Cache purge task shutting down");
                            break;
                        }
                    }
                }
            }
        });

        shutdown_tx
    }
}
