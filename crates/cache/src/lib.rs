//! Narrow key-value cache with per-entry expiry.
//!
//! Writers always win: there is no compare-and-swap and nothing invalidates
//! an entry before its TTL runs out. Callers that cache derived data accept
//! staleness up to that TTL.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

/// Cache capability handed to request handlers.
#[async_trait]
pub trait KeyValueCache: Send + Sync {
    /// Fetch a live entry.
    async fn get(&self, key: &str) -> Option<String>;

    /// Store `value` under `key` for `ttl`, replacing any previous entry.
    async fn set(&self, key: &str, value: String, ttl: Duration);
}

#[derive(Debug)]
struct Entry {
    value: String,
    /// `None` when the TTL reaches past what `Instant` can represent.
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |deadline| deadline > now)
    }
}

/// Process-local backend. Expired entries are evicted lazily on read.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<String, Entry>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl KeyValueCache for MemoryCache {
    async fn get(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if entry.is_live(now) {
                return Some(entry.value.clone());
            }
        }
        // Guard is dropped above; removing while holding it would deadlock.
        if self
            .entries
            .remove_if(key, |_, entry| !entry.is_live(now))
            .is_some()
        {
            tracing::trace!(key, "evicted expired cache entry");
        }
        None
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) {
        let expires_at = Instant::now().checked_add(ttl);
        self.entries
            .insert(key.to_string(), Entry { value, expires_at });
    }
}
