//! In-memory cache store.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{CacheError, CacheStore, Result};

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// Process-local cache. Expired entries are invisible and dropped lazily.
#[derive(Default)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
    fail_on_keys: RwLock<bool>,
    fail_on_del: RwLock<HashSet<String>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `keys()` fail.
    pub async fn set_fail_on_keys(&self, fail: bool) {
        *self.fail_on_keys.write().await = fail;
    }

    /// Make `del(key)` fail for this key.
    pub async fn fail_delete_of(&self, key: &str) {
        self.fail_on_del.write().await.insert(key.to_string());
    }

    /// Live entry count.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|e| e.is_live(now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn contains(&self, key: &str) -> bool {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .get(key)
            .is_some_and(|e| e.is_live(now))
    }
}

#[async_trait]
impl CacheStore for InMemoryCache {
    async fn keys(&self) -> Result<Vec<String>> {
        if *self.fail_on_keys.read().await {
            return Err(CacheError::Backend("keys unavailable".to_string()));
        }
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, e| e.is_live(now));
        Ok(entries.keys().cloned().collect())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = Instant::now();
        Ok(self
            .entries
            .read()
            .await
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.value.clone()))
    }

    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<()> {
        // A TTL past the clock's range never expires
        let expires_at = ttl.and_then(|ttl| Instant::now().checked_add(ttl));
        self.entries
            .write()
            .await
            .insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<()> {
        if self.fail_on_del.read().await.contains(key) {
            return Err(CacheError::Backend(format!("delete refused for {}", key)));
        }
        self.entries.write().await.remove(key);
        Ok(())
    }
}
