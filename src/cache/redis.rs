//! Redis cache store.
//!
//! Every key is stored as `{key_prefix}:{key}`, so listing and invalidation
//! never touch keys owned by other applications sharing the instance.

use std::time::Duration;

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use tracing::{debug, info};

use super::{CacheStore, Result};

/// Redis implementation of CacheStore.
pub struct RedisCache {
    conn: ConnectionManager,
    key_prefix: String,
}

impl RedisCache {
    /// Create a new Redis cache.
    ///
    /// # Arguments
    /// * `url` - Redis connection URL (e.g., redis://localhost:6379)
    /// * `key_prefix` - Namespace for all keys (default: "folio")
    pub async fn new(url: &str, key_prefix: Option<&str>) -> Result<Self> {
        let client = Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;

        info!(url = %url, "Connected to Redis for cache");

        Ok(Self {
            conn,
            key_prefix: key_prefix.unwrap_or("folio").to_string(),
        })
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}:{}", self.key_prefix, key)
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn keys(&self) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        let pattern = format!("{}:*", self.key_prefix);
        let namespace = format!("{}:", self.key_prefix);

        // SCAN instead of KEYS: does not block the server on large keyspaces
        let mut cursor = 0u64;
        let mut keys: Vec<String> = Vec::new();

        loop {
            let (next_cursor, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await?;

            keys.extend(
                batch
                    .into_iter()
                    .filter_map(|k| k.strip_prefix(&namespace).map(str::to_string)),
            );
            cursor = next_cursor;

            if cursor == 0 {
                break;
            }
        }

        // SCAN may return a key more than once
        keys.sort();
        keys.dedup();

        debug!(count = keys.len(), "Listed cache keys from Redis");
        Ok(keys)
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(self.namespaced(key)).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.conn.clone();
        let key = self.namespaced(key);

        match ttl {
            Some(ttl) => {
                let _: () = redis::cmd("SET")
                    .arg(&key)
                    .arg(value)
                    .arg("EX")
                    .arg(ttl.as_secs().max(1))
                    .query_async(&mut conn)
                    .await?;
            }
            None => {
                let _: () = conn.set(&key, value).await?;
            }
        }

        Ok(())
    }

    async fn del(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(self.namespaced(key)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{invalidate, patterns};

    // Integration tests require Redis running
    // Run with: cargo test --features redis -- --ignored

    #[tokio::test]
    #[ignore]
    async fn test_redis_cache_invalidation() {
        let prefix = format!("folio-test-{}", uuid::Uuid::new_v4());
        let cache = RedisCache::new("redis://localhost:6379", Some(&prefix))
            .await
            .expect("Failed to connect to Redis");

        for key in ["user:1", "user:2", "session:1"] {
            cache
                .set(key, "v".to_string(), Some(Duration::from_secs(60)))
                .await
                .unwrap();
        }

        invalidate(&cache, &patterns(&["user:*"])).await.unwrap();

        let mut keys = cache.keys().await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["session:1".to_string()]);

        cache.del("session:1").await.unwrap();
        assert!(cache.get("session:1").await.unwrap().is_none());
    }
}
