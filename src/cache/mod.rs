//! Response cache and pattern-based invalidation.
//!
//! Services cache read results under structured keys (`posts:list:...`) and,
//! after a successful mutation, delete every key matching their patterns.

use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::config::{CacheConfig, CacheType};

pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;

pub use memory::InMemoryCache;
#[cfg(feature = "redis")]
pub use self::redis::RedisCache;

/// Cache errors.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[cfg(feature = "redis")]
    #[error("Redis error: {0}")]
    Redis(#[from] ::redis::RedisError),

    #[error("Cache backend error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, CacheError>;

/// Key-value cache handle.
///
/// Implementations:
/// - `InMemoryCache`: process-local map with expiry
/// - `RedisCache`: Redis, namespaced under a key prefix
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// List every live key.
    async fn keys(&self) -> Result<Vec<String>>;

    /// Fetch a value.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store a value, replacing any previous one. `None` never expires.
    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<()>;

    /// Delete a key. Deleting a missing key succeeds.
    async fn del(&self, key: &str) -> Result<()>;
}

/// Cache key pattern.
///
/// A single trailing `*` makes a prefix pattern. Any other `*` is literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CachePattern {
    Exact(String),
    Prefix(String),
}

impl CachePattern {
    pub fn parse(pattern: &str) -> Self {
        match pattern.strip_suffix('*') {
            Some(prefix) => CachePattern::Prefix(prefix.to_string()),
            None => CachePattern::Exact(pattern.to_string()),
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, CachePattern::Prefix(_))
    }

    pub fn matches(&self, key: &str) -> bool {
        match self {
            CachePattern::Exact(exact) => key == exact,
            CachePattern::Prefix(prefix) => key.starts_with(prefix.as_str()),
        }
    }
}

impl From<&str> for CachePattern {
    fn from(pattern: &str) -> Self {
        CachePattern::parse(pattern)
    }
}

impl fmt::Display for CachePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CachePattern::Exact(exact) => f.write_str(exact),
            CachePattern::Prefix(prefix) => write!(f, "{}*", prefix),
        }
    }
}

/// Parse a list of pattern strings.
pub fn patterns(raw: &[&str]) -> Vec<CachePattern> {
    raw.iter().map(|p| CachePattern::parse(p)).collect()
}

/// Delete every cache key matching any of `patterns`.
///
/// Keys are listed once, and only if a wildcard pattern is present. Exact
/// patterns are deleted without an existence check. Deletions run
/// concurrently and all of them are attempted: a failed delete is logged and
/// does not stop the rest. Only a failure to list keys is returned.
///
/// Listing and deleting are not atomic; a key written after the listing
/// survives.
pub async fn invalidate(cache: &dyn CacheStore, patterns: &[CachePattern]) -> Result<()> {
    if patterns.is_empty() {
        return Ok(());
    }

    let mut targets: BTreeSet<String> = patterns
        .iter()
        .filter_map(|p| match p {
            CachePattern::Exact(key) => Some(key.clone()),
            CachePattern::Prefix(_) => None,
        })
        .collect();

    if patterns.iter().any(CachePattern::is_wildcard) {
        let live = cache.keys().await?;
        targets.extend(
            live.into_iter()
                .filter(|key| patterns.iter().any(|p| p.is_wildcard() && p.matches(key))),
        );
    }

    let results = join_all(
        targets
            .iter()
            .map(|key| async move { (key, cache.del(key).await) }),
    )
    .await;

    let mut failed = 0usize;
    for (key, result) in results {
        if let Err(e) = result {
            failed += 1;
            warn!(key = %key, error = %e, "Failed to delete cache key");
        }
    }

    debug!(
        patterns = ?patterns.iter().map(ToString::to_string).collect::<Vec<_>>(),
        deleted = targets.len() - failed,
        failed = failed,
        "Cache invalidated"
    );

    Ok(())
}

/// Run a mutation, then invalidate `patterns` if it succeeded.
///
/// The mutation's result is returned unchanged. A failed key listing is
/// logged: the mutation already happened and must not be reported as failed.
pub async fn invalidate_after<T, E, Fut>(
    cache: &dyn CacheStore,
    patterns: &[CachePattern],
    op: Fut,
) -> std::result::Result<T, E>
where
    Fut: Future<Output = std::result::Result<T, E>>,
{
    let value = op.await?;

    if let Err(e) = invalidate(cache, patterns).await {
        warn!(error = %e, "Cache invalidation skipped: could not list keys");
    }

    Ok(value)
}

/// Initialize the cache store based on configuration.
pub async fn init_cache(config: &CacheConfig) -> Result<Arc<dyn CacheStore>> {
    match config.cache_type {
        CacheType::Memory => {
            info!("Cache: in-memory");
            Ok(Arc::new(InMemoryCache::new()))
        }
        #[cfg(feature = "redis")]
        CacheType::Redis => {
            info!(url = %config.url, "Cache: redis");
            Ok(Arc::new(
                RedisCache::new(&config.url, Some(&config.key_prefix)).await?,
            ))
        }
        #[cfg(not(feature = "redis"))]
        CacheType::Redis => Err(CacheError::Backend(
            "Redis cache requested but 'redis' feature is not enabled".to_string(),
        )),
    }
}
