//! Response cache configuration types.

use std::time::Duration;

use serde::Deserialize;

/// Cache store discriminator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheType {
    #[default]
    Memory,
    Redis,
}

/// Cache configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    #[serde(rename = "type")]
    pub cache_type: CacheType,
    /// Redis connection URL.
    pub url: String,
    /// Namespace prepended to every Redis key.
    pub key_prefix: String,
    /// Entry lifetime in seconds. 0 disables expiry.
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_type: CacheType::Memory,
            url: "redis://localhost:6379".to_string(),
            key_prefix: "folio".to_string(),
            ttl_secs: 300,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Option<Duration> {
        (self.ttl_secs > 0).then(|| Duration::from_secs(self.ttl_secs))
    }
}
