//! Post service.
//!
//! Routes each call to the store picked by the request's directive, serves
//! reads through the response cache, and clears cached post responses after
//! every successful write.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::backend::{BackendDirective, BackendError};
use crate::cache::{invalidate_after, patterns, CachePattern, CacheStore};
use crate::model::{NewPost, Post, PostPatch};
use crate::pagination::{map_paginated_result, PageRequest, PaginatedEnvelope, PaginationError};
use crate::storage::{Backends, PostStore, StorageError};

/// Every cached post response lives under this prefix.
const POSTS_PATTERN: &str = "posts:*";

/// Service errors.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Pagination(#[from] PaginationError),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

pub type Result<T> = std::result::Result<T, ServiceError>;

/// Cache key for one list page.
pub fn list_cache_key(directive: BackendDirective, page: &PageRequest) -> String {
    format!("posts:list:{}:{}", directive, page.cache_fragment())
}

/// Cache key for one post.
pub fn post_cache_key(directive: BackendDirective, id: &str) -> String {
    format!("posts:{}:{}", directive, id)
}

/// Post operations over the selected backend.
pub struct PostService {
    backends: Backends,
    cache: Arc<dyn CacheStore>,
    cache_ttl: Option<Duration>,
    invalidation: Vec<CachePattern>,
}

impl PostService {
    pub fn new(
        backends: Backends,
        cache: Arc<dyn CacheStore>,
        cache_ttl: Option<Duration>,
    ) -> Self {
        Self {
            backends,
            cache,
            cache_ttl,
            invalidation: patterns(&[POSTS_PATTERN]),
        }
    }

    pub fn backends(&self) -> &Backends {
        &self.backends
    }

    fn store(&self, directive: BackendDirective) -> &Arc<dyn PostStore> {
        self.backends.select(directive)
    }

    /// One page of posts.
    #[tracing::instrument(name = "posts.list", skip_all, fields(%directive, limit = page.limit))]
    pub async fn list(
        &self,
        directive: BackendDirective,
        page: &PageRequest,
    ) -> Result<PaginatedEnvelope<Post>> {
        let key = list_cache_key(directive, page);
        if let Some(cached) = self.cached(&key).await {
            return Ok(cached);
        }

        let raw = self.store(directive).list(page).await?;
        let envelope = map_paginated_result(raw, |post| post)?;

        self.remember(&key, &envelope).await;
        Ok(envelope)
    }

    /// One post, or `NotFound`.
    #[tracing::instrument(name = "posts.get", skip_all, fields(%directive, %id))]
    pub async fn get(&self, directive: BackendDirective, id: &str) -> Result<Post> {
        let key = post_cache_key(directive, id);
        if let Some(cached) = self.cached(&key).await {
            return Ok(cached);
        }

        let post = self
            .store(directive)
            .get(id)
            .await?
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;

        self.remember(&key, &post).await;
        Ok(post)
    }

    #[tracing::instrument(name = "posts.create", skip_all, fields(%directive))]
    pub async fn create(&self, directive: BackendDirective, input: NewPost) -> Result<Post> {
        let post = input.into_post()?;
        let store = self.store(directive);

        let created =
            invalidate_after(self.cache.as_ref(), &self.invalidation, store.create(post)).await?;

        info!(id = %created.id, slug = %created.slug, "Post created");
        Ok(created)
    }

    #[tracing::instrument(name = "posts.update", skip_all, fields(%directive, %id))]
    pub async fn update(
        &self,
        directive: BackendDirective,
        id: &str,
        patch: PostPatch,
    ) -> Result<Post> {
        let store = self.store(directive);

        let updated = invalidate_after(self.cache.as_ref(), &self.invalidation, async {
            let existing = store
                .get(id)
                .await?
                .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
            store.update(patch.apply(existing)?).await
        })
        .await?;

        info!(id = %updated.id, "Post updated");
        Ok(updated)
    }

    #[tracing::instrument(name = "posts.delete", skip_all, fields(%directive, %id))]
    pub async fn delete(&self, directive: BackendDirective, id: &str) -> Result<()> {
        let store = self.store(directive);

        invalidate_after(self.cache.as_ref(), &self.invalidation, store.delete(id)).await?;

        info!(id = %id, "Post deleted");
        Ok(())
    }

    /// Cached value, if present and readable. Cache faults fall through to
    /// the store.
    async fn cached<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.cache.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key = %key, "Cache miss");
                return None;
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Cache read failed");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                debug!(key = %key, "Cache hit");
                Some(value)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Discarding unreadable cache entry");
                None
            }
        }
    }

    async fn remember<T: Serialize>(&self, key: &str, value: &T) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to serialize cache entry");
                return;
            }
        };

        if let Err(e) = self.cache.set(key, raw, self.cache_ttl).await {
            warn!(key = %key, error = %e, "Cache write failed");
        }
    }
}

#[cfg(test)]
mod tests;
