//! Mock post store for testing and in-memory deployments.

use std::collections::BTreeMap;
use std::ops::Bound;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{id_last_key, start_after, PostStore, Result, StorageError};
use crate::model::Post;
use crate::pagination::{PageRequest, RawQueryOutput};

/// In-memory post store, ordered by id.
#[derive(Default)]
pub struct MockPostStore {
    posts: RwLock<BTreeMap<String, Post>>,
    fail_on_read: RwLock<bool>,
    fail_on_write: RwLock<bool>,
}

impl MockPostStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_fail_on_read(&self, fail: bool) {
        *self.fail_on_read.write().await = fail;
    }

    pub async fn set_fail_on_write(&self, fail: bool) {
        *self.fail_on_write.write().await = fail;
    }

    pub async fn stored_count(&self) -> usize {
        self.posts.read().await.len()
    }

    pub async fn get_stored(&self, id: &str) -> Option<Post> {
        self.posts.read().await.get(id).cloned()
    }

    async fn check_read(&self) -> Result<()> {
        if *self.fail_on_read.read().await {
            return Err(StorageError::Unavailable("mock read failure".to_string()));
        }
        Ok(())
    }

    async fn check_write(&self) -> Result<()> {
        if *self.fail_on_write.read().await {
            return Err(StorageError::Unavailable("mock write failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl PostStore for MockPostStore {
    async fn list(&self, page: &PageRequest) -> Result<RawQueryOutput<Post>> {
        self.check_read().await?;
        let start = start_after(page)?;

        let posts = self.posts.read().await;
        let lower = match &start {
            Some(id) => Bound::Excluded(id.as_str()),
            None => Bound::Unbounded,
        };
        let mut remaining = posts
            .range::<str, _>((lower, Bound::Unbounded))
            .map(|(_, post)| post);

        let items: Vec<Post> = remaining
            .by_ref()
            .take(page.limit as usize)
            .cloned()
            .collect();
        let more = remaining.next().is_some();

        let count = items.len() as i64;
        let last_evaluated_key = match items.last() {
            Some(last) if more => Some(id_last_key(&last.id)),
            _ => None,
        };

        Ok(RawQueryOutput {
            items: Some(items),
            last_evaluated_key,
            count: Some(count),
            scanned_count: Some(count),
            consumed_capacity: None,
        })
    }

    async fn get(&self, id: &str) -> Result<Option<Post>> {
        self.check_read().await?;
        Ok(self.posts.read().await.get(id).cloned())
    }

    async fn create(&self, post: Post) -> Result<Post> {
        self.check_write().await?;
        post.validate()?;

        let mut posts = self.posts.write().await;
        if posts.contains_key(&post.id) {
            return Err(StorageError::AlreadyExists(post.id));
        }
        posts.insert(post.id.clone(), post.clone());
        Ok(post)
    }

    async fn update(&self, post: Post) -> Result<Post> {
        self.check_write().await?;
        post.validate()?;

        let mut posts = self.posts.write().await;
        match posts.get_mut(&post.id) {
            Some(existing) => {
                *existing = post.clone();
                Ok(post)
            }
            None => Err(StorageError::NotFound(post.id)),
        }
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.check_write().await?;

        match self.posts.write().await.remove(id) {
            Some(_) => Ok(()),
            None => Err(StorageError::NotFound(id.to_string())),
        }
    }
}
