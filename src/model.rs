//! Post model.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::{Result, StorageError};

/// Publication state of a post.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PostStatus {
    #[default]
    Draft,
    Published,
    Archived,
    Scheduled,
    Trash,
}

/// A stored post. Keyed by `id` in every store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub title: String,
    pub slug: String,
    /// Rich-text document, stored opaquely.
    #[serde(default)]
    pub content: serde_json::Value,
    pub author_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory_id: Option<String>,
    #[serde(default)]
    pub status: PostStatus,
    #[serde(default)]
    pub featured: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub views: i64,
    #[serde(default)]
    pub likes_count: i64,
    /// RFC 3339, UTC.
    pub created_at: String,
    /// RFC 3339, UTC.
    pub updated_at: String,
}

impl Post {
    /// Reject posts no store can key or list.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(StorageError::Invalid("id must not be empty".to_string()));
        }
        if self.title.trim().is_empty() {
            return Err(StorageError::Invalid("title must not be empty".to_string()));
        }
        if self.slug.is_empty() {
            return Err(StorageError::Invalid(
                "slug must contain at least one word character".to_string(),
            ));
        }
        if self.author_id.trim().is_empty() {
            return Err(StorageError::Invalid("authorId must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Create input.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewPost {
    pub title: String,
    /// Derived from the title when absent.
    pub slug: Option<String>,
    pub content: serde_json::Value,
    pub author_id: String,
    pub subcategory_id: Option<String>,
    pub status: PostStatus,
    pub featured: bool,
    pub excerpt: Option<String>,
    pub cover_image: Option<String>,
    pub tags: Vec<String>,
}

impl NewPost {
    /// Build a validated post with a fresh id and timestamps.
    pub fn into_post(self) -> Result<Post> {
        let slug = match self.slug.as_deref().map(str::trim) {
            Some(slug) if !slug.is_empty() => slugify(slug),
            _ => slugify(&self.title),
        };
        let now = timestamp_now();

        let post = Post {
            id: uuid::Uuid::new_v4().to_string(),
            title: self.title,
            slug,
            content: self.content,
            author_id: self.author_id,
            subcategory_id: self.subcategory_id,
            status: self.status,
            featured: self.featured,
            excerpt: self.excerpt,
            cover_image: self.cover_image,
            tags: self.tags,
            views: 0,
            likes_count: 0,
            created_at: now.clone(),
            updated_at: now,
        };
        post.validate()?;
        Ok(post)
    }
}

/// Partial update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PostPatch {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub content: Option<serde_json::Value>,
    pub subcategory_id: Option<String>,
    pub status: Option<PostStatus>,
    pub featured: Option<bool>,
    pub excerpt: Option<String>,
    pub cover_image: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl PostPatch {
    pub fn is_empty(&self) -> bool {
        *self == PostPatch::default()
    }

    /// Apply onto `post`, bumping `updated_at`.
    pub fn apply(self, mut post: Post) -> Result<Post> {
        if let Some(title) = self.title {
            post.title = title;
        }
        if let Some(slug) = self.slug {
            post.slug = slugify(&slug);
        }
        if let Some(content) = self.content {
            post.content = content;
        }
        if let Some(subcategory_id) = self.subcategory_id {
            post.subcategory_id = Some(subcategory_id);
        }
        if let Some(status) = self.status {
            post.status = status;
        }
        if let Some(featured) = self.featured {
            post.featured = featured;
        }
        if let Some(excerpt) = self.excerpt {
            post.excerpt = Some(excerpt);
        }
        if let Some(cover_image) = self.cover_image {
            post.cover_image = Some(cover_image);
        }
        if let Some(tags) = self.tags {
            post.tags = tags;
        }
        post.updated_at = timestamp_now();

        post.validate()?;
        Ok(post)
    }
}

/// URL slug for `text`.
///
/// Lowercases, turns whitespace runs into `-`, drops anything that is not an
/// ASCII word character or `-`, collapses repeated `-`, and trims `-` from
/// both ends.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());

    for c in text.chars().flat_map(char::to_lowercase) {
        let c = if c.is_whitespace() { '-' } else { c };
        let keep = c.is_ascii_alphanumeric() || c == '_' || c == '-';
        if !keep || (c == '-' && slug.ends_with('-')) {
            continue;
        }
        slug.push(c);
    }

    slug.trim_matches('-').to_string()
}

fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
