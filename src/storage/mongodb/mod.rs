//! MongoDB PostStore implementation.
//!
//! Posts live in one collection with a unique index on `id`. Pages are
//! id-ordered: a page fetches one extra document to learn whether another
//! page follows, and only then hands out a continuation key.

use async_trait::async_trait;
use mongodb::bson::{doc, from_document, to_document, Document};
use mongodb::options::{FindOptions, IndexOptions};
use mongodb::{Client, Collection, Database, IndexModel};
use tracing::debug;

use super::{id_last_key, start_after, PostStore, Result, StorageError};
use crate::model::Post;
use crate::pagination::{PageRequest, RawQueryOutput};

/// Collection name.
const POSTS_COLLECTION: &str = "posts";

/// Server code for a unique index violation.
const DUPLICATE_KEY: i32 = 11000;

/// MongoDB implementation of PostStore.
pub struct MongoPostStore {
    database: Database,
    posts: Collection<Document>,
}

impl MongoPostStore {
    /// Create a new MongoDB post store.
    pub async fn new(client: &Client, database_name: &str) -> Result<Self> {
        let database = client.database(database_name);
        let posts = database.collection(POSTS_COLLECTION);

        let store = Self { database, posts };
        store.init().await?;

        Ok(store)
    }

    /// Initialize indexes.
    async fn init(&self) -> Result<()> {
        let index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        self.posts.create_index(index).await?;

        Ok(())
    }

    /// Get the database reference.
    pub fn database(&self) -> &Database {
        &self.database
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        *err.kind,
        mongodb::error::ErrorKind::Write(mongodb::error::WriteFailure::WriteError(ref write_err))
            if write_err.code == DUPLICATE_KEY
    )
}

#[async_trait]
impl PostStore for MongoPostStore {
    async fn list(&self, page: &PageRequest) -> Result<RawQueryOutput<Post>> {
        let filter = match start_after(page)? {
            Some(last_id) => doc! { "id": { "$gt": last_id } },
            None => doc! {},
        };
        let options = FindOptions::builder()
            .sort(doc! { "id": 1 })
            .limit(i64::from(page.limit) + 1)
            .projection(doc! { "_id": 0 })
            .build();

        let mut cursor = self.posts.find(filter).with_options(options).await?;

        let mut items = Vec::new();
        while cursor.advance().await? {
            let doc = cursor.deserialize_current()?;
            items.push(from_document::<Post>(doc)?);
        }

        let more = items.len() > page.limit as usize;
        items.truncate(page.limit as usize);

        let last_evaluated_key = match items.last() {
            Some(last) if more => Some(id_last_key(&last.id)),
            _ => None,
        };

        debug!(count = items.len(), more = more, "Listed posts page from MongoDB");

        let count = items.len() as i64;
        Ok(RawQueryOutput {
            items: Some(items),
            last_evaluated_key,
            count: Some(count),
            scanned_count: None,
            consumed_capacity: None,
        })
    }

    async fn get(&self, id: &str) -> Result<Option<Post>> {
        let found = self.posts.find_one(doc! { "id": id }).await?;

        match found {
            Some(doc) => Ok(Some(from_document(doc)?)),
            None => Ok(None),
        }
    }

    async fn create(&self, post: Post) -> Result<Post> {
        post.validate()?;
        let doc = to_document(&post)?;

        match self.posts.insert_one(doc).await {
            Ok(_) => Ok(post),
            Err(e) if is_duplicate_key(&e) => Err(StorageError::AlreadyExists(post.id)),
            Err(e) => Err(e.into()),
        }
    }

    async fn update(&self, post: Post) -> Result<Post> {
        post.validate()?;
        let doc = to_document(&post)?;

        let result = self
            .posts
            .replace_one(doc! { "id": &post.id }, doc)
            .await?;

        if result.matched_count == 0 {
            return Err(StorageError::NotFound(post.id));
        }
        Ok(post)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let result = self.posts.delete_one(doc! { "id": id }).await?;

        if result.deleted_count == 0 {
            return Err(StorageError::NotFound(id.to_string()));
        }
        Ok(())
    }
}
