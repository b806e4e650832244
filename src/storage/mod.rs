//! Post storage.
//!
//! One [`PostStore`] per backend directive. Every store pages the same way:
//! `list` returns a [`RawQueryOutput`] whose last-evaluated key is the id of
//! the last post on the page, or `None` on the final page.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::backend::BackendDirective;
use crate::config::{StorageConfig, StorageType};
use crate::model::Post;
use crate::pagination::{KeyAttribute, LastKey, PageRequest, PaginationError, RawQueryOutput};

pub mod mock;

#[cfg(feature = "dynamo")]
pub mod dynamo;

#[cfg(feature = "mongodb")]
pub mod mongodb;

pub use mock::MockPostStore;

#[cfg(feature = "dynamo")]
pub use dynamo::DynamoPostStore;

#[cfg(feature = "mongodb")]
pub use self::mongodb::MongoPostStore;

/// Attribute every store keys posts by.
pub const ID_ATTRIBUTE: &str = "id";

/// Storage errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Post not found: {0}")]
    NotFound(String),

    #[error("Post already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid post: {0}")]
    Invalid(String),

    #[error(transparent)]
    Pagination(#[from] PaginationError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage backend unavailable: {0}")]
    Unavailable(String),

    #[cfg(feature = "dynamo")]
    #[error("DynamoDB error: {0}")]
    Dynamo(String),

    #[cfg(feature = "dynamo")]
    #[error("DynamoDB item conversion error: {0}")]
    DynamoItem(#[from] serde_dynamo::Error),

    #[cfg(feature = "mongodb")]
    #[error("MongoDB error: {0}")]
    Mongo(#[from] ::mongodb::error::Error),

    #[cfg(feature = "mongodb")]
    #[error("BSON encode error: {0}")]
    BsonEncode(#[from] ::mongodb::bson::ser::Error),

    #[cfg(feature = "mongodb")]
    #[error("BSON decode error: {0}")]
    BsonDecode(#[from] ::mongodb::bson::de::Error),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Interface for post persistence.
///
/// Implementations:
/// - `MockPostStore`: in-memory
/// - `DynamoPostStore`: DynamoDB table keyed by `id`
/// - `MongoPostStore`: MongoDB collection with a unique `id` index
#[async_trait]
pub trait PostStore: Send + Sync {
    /// One page of posts in the store's scan order, resuming after the
    /// request's token.
    async fn list(&self, page: &PageRequest) -> Result<RawQueryOutput<Post>>;

    /// Fetch one post.
    async fn get(&self, id: &str) -> Result<Option<Post>>;

    /// Insert a new post. Fails with `AlreadyExists` if the id is taken.
    async fn create(&self, post: Post) -> Result<Post>;

    /// Replace an existing post. Fails with `NotFound` if absent.
    async fn update(&self, post: Post) -> Result<Post>;

    /// Delete a post. Fails with `NotFound` if absent.
    async fn delete(&self, id: &str) -> Result<()>;
}

/// Last key naming `id`, as a DynamoDB scan would return it.
pub fn id_last_key(id: &str) -> LastKey {
    LastKey::from([(ID_ATTRIBUTE.to_string(), KeyAttribute::S(id.to_string()))])
}

/// Id to resume after, from a page request's token.
pub fn start_after(page: &PageRequest) -> Result<Option<String>> {
    let Some(key) = page.start_key()? else {
        return Ok(None);
    };

    match key.get(ID_ATTRIBUTE).and_then(KeyAttribute::as_s) {
        Some(id) => Ok(Some(id.to_string())),
        None => Err(PaginationError::InvalidToken(format!(
            "token does not carry a string {:?} attribute",
            ID_ATTRIBUTE
        ))
        .into()),
    }
}

/// The store serving each backend directive.
#[derive(Clone)]
pub struct Backends {
    pub kv: Arc<dyn PostStore>,
    pub orm: Arc<dyn PostStore>,
}

impl Backends {
    pub fn new(kv: Arc<dyn PostStore>, orm: Arc<dyn PostStore>) -> Self {
        Self { kv, orm }
    }

    /// Two independent in-memory stores.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MockPostStore::new()), Arc::new(MockPostStore::new()))
    }

    pub fn select(&self, directive: BackendDirective) -> &Arc<dyn PostStore> {
        match directive {
            BackendDirective::PrimaryKv => &self.kv,
            BackendDirective::PrimaryOrm => &self.orm,
        }
    }
}

/// Initialize both backends based on configuration.
pub async fn init_backends(
    config: &StorageConfig,
) -> std::result::Result<Backends, Box<dyn std::error::Error>> {
    let kv = init_store(config, config.kv).await?;
    let orm = init_store(config, config.orm).await?;

    info!(
        kv = ?config.kv,
        orm = ?config.orm,
        default = %config.default_backend,
        "Storage backends ready"
    );

    Ok(Backends::new(kv, orm))
}

async fn init_store(
    config: &StorageConfig,
    store: StorageType,
) -> std::result::Result<Arc<dyn PostStore>, Box<dyn std::error::Error>> {
    match store {
        StorageType::Memory => {
            info!("Storage: in-memory");
            Ok(Arc::new(MockPostStore::new()))
        }
        #[cfg(feature = "dynamo")]
        StorageType::Dynamo => {
            info!(table = %config.dynamo.table, "Storage: dynamo");
            Ok(Arc::new(DynamoPostStore::from_config(&config.dynamo).await?))
        }
        #[cfg(not(feature = "dynamo"))]
        StorageType::Dynamo => {
            tracing::error!("DynamoDB storage requested but 'dynamo' feature is not enabled");
            Err("DynamoDB feature not enabled".into())
        }
        #[cfg(feature = "mongodb")]
        StorageType::Mongodb => {
            info!(database = %config.mongodb.database, "Storage: mongodb");
            let client = ::mongodb::Client::with_uri_str(&config.mongodb.uri).await?;
            Ok(Arc::new(
                MongoPostStore::new(&client, &config.mongodb.database).await?,
            ))
        }
        #[cfg(not(feature = "mongodb"))]
        StorageType::Mongodb => {
            tracing::error!("MongoDB storage requested but 'mongodb' feature is not enabled");
            Err("MongoDB feature not enabled".into())
        }
    }
}
