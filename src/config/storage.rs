//! Storage configuration types.

use serde::{Deserialize, Serialize};

use crate::backend::BackendDirective;

/// Store implementation discriminator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    /// In-process store; nothing survives a restart.
    #[default]
    Memory,
    Dynamo,
    Mongodb,
}

/// Storage configuration.
///
/// Two slots, one per [`BackendDirective`]. Each slot names the store
/// implementation that serves it.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directive used when a request does not pick one.
    pub default_backend: BackendDirective,
    /// Store serving `PRIMARY_KV`.
    pub kv: StorageType,
    /// Store serving `PRIMARY_ORM`.
    pub orm: StorageType,
    /// DynamoDB-specific configuration.
    pub dynamo: DynamoConfig,
    /// MongoDB-specific configuration.
    pub mongodb: MongodbConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            default_backend: BackendDirective::PrimaryKv,
            kv: StorageType::Dynamo,
            orm: StorageType::Mongodb,
            dynamo: DynamoConfig::default(),
            mongodb: MongodbConfig::default(),
        }
    }
}

impl StorageConfig {
    /// Both slots served from memory.
    pub fn in_memory() -> Self {
        Self {
            kv: StorageType::Memory,
            orm: StorageType::Memory,
            ..Self::default()
        }
    }

    /// Store type serving a directive.
    pub fn store_for(&self, directive: BackendDirective) -> StorageType {
        match directive {
            BackendDirective::PrimaryKv => self.kv,
            BackendDirective::PrimaryOrm => self.orm,
        }
    }
}

/// DynamoDB-specific configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DynamoConfig {
    /// Posts table name.
    pub table: String,
    /// Endpoint override (DynamoDB Local). `None` uses the AWS default chain.
    pub endpoint: Option<String>,
    /// Region override.
    pub region: Option<String>,
}

impl Default for DynamoConfig {
    fn default() -> Self {
        Self {
            table: "posts".to_string(),
            endpoint: None,
            region: None,
        }
    }
}

/// MongoDB-specific configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MongodbConfig {
    /// MongoDB connection URI.
    pub uri: String,
    /// Database name.
    pub database: String,
}

impl Default for MongodbConfig {
    fn default() -> Self {
        Self {
            uri: "mongodb://localhost:27017".to_string(),
            database: "folio".to_string(),
        }
    }
}
