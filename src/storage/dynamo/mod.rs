//! DynamoDB PostStore implementation.
//!
//! Table schema:
//! - PK: `id` (String)
//! - every other post field as a top-level attribute, via `serde_dynamo`

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::error::{DisplayErrorContext, SdkError};
use aws_sdk_dynamodb::types::{AttributeValue, ReturnConsumedCapacity};
use aws_sdk_dynamodb::Client;
use serde_dynamo::aws_sdk_dynamodb_1::{from_item, from_items, to_item};
use tracing::{debug, info};

use super::{id_last_key, start_after, PostStore, Result, StorageError, ID_ATTRIBUTE};
use crate::config::DynamoConfig;
use crate::model::Post;
use crate::pagination::token::{last_key_from_dynamo, last_key_to_dynamo};
use crate::pagination::{PageRequest, RawQueryOutput};

/// DynamoDB implementation of PostStore.
pub struct DynamoPostStore {
    client: Client,
    table_name: String,
}

impl DynamoPostStore {
    /// Create a store over an existing client.
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }

    /// Connect using the AWS default chain, honoring region and endpoint
    /// overrides. An endpoint override targets DynamoDB Local.
    pub async fn from_config(config: &DynamoConfig) -> Result<Self> {
        let mut config_loader = aws_config::defaults(aws_config::BehaviorVersion::latest());

        if let Some(ref region) = config.region {
            config_loader = config_loader.region(aws_config::Region::new(region.clone()));
        }

        let sdk_config = config_loader.load().await;

        let endpoint = config
            .endpoint
            .as_deref()
            .filter(|e| !e.trim().is_empty());

        let client = if let Some(endpoint) = endpoint {
            let dynamo_config = aws_sdk_dynamodb::config::Builder::from(&sdk_config)
                .endpoint_url(endpoint)
                .build();
            Client::from_conf(dynamo_config)
        } else {
            Client::new(&sdk_config)
        };

        info!(
            table = %config.table,
            endpoint = ?endpoint,
            "Connected to DynamoDB for posts"
        );

        Ok(Self::new(client, &config.table))
    }

    fn key(id: &str) -> AttributeValue {
        AttributeValue::S(id.to_string())
    }

    /// `ExclusiveStartKey` for a page. Tokens not keyed by a string id are
    /// rejected here, before reaching DynamoDB.
    fn exclusive_start_key(
        page: &PageRequest,
    ) -> Result<Option<HashMap<String, AttributeValue>>> {
        Ok(start_after(page)?.map(|id| last_key_to_dynamo(id_last_key(&id))))
    }
}

fn dynamo_error<E, R>(operation: &str, err: SdkError<E, R>) -> StorageError
where
    E: std::error::Error + 'static,
    R: std::fmt::Debug,
{
    StorageError::Dynamo(format!(
        "{} failed: {}",
        operation,
        DisplayErrorContext(&err)
    ))
}

#[async_trait]
impl PostStore for DynamoPostStore {
    async fn list(&self, page: &PageRequest) -> Result<RawQueryOutput<Post>> {
        let exclusive_start_key = Self::exclusive_start_key(page)?;

        let output = self
            .client
            .scan()
            .table_name(&self.table_name)
            .limit(page.limit as i32)
            .set_exclusive_start_key(exclusive_start_key)
            .consistent_read(false)
            .return_consumed_capacity(ReturnConsumedCapacity::Total)
            .send()
            .await
            .map_err(|e| dynamo_error("scan", e))?;

        let items: Vec<Post> = from_items(output.items.unwrap_or_default())?;
        let last_evaluated_key = output
            .last_evaluated_key
            .map(last_key_from_dynamo)
            .transpose()?;

        debug!(
            table = %self.table_name,
            count = output.count,
            scanned = output.scanned_count,
            more = last_evaluated_key.is_some(),
            "Scanned posts page"
        );

        Ok(RawQueryOutput {
            items: Some(items),
            last_evaluated_key,
            count: Some(i64::from(output.count)),
            scanned_count: Some(i64::from(output.scanned_count)),
            consumed_capacity: output.consumed_capacity.and_then(|c| c.capacity_units),
        })
    }

    async fn get(&self, id: &str) -> Result<Option<Post>> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(ID_ATTRIBUTE, Self::key(id))
            .send()
            .await
            .map_err(|e| dynamo_error("get_item", e))?;

        match output.item {
            Some(item) => Ok(Some(from_item(item)?)),
            None => Ok(None),
        }
    }

    async fn create(&self, post: Post) -> Result<Post> {
        post.validate()?;
        let item: HashMap<String, AttributeValue> = to_item(&post)?;

        let result = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .condition_expression("attribute_not_exists(#id)")
            .expression_attribute_names("#id", ID_ATTRIBUTE)
            .send()
            .await;

        match result {
            Ok(_) => {
                debug!(id = %post.id, "Created post in DynamoDB");
                Ok(post)
            }
            Err(e)
                if e
                    .as_service_error()
                    .is_some_and(|se| se.is_conditional_check_failed_exception()) =>
            {
                Err(StorageError::AlreadyExists(post.id))
            }
            Err(e) => Err(dynamo_error("put_item", e)),
        }
    }

    async fn update(&self, post: Post) -> Result<Post> {
        post.validate()?;
        let item: HashMap<String, AttributeValue> = to_item(&post)?;

        let result = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .condition_expression("attribute_exists(#id)")
            .expression_attribute_names("#id", ID_ATTRIBUTE)
            .send()
            .await;

        match result {
            Ok(_) => {
                debug!(id = %post.id, "Updated post in DynamoDB");
                Ok(post)
            }
            Err(e)
                if e
                    .as_service_error()
                    .is_some_and(|se| se.is_conditional_check_failed_exception()) =>
            {
                Err(StorageError::NotFound(post.id))
            }
            Err(e) => Err(dynamo_error("put_item", e)),
        }
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let result = self
            .client
            .delete_item()
            .table_name(&self.table_name)
            .key(ID_ATTRIBUTE, Self::key(id))
            .condition_expression("attribute_exists(#id)")
            .expression_attribute_names("#id", ID_ATTRIBUTE)
            .send()
            .await;

        match result {
            Ok(_) => {
                debug!(id = %id, "Deleted post from DynamoDB");
                Ok(())
            }
            Err(e)
                if e
                    .as_service_error()
                    .is_some_and(|se| se.is_conditional_check_failed_exception()) =>
            {
                Err(StorageError::NotFound(id.to_string()))
            }
            Err(e) => Err(dynamo_error("delete_item", e)),
        }
    }
}
