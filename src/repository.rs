use std::collections::HashMap;
use aws_sdk_dynamodb::{ Client, types::AttributeValue };
use async_trait::async_trait;

use crate::AppError;

#[async_trait]
pub trait DynamoDbEntity: Clone + Send + Sync {
    fn table_name() -> &'static str;
    fn from_item(item: &HashMap<String, AttributeValue>) -> Option<Self>;
    fn to_item(&self) -> HashMap<String, AttributeValue>;
    fn primary_key(&self) -> String;
}

#[derive(Clone)]
pub struct Repository {
    client: Client,
}

impl Repository {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn get<T: DynamoDbEntity>(&self, id: String) -> Result<Option<T>, AppError> {
        let mut key = HashMap::new();
        key.insert("id".to_string(), AttributeValue::S(id));

        let response = self.client
            .get_item()
            .table_name(T::table_name())
            .set_key(Some(key))
            .send().await
            .map_err(|e| AppError::DatabaseError(format!("Failed to get item: {}", e)))?;

        Ok(response.item.and_then(|item| T::from_item(&item)))
    }

    pub async fn create<T: DynamoDbEntity>(&self, entity: T) -> Result<T, AppError> {
        let item = entity.to_item();

        self.client
            .put_item()
            .table_name(T::table_name())
            .set_item(Some(item))
            .condition_expression("attribute_not_exists(id)")
            .send().await
            .map_err(|e| {
                if e.to_string().contains("ConditionalCheckFailed") {
                    AppError::ValidationError("Entity with this ID already exists".to_string())
                } else {
                    AppError::DatabaseError(format!("Failed to create entity: {}", e))
                }
            })?;

        Ok(entity)
    }

    pub async fn update<T: DynamoDbEntity>(&self, entity: T) -> Result<T, AppError> {
        let item = entity.to_item();

        self.client
            .put_item()
            .table_name(T::table_name())
            .set_item(Some(item))
            .condition_expression("attribute_exists(id)")
            .send().await
            .map_err(|e| AppError::DatabaseError(format!("Failed to update entity: {}", e)))?;

        Ok(entity)
    }

    /// Unconditional write. Used where the caller owns idempotency by key,
    /// e.g. schedule upserts and history saves.
    pub async fn put<T: DynamoDbEntity>(&self, entity: T) -> Result<T, AppError> {
        let item = entity.to_item();

        self.client
            .put_item()
            .table_name(T::table_name())
            .set_item(Some(item))
            .send().await
            .map_err(|e| AppError::DatabaseError(format!("Failed to put entity: {}", e)))?;

        Ok(entity)
    }

    pub async fn delete<T: DynamoDbEntity>(&self, id: String) -> Result<bool, AppError> {
        let result = self.client
            .delete_item()
            .table_name(T::table_name())
            .key("id", AttributeValue::S(id))
            .condition_expression("attribute_exists(id)")
            .send().await;

        match result {
            Ok(_) => Ok(true),
            Err(e) if e.to_string().contains("ConditionalCheckFailed") => Ok(false),
            Err(e) => Err(AppError::DatabaseError(format!("Failed to delete entity: {}", e))),
        }
    }

    pub async fn list<T: DynamoDbEntity>(&self, limit: Option<i32>) -> Result<Vec<T>, AppError> {
        let mut scan = self.client.scan().table_name(T::table_name());

        if let Some(limit) = limit {
            scan = scan.limit(limit);
        }

        let response = scan
            .send().await
            .map_err(|e| AppError::DatabaseError(format!("Failed to scan table: {}", e)))?;

        let entities = response.items
            .unwrap_or_default()
            .iter()
            .filter_map(|item| T::from_item(item))
            .collect();

        Ok(entities)
    }

    /// Query a global secondary index by its hash attribute, following
    /// pagination to exhaustion.
    pub async fn query_index<T: DynamoDbEntity>(
        &self,
        index_name: &str,
        key_attribute: &str,
        key_value: String
    ) -> Result<Vec<T>, AppError> {
        let mut entities = Vec::new();
        let mut exclusive_start_key: Option<HashMap<String, AttributeValue>> = None;

        loop {
            let response = self.client
                .query()
                .table_name(T::table_name())
                .index_name(index_name)
                .key_condition_expression("#k = :v")
                .expression_attribute_names("#k", key_attribute)
                .expression_attribute_values(":v", AttributeValue::S(key_value.clone()))
                .set_exclusive_start_key(exclusive_start_key)
                .send().await
                .map_err(|e| {
                    AppError::DatabaseError(format!("Failed to query {}: {}", index_name, e))
                })?;

            entities.extend(response.items().iter().filter_map(|item| T::from_item(item)));

            exclusive_start_key = response.last_evaluated_key().cloned();
            if exclusive_start_key.is_none() {
                break;
            }
        }

        Ok(entities)
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}
