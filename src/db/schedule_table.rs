//! Schedule entries table definition.
//!
//! The job id is the hash key, which makes schedule upserts last-writer-wins
//! and guarantees at most one pending entry per logical job. The `StateIndex`
//! backs the worker's pending scan.

use aws_sdk_dynamodb::{
    Client,
    operation::list_tables::ListTablesOutput,
    types::{
        AttributeDefinition,
        BillingMode,
        GlobalSecondaryIndex,
        KeySchemaElement,
        KeyType,
        Projection,
        ProjectionType,
        ScalarAttributeType,
    },
};
use tracing::info;

use crate::error::AppError;
use super::common::build;

pub async fn create_schedule_table(
    tables: &ListTablesOutput,
    client: &Client
) -> Result<(), AppError> {
    let table_name = "ScheduleEntries";

    if tables.table_names().contains(&table_name.to_string()) {
        info!("Table '{}' already exists", table_name);
        return Ok(());
    }

    let ad_id = build(
        AttributeDefinition::builder()
            .attribute_name("id")
            .attribute_type(ScalarAttributeType::S)
            .build(),
        "Failed to build id attribute definition"
    )?;

    let ad_state = build(
        AttributeDefinition::builder()
            .attribute_name("state")
            .attribute_type(ScalarAttributeType::S)
            .build(),
        "Failed to build state attribute definition"
    )?;

    let ks_id = build(
        KeySchemaElement::builder().attribute_name("id").key_type(KeyType::Hash).build(),
        "Failed to build id key schema"
    )?;

    let gsi1_pk = build(
        KeySchemaElement::builder().attribute_name("state").key_type(KeyType::Hash).build(),
        "Failed to build State GSI PK"
    )?;

    let gsi1 = build(
        GlobalSecondaryIndex::builder()
            .index_name("StateIndex")
            .key_schema(gsi1_pk)
            .projection(Projection::builder().projection_type(ProjectionType::All).build())
            .build(),
        "Failed to build StateIndex GSI"
    )?;

    let response = client
        .create_table()
        .table_name(table_name)
        .billing_mode(BillingMode::PayPerRequest)
        .attribute_definitions(ad_id)
        .attribute_definitions(ad_state)
        .key_schema(ks_id)
        .global_secondary_indexes(gsi1)
        .send().await
        .map_err(|e|
            AppError::DatabaseError(
                format!("Failed to create {} table: {:?}", table_name, e.to_string())
            )
        )?;

    info!("ScheduleEntries table created: {:?}", response.table_description().map(|t| t.table_name()));
    Ok(())
}
