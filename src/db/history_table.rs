//! Notification history table definition.
//!
//! The history collection is the durable truth for every planned, sent,
//! failed and read notification. Two secondary indexes back the read paths:
//! `PersonIndex` for the trainee-facing listing, and the sparse
//! `ScheduleIndex` for the open-schedule uniqueness lookup.

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

pub async fn create_history_table(
    tables: &ListTablesOutput,
    client: &Client
) -> Result<(), AppError> {
    let table_name = "NotificationHistory";

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

    let ad_person_id = build(
        AttributeDefinition::builder()
            .attribute_name("person_id")
            .attribute_type(ScalarAttributeType::S)
            .build(),
        "Failed to build person_id attribute definition"
    )?;

    let ad_schedule_key = build(
        AttributeDefinition::builder()
            .attribute_name("schedule_key")
            .attribute_type(ScalarAttributeType::S)
            .build(),
        "Failed to build schedule_key attribute definition"
    )?;

    let ad_status = build(
        AttributeDefinition::builder()
            .attribute_name("status")
            .attribute_type(ScalarAttributeType::S)
            .build(),
        "Failed to build status attribute definition"
    )?;

    let ks_id = build(
        KeySchemaElement::builder().attribute_name("id").key_type(KeyType::Hash).build(),
        "Failed to build id key schema"
    )?;

    // GSI 1: trainee-facing listing by person
    let gsi1_pk = build(
        KeySchemaElement::builder().attribute_name("person_id").key_type(KeyType::Hash).build(),
        "Failed to build Person GSI PK"
    )?;

    let gsi1 = build(
        GlobalSecondaryIndex::builder()
            .index_name("PersonIndex")
            .key_schema(gsi1_pk)
            .projection(Projection::builder().projection_type(ProjectionType::All).build())
            .build(),
        "Failed to build PersonIndex GSI"
    )?;

    // GSI 2: sparse index; only rows with status=SCHEDULED carry the key,
    // so one logical job maps to at most one row here
    let gsi2_pk = build(
        KeySchemaElement::builder().attribute_name("schedule_key").key_type(KeyType::Hash).build(),
        "Failed to build Schedule GSI PK"
    )?;

    let gsi2 = build(
        GlobalSecondaryIndex::builder()
            .index_name("ScheduleIndex")
            .key_schema(gsi2_pk)
            .projection(Projection::builder().projection_type(ProjectionType::All).build())
            .build(),
        "Failed to build ScheduleIndex GSI"
    )?;

    // GSI 3: reconciliation sweep scans open schedules by status
    let gsi3_pk = build(
        KeySchemaElement::builder().attribute_name("status").key_type(KeyType::Hash).build(),
        "Failed to build Status GSI PK"
    )?;

    let gsi3 = build(
        GlobalSecondaryIndex::builder()
            .index_name("StatusIndex")
            .key_schema(gsi3_pk)
            .projection(Projection::builder().projection_type(ProjectionType::All).build())
            .build(),
        "Failed to build StatusIndex GSI"
    )?;

    let response = client
        .create_table()
        .table_name(table_name)
        .billing_mode(BillingMode::PayPerRequest)
        .attribute_definitions(ad_id)
        .attribute_definitions(ad_person_id)
        .attribute_definitions(ad_schedule_key)
        .attribute_definitions(ad_status)
        .key_schema(ks_id)
        .global_secondary_indexes(gsi1)
        .global_secondary_indexes(gsi2)
        .global_secondary_indexes(gsi3)
        .send().await
        .map_err(|e|
            AppError::DatabaseError(
                format!("Failed to create {} table: {:?}", table_name, e.to_string())
            )
        )?;

    info!("NotificationHistory table created: {:?}", response.table_description().map(|t| t.table_name()));
    Ok(())
}
