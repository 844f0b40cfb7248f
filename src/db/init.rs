//! DynamoDB table initialization.
//!
//! Ensures the history and schedule tables exist with the correct indexes
//! before any worker starts consuming.

use aws_sdk_dynamodb::Client;

use crate::error::AppError;

use super::{ history_table, schedule_table };

pub async fn ensure_tables_exist(client: &Client) -> Result<(), AppError> {
    let tables = client
        .list_tables()
        .send().await
        .map_err(|e|
            AppError::DatabaseError(
                format!("Failed to retrieve tables list from db client: {:?}", e.to_string())
            )
        )?;

    history_table::create_history_table(&tables, client).await?;
    schedule_table::create_schedule_table(&tables, client).await?;

    Ok(())
}
