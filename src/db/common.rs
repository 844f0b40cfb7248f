//! Shared helpers for DynamoDB table operations.

use core::fmt;
use crate::error::AppError;

/// Wraps a DynamoDB builder result with error context.
pub fn build<T, E>(builder_result: Result<T, E>, context: &str) -> Result<T, AppError>
    where E: fmt::Display
{
    builder_result.map_err(|e| AppError::DatabaseError(format!("{}: {:?}", context, e.to_string())))
}
