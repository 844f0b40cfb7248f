// src/lib.rs
pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod listeners;
pub mod models;
pub mod outbox;
pub mod repository;
pub mod scheduler;
pub mod services;
pub mod templates;

// Re-exports
pub use error::{ AppError, AppResult, DispatchError, DispatchResult };
pub use models::prelude::*;
pub use repository::{ Repository, DynamoDbEntity };

// Type aliases
pub type DbClient = aws_sdk_dynamodb::Client;
pub type SqsClient = aws_sdk_sqs::Client;
pub type SnsClient = aws_sdk_sns::Client;
pub type CognitoClient = aws_sdk_cognitoidentityprovider::Client;
