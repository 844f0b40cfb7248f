//! Common types and traits used throughout the models module

// Re-export all entity types
pub use super::account::{ AccountUpdate, UserDetails };
pub use super::forms::FormUpdate;
pub use super::gmc::GmcUpdate;
pub use super::history::{
    History,
    MessageChannel,
    NotificationStatus,
    Recipient,
    TemplateInfo,
    TisReference,
    TisReferenceType,
};
pub use super::local_office_contact::{ ContactHref, LocalOfficeContact };
pub use super::ltft::{ LtftState, LtftUpdate };
pub use super::notification_type::NotificationType;
pub use super::placement::{ Placement, NOTIFIABLE_PLACEMENT_TYPES };
pub use super::planned::{ job_id, JobData, PlannedNotification };
pub use super::programme_membership::{ Curriculum, ProgrammeMembership };
pub use super::schedule_entry::{ ScheduleEntry, ScheduleState };

// Re-export error types
pub use crate::error::{ AppError, AppResult, DispatchError, DispatchResult };

// Re-export common external dependencies
pub use aws_sdk_dynamodb::types::AttributeValue;
pub use chrono::{ DateTime, Utc };
pub use serde::{ Deserialize, Serialize };
pub use serde_json::Value as Json;
pub use std::collections::HashMap;
