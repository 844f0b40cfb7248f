use chrono::{ DateTime, Utc };
use serde::{ Deserialize, Serialize };

use crate::error::AppError;
use crate::models::notification_type::NotificationType;

/// Lifecycle states of a Less Than Full Time application form.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LtftState {
    Submitted,
    Approved,
    Updated,
    Unsubmitted,
    Withdrawn,
}

impl LtftState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LtftState::Submitted => "SUBMITTED",
            LtftState::Approved => "APPROVED",
            LtftState::Updated => "UPDATED",
            LtftState::Unsubmitted => "UNSUBMITTED",
            LtftState::Withdrawn => "WITHDRAWN",
        }
    }

    pub fn from_string(s: &str) -> Result<LtftState, AppError> {
        match s {
            "SUBMITTED" => Ok(Self::Submitted),
            "APPROVED" => Ok(Self::Approved),
            "UPDATED" => Ok(Self::Updated),
            "UNSUBMITTED" => Ok(Self::Unsubmitted),
            "WITHDRAWN" => Ok(Self::Withdrawn),
            _ => Err(AppError::ValidationError(format!("Invalid LTFT state: {}", s))),
        }
    }

    pub fn notification_type(&self) -> NotificationType {
        match self {
            LtftState::Submitted => NotificationType::LtftSubmitted,
            LtftState::Approved => NotificationType::LtftApproved,
            LtftState::Updated => NotificationType::LtftUpdated,
            LtftState::Unsubmitted => NotificationType::LtftUnsubmitted,
            LtftState::Withdrawn => NotificationType::LtftWithdrawn,
        }
    }
}

/// A status transition on an LTFT form.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct LtftUpdate {
    pub form_ref: String,
    pub person_id: String,
    pub state: LtftState,
    pub timestamp: DateTime<Utc>,
    pub form_name: Option<String>,
}
