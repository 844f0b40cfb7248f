use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{ DateTime, Utc };
use serde::{ Deserialize, Serialize };

use crate::{ error::AppError, DynamoDbEntity };

#[derive(Copy, Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScheduleState {
    Pending,
    Firing,
    Done,
}

impl ScheduleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleState::Pending => "PENDING",
            ScheduleState::Firing => "FIRING",
            ScheduleState::Done => "DONE",
        }
    }

    pub fn from_string(s: &str) -> Result<ScheduleState, AppError> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "FIRING" => Ok(Self::Firing),
            "DONE" => Ok(Self::Done),
            _ => Err(AppError::ValidationError(format!("Invalid schedule state: {}", s))),
        }
    }
}

/// One persisted future delivery. The job id is the primary key, so at most
/// one entry exists per logical job and schedule upserts are
/// last-writer-wins.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ScheduleEntry {
    pub job_id: String,
    pub payload: String,
    pub fire_at: DateTime<Utc>,
    pub window_secs: i64,
    pub state: ScheduleState,
    pub failure: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl ScheduleEntry {
    pub fn new(
        job_id: String,
        payload: String,
        fire_at: DateTime<Utc>,
        window_secs: i64
    ) -> Result<Self, AppError> {
        if job_id.trim().is_empty() {
            return Err(AppError::ValidationError("Job id cannot be empty".to_string()));
        }

        Ok(Self {
            job_id,
            payload,
            fire_at,
            window_secs,
            state: ScheduleState::Pending,
            failure: None,
            updated_at: Utc::now(),
        })
    }

    /// Latest instant at which this entry may still fire.
    pub fn deadline(&self) -> DateTime<Utc> {
        self.fire_at + chrono::Duration::seconds(self.window_secs)
    }

    pub fn is_missed(&self, now: DateTime<Utc>) -> bool {
        self.deadline() < now
    }
}

impl DynamoDbEntity for ScheduleEntry {
    fn table_name() -> &'static str {
        "ScheduleEntries"
    }

    fn primary_key(&self) -> String {
        self.job_id.clone()
    }

    fn from_item(item: &HashMap<String, AttributeValue>) -> Option<Self> {
        let job_id = item.get("id")?.as_s().ok()?.to_string();
        let payload = item.get("payload")?.as_s().ok()?.to_string();

        let fire_at = item
            .get("fire_at")
            .and_then(|v| v.as_s().ok())
            .and_then(|s| s.parse::<DateTime<Utc>>().ok())?;

        let window_secs = item
            .get("window_secs")
            .and_then(|v| v.as_n().ok())
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(0);

        let state_str = item.get("state")?.as_s().ok()?;
        let state = ScheduleState::from_string(state_str).ok()?;

        let failure = item
            .get("failure")
            .and_then(|v| v.as_s().ok())
            .map(|s| s.to_string());

        let updated_at = item
            .get("updated_at")
            .and_then(|v| v.as_s().ok())
            .and_then(|s| s.parse::<DateTime<Utc>>().ok())
            .unwrap_or_else(Utc::now);

        Some(Self { job_id, payload, fire_at, window_secs, state, failure, updated_at })
    }

    fn to_item(&self) -> HashMap<String, AttributeValue> {
        let mut item = HashMap::new();

        item.insert("id".to_string(), AttributeValue::S(self.job_id.clone()));
        item.insert("payload".to_string(), AttributeValue::S(self.payload.clone()));
        item.insert("fire_at".to_string(), AttributeValue::S(self.fire_at.to_rfc3339()));
        item.insert("window_secs".to_string(), AttributeValue::N(self.window_secs.to_string()));
        item.insert("state".to_string(), AttributeValue::S(self.state.as_str().to_string()));

        if let Some(failure) = &self.failure {
            item.insert("failure".to_string(), AttributeValue::S(failure.clone()));
        }

        item.insert("updated_at".to_string(), AttributeValue::S(self.updated_at.to_rfc3339()));

        item
    }
}
