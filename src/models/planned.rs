use chrono::{ DateTime, Utc };
use serde::{ Deserialize, Serialize };
use serde_json::Value as Json;

use crate::models::history::{ MessageChannel, TisReference };
use crate::models::notification_type::NotificationType;

/// Stable job identity: `<NOTIFICATION_TYPE>-<tis reference id>`.
pub fn job_id(notification_type: NotificationType, reference_id: &str) -> String {
    format!("{}-{}", notification_type.as_str(), reference_id)
}

/// A delivery a domain service has decided should happen, before the
/// orchestrator has deduplicated, gated or persisted anything.
#[derive(Clone, Debug)]
pub struct PlannedNotification {
    pub job_id: String,
    pub notification_type: NotificationType,
    pub channel: MessageChannel,
    pub variables: Json,
    pub fire_at: DateTime<Utc>,
    pub window_secs: i64,
    pub tis_reference: TisReference,
}

impl PlannedNotification {
    pub fn new(
        notification_type: NotificationType,
        channel: MessageChannel,
        variables: Json,
        fire_at: DateTime<Utc>,
        tis_reference: TisReference
    ) -> Self {
        Self {
            job_id: job_id(notification_type, &tis_reference.id),
            notification_type,
            channel,
            variables,
            fire_at,
            window_secs: notification_type.window_secs(),
            tis_reference,
        }
    }
}

/// Serialized scheduler payload. Captures everything the fire handler needs
/// so firing never re-reads the triggering event.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct JobData {
    pub person_id: String,
    pub notification_type: NotificationType,
    pub tis_reference: TisReference,
    pub channels: Vec<MessageChannel>,
    pub variables: Json,
}

impl JobData {
    pub fn job_id(&self) -> String {
        job_id(self.notification_type, &self.tis_reference.id)
    }
}
