//! Conditions-of-Joining signed event listener.

use chrono::{ DateTime, Utc };
use serde::Deserialize;

use crate::error::{ DispatchError, DispatchResult };
use crate::models::programme_membership::ProgrammeMembership;
use crate::services::notification::NotificationService;

use super::RecordEnvelope;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CojSignedData {
    tis_id: String,
    #[serde(default)]
    programme_name: Option<String>,
    signed_at: DateTime<Utc>,
}

pub fn map_event(body: &str) -> DispatchResult<ProgrammeMembership> {
    let envelope = RecordEnvelope::parse(body)?;
    let data: CojSignedData = serde_json
        ::from_value(envelope.data()?)
        .map_err(|e| DispatchError::Validation(format!("Invalid CoJ event: {}", e)))?;

    let person_id = envelope.trainee_tis_id.unwrap_or_default();
    if person_id.trim().is_empty() {
        return Err(DispatchError::Validation("Event has no trainee id".to_string()));
    }

    Ok(ProgrammeMembership {
        tis_id: data.tis_id,
        person_id,
        programme_name: data.programme_name,
        conditions_of_joining_signed_at: Some(data.signed_at),
        ..ProgrammeMembership::default()
    })
}

pub async fn handle(service: &NotificationService, body: String) -> DispatchResult<()> {
    let membership = map_event(&body)?;
    service.apply_coj(&membership).await
}
