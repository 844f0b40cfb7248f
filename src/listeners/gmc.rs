//! GMC update and rejection event listener.
//!
//! This family uses a flatter envelope than the record events: the trigger
//! fields ride at the top level next to the record.

use serde::Deserialize;
use serde_json::Value as Json;

use crate::error::{ DispatchError, DispatchResult };
use crate::models::gmc::GmcUpdate;
use crate::services::notification::NotificationService;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GmcEnvelope {
    tis_id: String,
    #[serde(default)]
    tis_trigger: Option<String>,
    #[serde(default)]
    tis_trigger_detail: Option<String>,
    #[serde(default)]
    record: Option<GmcRecord>,
}

#[derive(Debug, Deserialize)]
struct GmcRecord {
    #[serde(default)]
    data: Option<Json>,
}

pub fn map_event(body: &str) -> DispatchResult<GmcUpdate> {
    let envelope: GmcEnvelope = serde_json
        ::from_str(body)
        .map_err(|e| DispatchError::Validation(format!("Unparseable message: {}", e)))?;

    let data = envelope.record
        .and_then(|r| r.data)
        .ok_or_else(|| DispatchError::Validation("Message has no record data".to_string()))?;

    let mut update: GmcUpdate = serde_json
        ::from_value(data)
        .map_err(|e| DispatchError::Validation(format!("Invalid GMC event: {}", e)))?;

    update.person_id = envelope.tis_id;
    update.tis_trigger = envelope.tis_trigger;
    update.tis_trigger_detail = envelope.tis_trigger_detail;

    if update.person_id.trim().is_empty() {
        return Err(DispatchError::Validation("Event has no trainee id".to_string()));
    }

    Ok(update)
}

pub async fn handle(service: &NotificationService, body: String) -> DispatchResult<()> {
    let update = map_event(&body)?;
    service.apply_gmc(&update).await
}
