//! LTFT status-transition event listener.

use chrono::{ DateTime, Utc };
use serde::Deserialize;

use crate::error::{ DispatchError, DispatchResult };
use crate::models::ltft::{ LtftState, LtftUpdate };
use crate::services::notification::NotificationService;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LtftEnvelope {
    form_ref: String,
    #[serde(default)]
    trainee_tis_id: Option<String>,
    status: LtftStatus,
    #[serde(default)]
    content: Option<LtftContent>,
}

#[derive(Debug, Deserialize)]
struct LtftStatus {
    current: LtftCurrentStatus,
}

#[derive(Debug, Deserialize)]
struct LtftCurrentStatus {
    state: String,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct LtftContent {
    #[serde(default)]
    name: Option<String>,
}

pub fn map_event(body: &str) -> DispatchResult<LtftUpdate> {
    let envelope: LtftEnvelope = serde_json
        ::from_str(body)
        .map_err(|e| DispatchError::Validation(format!("Unparseable message: {}", e)))?;

    let state = LtftState::from_string(&envelope.status.current.state).map_err(|e| {
        DispatchError::Validation(e.to_string())
    })?;

    let person_id = envelope.trainee_tis_id.unwrap_or_default();
    if person_id.trim().is_empty() {
        return Err(DispatchError::Validation("Event has no trainee id".to_string()));
    }

    Ok(LtftUpdate {
        form_ref: envelope.form_ref,
        person_id,
        state,
        timestamp: envelope.status.current.timestamp,
        form_name: envelope.content.and_then(|c| c.name),
    })
}

pub async fn handle(service: &NotificationService, body: String) -> DispatchResult<()> {
    let update = map_event(&body)?;
    service.apply_ltft(&update).await
}
