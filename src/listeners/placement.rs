//! Placement event listener.

use crate::error::{ DispatchError, DispatchResult };
use crate::models::placement::Placement;
use crate::services::notification::NotificationService;

use super::RecordEnvelope;

#[derive(Debug)]
pub enum PlacementEvent {
    Upserted(Box<Placement>),
    Deleted(String),
}

pub fn map_event(body: &str) -> DispatchResult<PlacementEvent> {
    let envelope = RecordEnvelope::parse(body)?;
    let data = envelope.data()?;

    if envelope.is_delete() {
        let tis_id = data
            .get("tisId")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                DispatchError::Validation("Delete event has no tisId".to_string())
            })?;
        return Ok(PlacementEvent::Deleted(tis_id.to_string()));
    }

    let mut placement: Placement = serde_json
        ::from_value(data)
        .map_err(|e| DispatchError::Validation(format!("Invalid placement: {}", e)))?;

    if let Some(person_id) = envelope.trainee_tis_id {
        placement.person_id = person_id;
    }

    if placement.person_id.trim().is_empty() {
        return Err(DispatchError::Validation("Event has no trainee id".to_string()));
    }

    Ok(PlacementEvent::Upserted(Box::new(placement)))
}

pub async fn handle(service: &NotificationService, body: String) -> DispatchResult<()> {
    match map_event(&body)? {
        PlacementEvent::Upserted(placement) => service.apply_placement(&placement).await,
        PlacementEvent::Deleted(tis_id) => service.delete_placement(&tis_id).await,
    }
}
