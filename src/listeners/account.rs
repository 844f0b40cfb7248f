//! Account and contact-details event listener.

use crate::error::{ DispatchError, DispatchResult };
use crate::models::account::AccountUpdate;
use crate::services::notification::NotificationService;

use super::RecordEnvelope;

pub fn map_event(body: &str) -> DispatchResult<AccountUpdate> {
    let envelope = RecordEnvelope::parse(body)?;

    let mut update: AccountUpdate = serde_json
        ::from_value(envelope.data()?)
        .map_err(|e| DispatchError::Validation(format!("Invalid account event: {}", e)))?;

    if let Some(person_id) = envelope.trainee_tis_id {
        update.person_id = person_id;
    }

    if update.person_id.trim().is_empty() {
        return Err(DispatchError::Validation("Event has no trainee id".to_string()));
    }

    Ok(update)
}

pub async fn handle(service: &NotificationService, body: String) -> DispatchResult<()> {
    let update = map_event(&body)?;
    service.apply_account(&update).await
}
