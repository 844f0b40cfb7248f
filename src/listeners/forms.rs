//! Form-updated event listener.

use crate::error::{ DispatchError, DispatchResult };
use crate::models::forms::FormUpdate;
use crate::services::notification::NotificationService;

use super::RecordEnvelope;

pub fn map_event(body: &str) -> DispatchResult<FormUpdate> {
    let envelope = RecordEnvelope::parse(body)?;

    let mut form: FormUpdate = serde_json
        ::from_value(envelope.data()?)
        .map_err(|e| DispatchError::Validation(format!("Invalid form event: {}", e)))?;

    if let Some(person_id) = envelope.trainee_tis_id {
        form.person_id = person_id;
    }

    if form.person_id.trim().is_empty() {
        return Err(DispatchError::Validation("Event has no trainee id".to_string()));
    }

    Ok(form)
}

pub async fn handle(service: &NotificationService, body: String) -> DispatchResult<()> {
    let form = map_event(&body)?;
    service.apply_form(&form).await
}
