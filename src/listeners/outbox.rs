//! Outbox wake-up listener: drains send-now requests into the mail gateway.

use crate::error::{ DispatchError, DispatchResult };
use crate::outbox::OutboxWakeUp;
use crate::services::notification::NotificationService;

pub fn map_event(body: &str) -> DispatchResult<String> {
    let wake_up: OutboxWakeUp = serde_json
        ::from_str(body)
        .map_err(|e| DispatchError::Validation(format!("Unparseable wake-up: {}", e)))?;

    Ok(wake_up.notification_id)
}

pub async fn handle(service: &NotificationService, body: String) -> DispatchResult<()> {
    let notification_id = map_event(&body)?;
    service.resend_scheduled(&notification_id).await
}
