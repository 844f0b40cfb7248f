//! Mail-provider feedback listener.
//!
//! Bounce and complaint events reference the `NotificationId` header the
//! outbox stamped on the original message; the matching history row is
//! terminated with a provider-failure detail.

use serde::Deserialize;

use crate::error::{ DispatchError, DispatchResult };
use crate::services::notification::NotificationService;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeedbackEnvelope {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    bounce: Option<BounceDetail>,
    #[serde(default)]
    complaint: Option<ComplaintDetail>,
    #[serde(default)]
    headers: Vec<FeedbackHeader>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BounceDetail {
    #[serde(default)]
    bounce_type: Option<String>,
    #[serde(default)]
    bounce_sub_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ComplaintDetail {
    #[serde(default)]
    complaint_sub_type: Option<String>,
    #[serde(default)]
    complaint_feedback_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FeedbackHeader {
    name: String,
    value: String,
}

/// Pure mapper: `(notification id, failure detail)`.
pub fn map_event(body: &str) -> DispatchResult<(String, String)> {
    let envelope: FeedbackEnvelope = serde_json
        ::from_str(body)
        .map_err(|e| DispatchError::Validation(format!("Unparseable feedback: {}", e)))?;

    let notification_id = envelope.headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case("NotificationId"))
        .map(|h| h.value.clone())
        .ok_or_else(|| {
            DispatchError::Validation("Feedback has no NotificationId header".to_string())
        })?;

    let detail = match envelope.event_type.as_str() {
        "Bounce" => {
            let bounce = envelope.bounce.unwrap_or(BounceDetail {
                bounce_type: None,
                bounce_sub_type: None,
            });
            format!(
                "Bounce: {} - {}",
                bounce.bounce_type.as_deref().unwrap_or("Undetermined"),
                bounce.bounce_sub_type.as_deref().unwrap_or("Undetermined")
            )
        }
        "Complaint" => {
            let complaint = envelope.complaint.unwrap_or(ComplaintDetail {
                complaint_sub_type: None,
                complaint_feedback_type: None,
            });
            let reason = complaint.complaint_sub_type
                .or(complaint.complaint_feedback_type)
                .unwrap_or_else(|| "Undetermined".to_string());
            format!("Complaint: {}", reason)
        }
        other => {
            return Err(
                DispatchError::Validation(format!("Unknown feedback type: {}", other))
            );
        }
    };

    Ok((notification_id, detail))
}

pub async fn handle(service: &NotificationService, body: String) -> DispatchResult<()> {
    let (notification_id, detail) = map_event(&body)?;
    service.record_delivery_feedback(&notification_id, detail).await
}
