//! Programme-membership event listener.

use crate::error::{ DispatchError, DispatchResult };
use crate::models::history::TisReferenceType;
use crate::models::notification_type::NotificationType;
use crate::models::programme_membership::ProgrammeMembership;
use crate::services::notification::NotificationService;

use super::RecordEnvelope;

#[derive(Debug)]
pub enum ProgrammeMembershipEvent {
    Upserted {
        membership: Box<ProgrammeMembership>,
        created: bool,
    },
    Deleted(String),
}

/// Pure mapper from a queue message body to a domain event.
pub fn map_event(body: &str) -> DispatchResult<ProgrammeMembershipEvent> {
    let envelope = RecordEnvelope::parse(body)?;
    let data = envelope.data()?;

    if envelope.is_delete() {
        let tis_id = data
            .get("tisId")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                DispatchError::Validation("Delete event has no tisId".to_string())
            })?;
        return Ok(ProgrammeMembershipEvent::Deleted(tis_id.to_string()));
    }

    let created = envelope.record
        .as_ref()
        .and_then(|r| r.operation_type.as_deref())
        .is_some_and(|op| op.eq_ignore_ascii_case("CREATE"));

    let mut membership: ProgrammeMembership = serde_json
        ::from_value(data)
        .map_err(|e| {
            DispatchError::Validation(format!("Invalid programme membership: {}", e))
        })?;

    if let Some(person_id) = envelope.trainee_tis_id {
        membership.person_id = person_id;
    }

    if membership.person_id.trim().is_empty() {
        return Err(DispatchError::Validation("Event has no trainee id".to_string()));
    }

    Ok(ProgrammeMembershipEvent::Upserted { membership: Box::new(membership), created })
}

pub async fn handle(service: &NotificationService, body: String) -> DispatchResult<()> {
    match map_event(&body)? {
        ProgrammeMembershipEvent::Upserted { membership, created } => {
            service.apply_programme_membership(&membership).await?;

            if created {
                service.send_immediate(
                    &membership.person_id,
                    NotificationType::ProgrammeCreated,
                    TisReferenceType::ProgrammeMembership,
                    &membership.tis_id,
                    serde_json::json!({
                        "personId": membership.person_id,
                        "programmeName": membership.programme_name,
                        "startDate": membership.start_date,
                    })
                ).await?;
            }

            Ok(())
        }
        ProgrammeMembershipEvent::Deleted(tis_id) => {
            service.delete_programme_membership(&tis_id).await
        }
    }
}
