//! LTFT status-transition planning rules.

use serde_json::json;

use crate::models::history::{ TisReference, TisReferenceType };
use crate::models::ltft::LtftUpdate;
use crate::models::notification_type::NotificationType;
use crate::models::planned::PlannedNotification;

pub struct LtftService;

impl LtftService {
    pub fn plan(update: &LtftUpdate) -> Vec<PlannedNotification> {
        let notification_type = update.state.notification_type();
        let reference = TisReference::new(TisReferenceType::LtftForm, update.form_ref.clone());

        vec![
            PlannedNotification::new(
                notification_type,
                notification_type.channels()[0],
                json!({
                    "personId": update.person_id,
                    "formRef": update.form_ref,
                    "formName": update.form_name,
                    "state": update.state.as_str(),
                    "stateTimestamp": update.timestamp.to_rfc3339(),
                }),
                update.timestamp,
                reference
            )
        ]
    }

    /// A user action on a form supersedes any reminder still pending for the
    /// same form reference. These are the types whose open schedules are
    /// cleared before the new notification is planned.
    pub fn superseded_types() -> &'static [NotificationType] {
        &[
            NotificationType::LtftSubmitted,
            NotificationType::LtftApproved,
            NotificationType::LtftUpdated,
            NotificationType::LtftUnsubmitted,
            NotificationType::LtftWithdrawn,
        ]
    }
}
