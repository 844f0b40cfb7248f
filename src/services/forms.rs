//! Form-update planning rules.

use chrono::Utc;
use serde_json::json;

use crate::models::forms::FormUpdate;
use crate::models::history::{ TisReference, TisReferenceType };
use crate::models::notification_type::NotificationType;
use crate::models::planned::PlannedNotification;

pub struct FormService;

impl FormService {
    pub fn plan(form: &FormUpdate) -> Vec<PlannedNotification> {
        let notification_type = NotificationType::FormUpdated;
        let reference = TisReference::new(TisReferenceType::Form, form.form_name.clone());

        vec![
            PlannedNotification::new(
                notification_type,
                notification_type.channels()[0],
                json!({
                    "personId": form.person_id,
                    "formName": form.form_name,
                    "formType": form.form_type,
                    "lifecycleState": form.lifecycle_state,
                }),
                Utc::now(),
                reference
            )
        ]
    }
}
