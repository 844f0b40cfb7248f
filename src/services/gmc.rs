//! GMC update and rejection planning rules.

use chrono::Utc;
use serde_json::json;

use crate::models::gmc::GmcUpdate;
use crate::models::history::{ TisReference, TisReferenceType };
use crate::models::notification_type::NotificationType;
use crate::models::planned::PlannedNotification;

pub struct GmcService;

impl GmcService {
    /// An update with a recorded trigger is a rejection pushed back from
    /// the system of record; anything else is a plain details change.
    pub fn is_rejection(update: &GmcUpdate) -> bool {
        update.tis_trigger.as_deref().is_some_and(|t| !t.trim().is_empty())
    }

    pub fn plan(update: &GmcUpdate) -> Vec<PlannedNotification> {
        let notification_type = if Self::is_rejection(update) {
            NotificationType::GmcRejected
        } else {
            NotificationType::GmcUpdated
        };

        let reference = TisReference::new(TisReferenceType::Person, update.person_id.clone());

        let variables = json!({
            "personId": update.person_id,
            "gmcNumber": update.gmc_number,
            "gmcStatus": update.gmc_status,
            "trigger": update.tis_trigger,
            "triggerDetail": update.tis_trigger_detail,
        });

        let mut plans = vec![
            PlannedNotification::new(
                notification_type,
                notification_type.channels()[0],
                variables.clone(),
                Utc::now(),
                reference.clone()
            )
        ];

        // Rejections with a trigger detail also leave an in-app audit trail
        // for the trainee.
        if notification_type == NotificationType::GmcRejected && update.wants_audit_record() {
            let audit_type = NotificationType::GmcUpdated;
            plans.push(
                PlannedNotification::new(
                    audit_type,
                    audit_type.channels()[0],
                    variables,
                    Utc::now(),
                    reference
                )
            );
        }

        plans
    }
}
