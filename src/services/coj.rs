//! Conditions-of-Joining planning rules.

use chrono::Utc;
use serde_json::json;

use crate::models::history::{ TisReference, TisReferenceType };
use crate::models::notification_type::NotificationType;
use crate::models::planned::PlannedNotification;
use crate::models::programme_membership::ProgrammeMembership;

pub struct CojService;

impl CojService {
    /// A signed CoJ acknowledges immediately; nothing fires for an unsigned
    /// membership.
    pub fn plan(membership: &ProgrammeMembership) -> Vec<PlannedNotification> {
        let Some(signed_at) = membership.conditions_of_joining_signed_at else {
            return Vec::new();
        };

        let notification_type = NotificationType::CojSigned;
        let reference = TisReference::new(
            TisReferenceType::ProgrammeMembership,
            membership.tis_id.clone()
        );

        vec![
            PlannedNotification::new(
                notification_type,
                notification_type.channels()[0],
                json!({
                    "personId": membership.person_id,
                    "programmeName": membership.programme_name,
                    "signedAt": signed_at.to_rfc3339(),
                }),
                Utc::now(),
                reference
            )
        ]
    }
}
