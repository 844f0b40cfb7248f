//! Programme-membership planning rules.
//!
//! Pure functions: the orchestrator owns all I/O and injects anything a
//! rule needs to know about the outside world.

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde_json::json;

use crate::models::history::{ TisReference, TisReferenceType };
use crate::models::notification_type::NotificationType;
use crate::models::planned::PlannedNotification;
use crate::models::programme_membership::ProgrammeMembership;
use crate::services::milestone_fire_at;

pub struct ProgrammeMembershipService;

impl ProgrammeMembershipService {
    /// Memberships with no start date, or one already in the past, get no
    /// milestones.
    pub fn is_excluded(membership: &ProgrammeMembership, today: NaiveDate) -> bool {
        match membership.start_date {
            Some(start) => start < today,
            None => true,
        }
    }

    pub fn milestone_days(notification_type: NotificationType) -> Option<i64> {
        if NotificationType::programme_milestones().contains(&notification_type) {
            notification_type.milestone_days()
        } else {
            None
        }
    }

    /// One planned notification per programme milestone, fired at local
    /// midnight of `start - offset`.
    pub fn plan(membership: &ProgrammeMembership, timezone: Tz) -> Vec<PlannedNotification> {
        let Some(start) = membership.start_date else {
            return Vec::new();
        };

        let reference = TisReference::new(
            TisReferenceType::ProgrammeMembership,
            membership.tis_id.clone()
        );

        NotificationType::programme_milestones()
            .iter()
            .map(|notification_type| {
                let days = notification_type.milestone_days().unwrap_or(0);
                let fire_at = milestone_fire_at(start, days, timezone);

                PlannedNotification::new(
                    *notification_type,
                    notification_type.channels()[0],
                    Self::variables(membership),
                    fire_at,
                    reference.clone()
                )
            })
            .collect()
    }

    fn variables(membership: &ProgrammeMembership) -> serde_json::Value {
        let curricula: Vec<&str> = membership.curricula
            .iter()
            .filter_map(|c| c.curriculum_name.as_deref())
            .collect();

        json!({
            "personId": membership.person_id,
            "programmeName": membership.programme_name,
            "programmeNumber": membership.programme_number,
            "startDate": membership.start_date,
            "localOfficeName": membership.managing_deanery,
            "curricula": curricula,
            "hasSignedCoj": membership.has_signed_coj(),
        })
    }
}
