//! Placement planning rules.

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde_json::json;

use crate::models::history::{ TisReference, TisReferenceType };
use crate::models::notification_type::NotificationType;
use crate::models::placement::Placement;
use crate::models::planned::PlannedNotification;
use crate::services::milestone_fire_at;

pub struct PlacementService;

impl PlacementService {
    /// Only in-post placement types with a future-or-today start generate
    /// milestones.
    pub fn is_excluded(placement: &Placement, today: NaiveDate) -> bool {
        if !placement.is_notifiable_type() {
            return true;
        }

        match placement.start_date {
            Some(start) => start < today,
            None => true,
        }
    }

    pub fn milestone_days(notification_type: NotificationType) -> Option<i64> {
        if NotificationType::placement_milestones().contains(&notification_type) {
            notification_type.milestone_days()
        } else {
            None
        }
    }

    pub fn plan(placement: &Placement, timezone: Tz) -> Vec<PlannedNotification> {
        let Some(start) = placement.start_date else {
            return Vec::new();
        };

        let reference = TisReference::new(TisReferenceType::Placement, placement.tis_id.clone());

        NotificationType::placement_milestones()
            .iter()
            .map(|notification_type| {
                let days = notification_type.milestone_days().unwrap_or(0);
                let fire_at = milestone_fire_at(start, days, timezone);

                PlannedNotification::new(
                    *notification_type,
                    notification_type.channels()[0],
                    Self::variables(placement),
                    fire_at,
                    reference.clone()
                )
            })
            .collect()
    }

    fn variables(placement: &Placement) -> serde_json::Value {
        json!({
            "personId": placement.person_id,
            "startDate": placement.start_date,
            "placementType": placement.placement_type,
            "site": placement.site,
            "specialty": placement.specialty,
            "localOfficeName": placement.owner,
        })
    }
}
