//! Account and contact-details planning rules.

use chrono::Utc;
use serde_json::json;

use crate::models::account::AccountUpdate;
use crate::models::history::{ TisReference, TisReferenceType };
use crate::models::notification_type::NotificationType;
use crate::models::planned::PlannedNotification;

pub struct AccountService;

impl AccountService {
    /// A person with no directory account yet gets the welcome message;
    /// anyone else is told their contact details changed.
    pub fn plan(update: &AccountUpdate, is_new_user: bool) -> Vec<PlannedNotification> {
        let notification_type = if is_new_user {
            NotificationType::Welcome
        } else {
            NotificationType::EmailUpdated
        };

        let reference = TisReference::new(TisReferenceType::Person, update.person_id.clone());

        vec![
            PlannedNotification::new(
                notification_type,
                notification_type.channels()[0],
                json!({
                    "personId": update.person_id,
                    "email": update.email,
                    "familyName": update.family_name,
                    "givenName": update.given_name,
                }),
                Utc::now(),
                reference
            )
        ]
    }
}
