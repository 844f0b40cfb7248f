use chrono::NaiveDate;
use serde::{ Deserialize, Serialize };

/// Placement types that generate notifications; anything else is excluded
/// from milestone planning.
pub const NOTIFIABLE_PLACEMENT_TYPES: &[&str] = &[
    "In Post",
    "In Post - Acting up",
    "In Post - Extension",
];

/// A scheduled work assignment.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    pub tis_id: String,
    #[serde(default)]
    pub person_id: String,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub placement_type: Option<String>,
    #[serde(default)]
    pub site: Option<String>,
    #[serde(default)]
    pub specialty: Option<String>,
    /// Local-office owner.
    #[serde(default)]
    pub owner: Option<String>,
}

impl Placement {
    pub fn is_notifiable_type(&self) -> bool {
        match &self.placement_type {
            Some(pt) => NOTIFIABLE_PLACEMENT_TYPES
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(pt)),
            None => false,
        }
    }
}
