use chrono::{ DateTime, NaiveDate, Utc };
use serde::{ Deserialize, Serialize };

/// A curriculum attached to a programme membership. Only the fields the
/// planning rules read.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Curriculum {
    #[serde(default)]
    pub curriculum_name: Option<String>,
    #[serde(default)]
    pub curriculum_specialty: Option<String>,
    #[serde(default)]
    pub curriculum_end_date: Option<NaiveDate>,
}

/// A trainee's enrolment in a training programme.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgrammeMembership {
    pub tis_id: String,
    #[serde(default)]
    pub person_id: String,
    #[serde(default)]
    pub programme_name: Option<String>,
    #[serde(default)]
    pub programme_number: Option<String>,
    /// Local-office owner, e.g. "North West".
    #[serde(default)]
    pub managing_deanery: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub curricula: Vec<Curriculum>,
    /// When the Conditions of Joining were signed, if they have been.
    #[serde(default)]
    pub conditions_of_joining_signed_at: Option<DateTime<Utc>>,
}

impl ProgrammeMembership {
    pub fn has_signed_coj(&self) -> bool {
        self.conditions_of_joining_signed_at.is_some()
    }
}
