use serde::{ Deserialize, Serialize };

/// Contact details held by the user directory for one account.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct UserDetails {
    pub email: String,
    #[serde(default)]
    pub family_name: Option<String>,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub gmc_number: Option<String>,
}

/// An account or contact-details change event for a trainee.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountUpdate {
    #[serde(default)]
    pub person_id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
    #[serde(default)]
    pub given_name: Option<String>,
}
