use serde::{ Deserialize, Serialize };

/// An update to a trainee-submitted form.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormUpdate {
    #[serde(default)]
    pub person_id: String,
    pub form_name: String,
    #[serde(default)]
    pub form_type: Option<String>,
    #[serde(default)]
    pub lifecycle_state: Option<String>,
}
