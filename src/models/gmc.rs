use serde::{ Deserialize, Serialize };

/// A change to a trainee's GMC registration details, or a rejection of a
/// proposed change pushed back from the upstream system of record.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GmcUpdate {
    #[serde(default)]
    pub person_id: String,
    #[serde(default)]
    pub gmc_number: Option<String>,
    #[serde(default)]
    pub gmc_status: Option<String>,
    /// Trigger recorded by the upstream system, e.g. the rejection cause.
    #[serde(default)]
    pub tis_trigger: Option<String>,
    #[serde(default)]
    pub tis_trigger_detail: Option<String>,
}

impl GmcUpdate {
    /// A rejection asks for an audit trail entry in addition to the
    /// trainee-facing message.
    pub fn wants_audit_record(&self) -> bool {
        self.tis_trigger_detail
            .as_deref()
            .is_some_and(|detail| !detail.trim().is_empty())
    }
}
