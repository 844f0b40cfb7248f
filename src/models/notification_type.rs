use serde::{ Deserialize, Serialize };

use crate::error::AppError;
use crate::models::history::MessageChannel;

/// Every notification the pipeline can produce.
///
/// The wire name (`as_str`) is the stable identity used in job ids and
/// broadcast payloads; the template name (`template_name`) locates the
/// rendered artwork. Both mappings are fixed tables, never derived by
/// reflection.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    ProgrammeCreated,
    #[serde(rename = "PROGRAMME_UPDATED_WEEK_8")]
    ProgrammeUpdatedWeek8,
    #[serde(rename = "PROGRAMME_UPDATED_WEEK_4")]
    ProgrammeUpdatedWeek4,
    #[serde(rename = "PROGRAMME_UPDATED_WEEK_0")]
    ProgrammeUpdatedWeek0,
    #[serde(rename = "PLACEMENT_UPDATED_WEEK_12")]
    PlacementUpdatedWeek12,
    CojSigned,
    FormUpdated,
    GmcUpdated,
    GmcRejected,
    LtftSubmitted,
    LtftApproved,
    LtftUpdated,
    LtftUnsubmitted,
    LtftWithdrawn,
    Welcome,
    EmailUpdated,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::ProgrammeCreated => "PROGRAMME_CREATED",
            NotificationType::ProgrammeUpdatedWeek8 => "PROGRAMME_UPDATED_WEEK_8",
            NotificationType::ProgrammeUpdatedWeek4 => "PROGRAMME_UPDATED_WEEK_4",
            NotificationType::ProgrammeUpdatedWeek0 => "PROGRAMME_UPDATED_WEEK_0",
            NotificationType::PlacementUpdatedWeek12 => "PLACEMENT_UPDATED_WEEK_12",
            NotificationType::CojSigned => "COJ_SIGNED",
            NotificationType::FormUpdated => "FORM_UPDATED",
            NotificationType::GmcUpdated => "GMC_UPDATED",
            NotificationType::GmcRejected => "GMC_REJECTED",
            NotificationType::LtftSubmitted => "LTFT_SUBMITTED",
            NotificationType::LtftApproved => "LTFT_APPROVED",
            NotificationType::LtftUpdated => "LTFT_UPDATED",
            NotificationType::LtftUnsubmitted => "LTFT_UNSUBMITTED",
            NotificationType::LtftWithdrawn => "LTFT_WITHDRAWN",
            NotificationType::Welcome => "WELCOME",
            NotificationType::EmailUpdated => "EMAIL_UPDATED",
        }
    }

    pub fn to_string(&self) -> String {
        self.as_str().to_string()
    }

    pub fn from_string(s: &str) -> Result<NotificationType, AppError> {
        match s {
            "PROGRAMME_CREATED" => Ok(Self::ProgrammeCreated),
            "PROGRAMME_UPDATED_WEEK_8" => Ok(Self::ProgrammeUpdatedWeek8),
            "PROGRAMME_UPDATED_WEEK_4" => Ok(Self::ProgrammeUpdatedWeek4),
            "PROGRAMME_UPDATED_WEEK_0" => Ok(Self::ProgrammeUpdatedWeek0),
            "PLACEMENT_UPDATED_WEEK_12" => Ok(Self::PlacementUpdatedWeek12),
            "COJ_SIGNED" => Ok(Self::CojSigned),
            "FORM_UPDATED" => Ok(Self::FormUpdated),
            "GMC_UPDATED" => Ok(Self::GmcUpdated),
            "GMC_REJECTED" => Ok(Self::GmcRejected),
            "LTFT_SUBMITTED" => Ok(Self::LtftSubmitted),
            "LTFT_APPROVED" => Ok(Self::LtftApproved),
            "LTFT_UPDATED" => Ok(Self::LtftUpdated),
            "LTFT_UNSUBMITTED" => Ok(Self::LtftUnsubmitted),
            "LTFT_WITHDRAWN" => Ok(Self::LtftWithdrawn),
            "WELCOME" => Ok(Self::Welcome),
            "EMAIL_UPDATED" => Ok(Self::EmailUpdated),
            _ => Err(AppError::ValidationError(format!("Invalid notification type: {}", s))),
        }
    }

    /// Template directory name for this type.
    pub fn template_name(&self) -> &'static str {
        match self {
            NotificationType::ProgrammeCreated => "programme-created",
            NotificationType::ProgrammeUpdatedWeek8 => "programme-updated-week-8",
            NotificationType::ProgrammeUpdatedWeek4 => "programme-updated-week-4",
            NotificationType::ProgrammeUpdatedWeek0 => "programme-updated-week-0",
            NotificationType::PlacementUpdatedWeek12 => "placement-updated-week-12",
            NotificationType::CojSigned => "coj-signed",
            NotificationType::FormUpdated => "form-updated",
            NotificationType::GmcUpdated => "gmc-updated",
            NotificationType::GmcRejected => "gmc-rejected",
            NotificationType::LtftSubmitted => "ltft-submitted",
            NotificationType::LtftApproved => "ltft-approved",
            NotificationType::LtftUpdated => "ltft-updated",
            NotificationType::LtftUnsubmitted => "ltft-unsubmitted",
            NotificationType::LtftWithdrawn => "ltft-withdrawn",
            NotificationType::Welcome => "welcome",
            NotificationType::EmailUpdated => "email-updated",
        }
    }

    pub fn from_template_name(s: &str) -> Result<NotificationType, AppError> {
        match s {
            "programme-created" => Ok(Self::ProgrammeCreated),
            "programme-updated-week-8" => Ok(Self::ProgrammeUpdatedWeek8),
            "programme-updated-week-4" => Ok(Self::ProgrammeUpdatedWeek4),
            "programme-updated-week-0" => Ok(Self::ProgrammeUpdatedWeek0),
            "placement-updated-week-12" => Ok(Self::PlacementUpdatedWeek12),
            "coj-signed" => Ok(Self::CojSigned),
            "form-updated" => Ok(Self::FormUpdated),
            "gmc-updated" => Ok(Self::GmcUpdated),
            "gmc-rejected" => Ok(Self::GmcRejected),
            "ltft-submitted" => Ok(Self::LtftSubmitted),
            "ltft-approved" => Ok(Self::LtftApproved),
            "ltft-updated" => Ok(Self::LtftUpdated),
            "ltft-unsubmitted" => Ok(Self::LtftUnsubmitted),
            "ltft-withdrawn" => Ok(Self::LtftWithdrawn),
            "welcome" => Ok(Self::Welcome),
            "email-updated" => Ok(Self::EmailUpdated),
            _ => Err(AppError::ValidationError(format!("Unknown template name: {}", s))),
        }
    }

    /// Channels this type is delivered on, in order of preference.
    pub fn channels(&self) -> &'static [MessageChannel] {
        match self {
            NotificationType::ProgrammeUpdatedWeek8
            | NotificationType::ProgrammeUpdatedWeek4
            | NotificationType::ProgrammeUpdatedWeek0
            | NotificationType::PlacementUpdatedWeek12
            | NotificationType::LtftApproved => {
                &[MessageChannel::Email, MessageChannel::InApp]
            }
            NotificationType::GmcRejected
            | NotificationType::Welcome
            | NotificationType::EmailUpdated => &[MessageChannel::Email],
            _ => &[MessageChannel::InApp],
        }
    }

    /// Days before the entity start date at which the milestone fires, or
    /// `None` for event-driven types.
    pub fn milestone_days(&self) -> Option<i64> {
        match self {
            NotificationType::ProgrammeUpdatedWeek8 => Some(56),
            NotificationType::ProgrammeUpdatedWeek4 => Some(28),
            NotificationType::ProgrammeUpdatedWeek0 => Some(0),
            NotificationType::PlacementUpdatedWeek12 => Some(84),
            _ => None,
        }
    }

    /// Acceptable lateness in seconds for a missed fire of this type.
    pub fn window_secs(&self) -> i64 {
        if self.milestone_days().is_some() { 86_400 } else { 3_600 }
    }

    /// Whether a milestone already in the past is still sent immediately
    /// rather than dropped.
    pub fn allows_missed_fire(&self) -> bool {
        self.milestone_days().is_some()
    }

    pub fn all() -> &'static [NotificationType] {
        &[
            NotificationType::ProgrammeCreated,
            NotificationType::ProgrammeUpdatedWeek8,
            NotificationType::ProgrammeUpdatedWeek4,
            NotificationType::ProgrammeUpdatedWeek0,
            NotificationType::PlacementUpdatedWeek12,
            NotificationType::CojSigned,
            NotificationType::FormUpdated,
            NotificationType::GmcUpdated,
            NotificationType::GmcRejected,
            NotificationType::LtftSubmitted,
            NotificationType::LtftApproved,
            NotificationType::LtftUpdated,
            NotificationType::LtftUnsubmitted,
            NotificationType::LtftWithdrawn,
            NotificationType::Welcome,
            NotificationType::EmailUpdated,
        ]
    }

    pub fn programme_milestones() -> &'static [NotificationType] {
        &[
            NotificationType::ProgrammeUpdatedWeek8,
            NotificationType::ProgrammeUpdatedWeek4,
            NotificationType::ProgrammeUpdatedWeek0,
        ]
    }

    pub fn placement_milestones() -> &'static [NotificationType] {
        &[NotificationType::PlacementUpdatedWeek12]
    }
}
