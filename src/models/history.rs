use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{ DateTime, Utc };
use serde::{ Deserialize, Serialize };
use serde_json::Value as Json;
use uuid::Uuid;

use crate::{ error::AppError, models::notification_type::NotificationType, DynamoDbEntity };

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageChannel {
    Email,
    InApp,
}

impl MessageChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageChannel::Email => "EMAIL",
            MessageChannel::InApp => "IN_APP",
        }
    }

    pub fn from_string(s: &str) -> Result<MessageChannel, AppError> {
        match s {
            "EMAIL" => Ok(Self::Email),
            "IN_APP" => Ok(Self::InApp),
            _ => Err(AppError::ValidationError(format!("Invalid message channel: {}", s))),
        }
    }

    /// Template directory for this channel.
    pub fn message_type(&self) -> &'static str {
        match self {
            MessageChannel::Email => "email",
            MessageChannel::InApp => "in-app",
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationStatus {
    Scheduled,
    Sent,
    Failed,
    Unread,
    Read,
    Archived,
    Deleted,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Scheduled => "SCHEDULED",
            NotificationStatus::Sent => "SENT",
            NotificationStatus::Failed => "FAILED",
            NotificationStatus::Unread => "UNREAD",
            NotificationStatus::Read => "READ",
            NotificationStatus::Archived => "ARCHIVED",
            NotificationStatus::Deleted => "DELETED",
        }
    }

    pub fn from_string(s: &str) -> Result<NotificationStatus, AppError> {
        match s {
            "SCHEDULED" => Ok(Self::Scheduled),
            "SENT" => Ok(Self::Sent),
            "FAILED" => Ok(Self::Failed),
            "UNREAD" => Ok(Self::Unread),
            "READ" => Ok(Self::Read),
            "ARCHIVED" => Ok(Self::Archived),
            "DELETED" => Ok(Self::Deleted),
            _ => Err(AppError::ValidationError(format!("Invalid notification status: {}", s))),
        }
    }

    /// Legal lifecycle transitions. DELETED is reachable from any state and
    /// terminal; FAILED and ARCHIVED only admit deletion.
    pub fn can_transition_to(&self, to: NotificationStatus) -> bool {
        if to == NotificationStatus::Deleted {
            return *self != NotificationStatus::Deleted;
        }
        match self {
            NotificationStatus::Scheduled => {
                matches!(to, NotificationStatus::Sent | NotificationStatus::Failed)
            }
            NotificationStatus::Sent => {
                matches!(
                    to,
                    NotificationStatus::Failed
                        | NotificationStatus::Read
                        | NotificationStatus::Unread
                        | NotificationStatus::Archived
                )
            }
            NotificationStatus::Unread => {
                matches!(to, NotificationStatus::Read | NotificationStatus::Archived)
            }
            NotificationStatus::Read => {
                matches!(to, NotificationStatus::Unread | NotificationStatus::Archived)
            }
            NotificationStatus::Failed
            | NotificationStatus::Archived
            | NotificationStatus::Deleted => false,
        }
    }

    /// Statuses that forbid re-planning the same logical job.
    pub fn is_terminal_for_planning(&self) -> bool {
        matches!(
            self,
            NotificationStatus::Sent
                | NotificationStatus::Unread
                | NotificationStatus::Read
                | NotificationStatus::Archived
        )
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Deserialize, Serialize)]
pub enum TisReferenceType {
    ProgrammeMembership,
    Placement,
    Form,
    LtftForm,
    Person,
}

impl TisReferenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TisReferenceType::ProgrammeMembership => "ProgrammeMembership",
            TisReferenceType::Placement => "Placement",
            TisReferenceType::Form => "Form",
            TisReferenceType::LtftForm => "LtftForm",
            TisReferenceType::Person => "Person",
        }
    }

    pub fn from_string(s: &str) -> Result<TisReferenceType, AppError> {
        match s {
            "ProgrammeMembership" => Ok(Self::ProgrammeMembership),
            "Placement" => Ok(Self::Placement),
            "Form" => Ok(Self::Form),
            "LtftForm" => Ok(Self::LtftForm),
            "Person" => Ok(Self::Person),
            _ => Err(AppError::ValidationError(format!("Invalid TIS reference type: {}", s))),
        }
    }
}

/// Pointer at the upstream record a notification is about.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Deserialize, Serialize)]
pub struct TisReference {
    pub reference_type: TisReferenceType,
    pub id: String,
}

impl TisReference {
    pub fn new(reference_type: TisReferenceType, id: impl Into<String>) -> Self {
        Self { reference_type, id: id.into() }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Recipient {
    pub person_id: String,
    pub channel: MessageChannel,
    /// Resolved contact at dispatch time: an email address for EMAIL, the
    /// user account id for IN_APP.
    pub contact: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TemplateInfo {
    pub name: String,
    pub version: String,
    pub variables: Json,
}

/// Durable record of one notification's lifecycle.
///
/// # Fields
///
/// * `id` - Time-ordered opaque identifier
/// * `tis_reference` - Upstream entity the notification is about
/// * `notification_type` - Which notification this is
/// * `recipient` - Person, channel and resolved contact
/// * `template` - Template binding captured at planning time
/// * `sent_at` - Intended fire time while SCHEDULED, actual send time after
/// * `read_at` - Set exactly while status is READ
/// * `status` - Lifecycle state
/// * `status_detail` - Failure or suppression detail
/// * `last_retry` - Stamped on each outbox retry
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct History {
    pub id: String,
    pub tis_reference: TisReference,
    pub notification_type: NotificationType,
    pub recipient: Recipient,
    pub template: TemplateInfo,
    pub sent_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
    pub status: NotificationStatus,
    pub status_detail: Option<String>,
    pub last_retry: Option<DateTime<Utc>>,
}

impl History {
    /// Time-ordered identifier; lexicographic order follows creation order.
    pub fn generate_id() -> String {
        Uuid::now_v7().to_string()
    }

    pub fn new(
        id: Option<String>,
        tis_reference: TisReference,
        notification_type: NotificationType,
        recipient: Recipient,
        template: TemplateInfo,
        sent_at: DateTime<Utc>,
        status: NotificationStatus,
        status_detail: Option<String>
    ) -> Result<Self, AppError> {
        if recipient.person_id.trim().is_empty() {
            return Err(AppError::ValidationError("Recipient person id cannot be empty".to_string()));
        }

        if tis_reference.id.trim().is_empty() {
            return Err(AppError::ValidationError("TIS reference id cannot be empty".to_string()));
        }

        Ok(Self {
            id: id.unwrap_or_else(History::generate_id),
            tis_reference,
            notification_type,
            recipient,
            template,
            sent_at,
            read_at: None,
            status,
            status_detail,
            last_retry: None,
        })
    }

    /// Applies a status transition in place. Same-status updates are
    /// idempotent no-ops (`Ok(false)`); an illegal transition is an error.
    /// `read_at` is set exactly while the record is READ, and `sent_at`
    /// becomes the actual send time on the transition to SENT.
    pub fn apply_status(
        &mut self,
        status: NotificationStatus,
        detail: Option<String>,
        now: DateTime<Utc>
    ) -> Result<bool, AppError> {
        if self.status == status {
            return Ok(false);
        }

        if !self.status.can_transition_to(status) {
            return Err(
                AppError::ValidationError(
                    format!(
                        "Illegal status transition {} -> {} for history {}",
                        self.status.as_str(),
                        status.as_str(),
                        self.id
                    )
                )
            );
        }

        self.status = status;
        self.status_detail = detail;
        self.read_at = if status == NotificationStatus::Read { Some(now) } else { None };

        if status == NotificationStatus::Sent {
            self.sent_at = now;
        }

        Ok(true)
    }

    /// Sparse lookup key present only on open SCHEDULED rows; backs the
    /// at-most-one-open-schedule invariant.
    pub fn schedule_key(&self) -> Option<String> {
        if self.status == NotificationStatus::Scheduled {
            Some(Self::schedule_key_for(
                &self.recipient.person_id,
                &self.tis_reference,
                self.notification_type,
            ))
        } else {
            None
        }
    }

    pub fn schedule_key_for(
        person_id: &str,
        tis_reference: &TisReference,
        notification_type: NotificationType
    ) -> String {
        format!(
            "{}|{}|{}|{}",
            person_id,
            tis_reference.reference_type.as_str(),
            tis_reference.id,
            notification_type.as_str()
        )
    }
}

impl DynamoDbEntity for History {
    fn table_name() -> &'static str {
        "NotificationHistory"
    }

    fn primary_key(&self) -> String {
        self.id.clone()
    }

    fn from_item(item: &HashMap<String, AttributeValue>) -> Option<Self> {
        let id = item.get("id")?.as_s().ok()?.to_string();
        let person_id = item.get("person_id")?.as_s().ok()?.to_string();

        let channel_str = item.get("channel")?.as_s().ok()?;
        let channel = MessageChannel::from_string(channel_str).ok()?;

        let contact = item
            .get("contact")
            .and_then(|v| v.as_s().ok())
            .map(|s| s.to_string());

        let reference_type_str = item.get("tis_reference_type")?.as_s().ok()?;
        let reference_type = TisReferenceType::from_string(reference_type_str).ok()?;
        let reference_id = item.get("tis_reference_id")?.as_s().ok()?.to_string();

        let notification_type_str = item.get("notification_type")?.as_s().ok()?;
        let notification_type = NotificationType::from_string(notification_type_str).ok()?;

        let template_name = item.get("template_name")?.as_s().ok()?.to_string();
        let template_version = item.get("template_version")?.as_s().ok()?.to_string();
        let variables = item
            .get("template_variables")
            .and_then(|v| v.as_s().ok())
            .and_then(|s| serde_json::from_str::<Json>(s).ok())
            .unwrap_or_else(|| Json::Object(serde_json::Map::new()));

        let sent_at = item
            .get("sent_at")
            .and_then(|v| v.as_s().ok())
            .and_then(|s| s.parse::<DateTime<Utc>>().ok())?;

        let read_at = item
            .get("read_at")
            .and_then(|v| v.as_s().ok())
            .and_then(|s| s.parse::<DateTime<Utc>>().ok());

        let status_str = item.get("status")?.as_s().ok()?;
        let status = NotificationStatus::from_string(status_str).ok()?;

        let status_detail = item
            .get("status_detail")
            .and_then(|v| v.as_s().ok())
            .map(|s| s.to_string());

        let last_retry = item
            .get("last_retry")
            .and_then(|v| v.as_s().ok())
            .and_then(|s| s.parse::<DateTime<Utc>>().ok());

        Some(Self {
            id,
            tis_reference: TisReference { reference_type, id: reference_id },
            notification_type,
            recipient: Recipient { person_id, channel, contact },
            template: TemplateInfo {
                name: template_name,
                version: template_version,
                variables,
            },
            sent_at,
            read_at,
            status,
            status_detail,
            last_retry,
        })
    }

    fn to_item(&self) -> HashMap<String, AttributeValue> {
        let mut item = HashMap::new();

        item.insert("id".to_string(), AttributeValue::S(self.id.clone()));
        item.insert("person_id".to_string(), AttributeValue::S(self.recipient.person_id.clone()));
        item.insert("channel".to_string(), AttributeValue::S(self.recipient.channel.as_str().to_string()));

        if let Some(contact) = &self.recipient.contact {
            item.insert("contact".to_string(), AttributeValue::S(contact.clone()));
        }

        item.insert(
            "tis_reference_type".to_string(),
            AttributeValue::S(self.tis_reference.reference_type.as_str().to_string())
        );
        item.insert(
            "tis_reference_id".to_string(),
            AttributeValue::S(self.tis_reference.id.clone())
        );
        item.insert(
            "notification_type".to_string(),
            AttributeValue::S(self.notification_type.as_str().to_string())
        );
        item.insert("template_name".to_string(), AttributeValue::S(self.template.name.clone()));
        item.insert(
            "template_version".to_string(),
            AttributeValue::S(self.template.version.clone())
        );

        if let Ok(variables_json) = serde_json::to_string(&self.template.variables) {
            item.insert("template_variables".to_string(), AttributeValue::S(variables_json));
        }

        item.insert("sent_at".to_string(), AttributeValue::S(self.sent_at.to_rfc3339()));

        if let Some(read) = &self.read_at {
            item.insert("read_at".to_string(), AttributeValue::S(read.to_rfc3339()));
        }

        item.insert("status".to_string(), AttributeValue::S(self.status.as_str().to_string()));

        if let Some(detail) = &self.status_detail {
            item.insert("status_detail".to_string(), AttributeValue::S(detail.clone()));
        }

        if let Some(retry) = &self.last_retry {
            item.insert("last_retry".to_string(), AttributeValue::S(retry.to_rfc3339()));
        }

        // Sparse attribute: only open schedules carry it, so the GSI holds
        // at most one row per logical job.
        if let Some(key) = self.schedule_key() {
            item.insert("schedule_key".to_string(), AttributeValue::S(key));
        }

        item
    }
}
