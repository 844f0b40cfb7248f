//! The history store: durable truth for every notification's lifecycle.
//!
//! All mutation goes through this service so the status state machine is
//! enforced in one place and every change is broadcast exactly once.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use crate::error::AppResult;
use crate::models::history::{ History, NotificationStatus, TisReference };
use crate::models::notification_type::NotificationType;
use crate::repository::Repository;
use crate::services::broadcaster::EventSink;

#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Persists a record, assigning an id when absent. Idempotent by id.
    async fn save(&self, history: History) -> AppResult<History>;

    async fn find_by_id(&self, id: &str) -> AppResult<Option<History>>;

    /// Every record for a person, newest first.
    async fn find_all_by_person(&self, person_id: &str) -> AppResult<Vec<History>>;

    async fn find_by_id_and_person(
        &self,
        id: &str,
        person_id: &str
    ) -> AppResult<Option<History>>;

    /// The unique open schedule for a logical job, if one exists.
    async fn find_scheduled_for_trainee(
        &self,
        person_id: &str,
        tis_reference: &TisReference,
        notification_type: NotificationType
    ) -> AppResult<Option<History>>;

    /// Any record for the logical job regardless of status; used for the
    /// re-planning dedup check.
    async fn find_for_job(
        &self,
        person_id: &str,
        tis_reference: &TisReference,
        notification_type: NotificationType
    ) -> AppResult<Vec<History>>;

    /// Applies a status transition. Returns `None` for an unknown id; an
    /// illegal transition is a validation error. Same-status updates are
    /// no-ops returning the unchanged record.
    async fn update_status(
        &self,
        id: &str,
        status: NotificationStatus,
        detail: Option<String>
    ) -> AppResult<Option<History>>;

    /// Stamps the retry marker without changing status.
    async fn record_retry(&self, id: &str) -> AppResult<Option<History>>;

    async fn delete_by_id_and_person(&self, id: &str, person_id: &str) -> AppResult<bool>;

    /// All open SCHEDULED rows; input to the reconciliation sweep.
    async fn find_all_scheduled(&self) -> AppResult<Vec<History>>;
}

pub struct HistoryService {
    repository: Repository,
    events: Arc<dyn EventSink>,
}

impl HistoryService {
    pub fn new(repository: Repository, events: Arc<dyn EventSink>) -> Self {
        Self { repository, events }
    }
}

#[async_trait]
impl HistoryStore for HistoryService {
    async fn save(&self, mut history: History) -> AppResult<History> {
        if history.id.trim().is_empty() {
            history.id = History::generate_id();
        }

        let saved = self.repository.put(history).await?;
        self.events.publish(&saved).await;
        Ok(saved)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<History>> {
        self.repository.get::<History>(id.to_string()).await
    }

    async fn find_all_by_person(&self, person_id: &str) -> AppResult<Vec<History>> {
        let mut records = self.repository
            .query_index::<History>("PersonIndex", "person_id", person_id.to_string()).await?;

        records.sort_by(|a, b| b.sent_at.cmp(&a.sent_at));
        Ok(records)
    }

    async fn find_by_id_and_person(
        &self,
        id: &str,
        person_id: &str
    ) -> AppResult<Option<History>> {
        let record = self.repository.get::<History>(id.to_string()).await?;
        Ok(record.filter(|h| h.recipient.person_id == person_id))
    }

    async fn find_scheduled_for_trainee(
        &self,
        person_id: &str,
        tis_reference: &TisReference,
        notification_type: NotificationType
    ) -> AppResult<Option<History>> {
        let key = History::schedule_key_for(person_id, tis_reference, notification_type);
        let records = self.repository
            .query_index::<History>("ScheduleIndex", "schedule_key", key).await?;

        Ok(records.into_iter().next())
    }

    async fn find_for_job(
        &self,
        person_id: &str,
        tis_reference: &TisReference,
        notification_type: NotificationType
    ) -> AppResult<Vec<History>> {
        let records = self.find_all_by_person(person_id).await?;
        Ok(
            records
                .into_iter()
                .filter(|h| {
                    h.tis_reference == *tis_reference &&
                        h.notification_type == notification_type
                })
                .collect()
        )
    }

    async fn update_status(
        &self,
        id: &str,
        status: NotificationStatus,
        detail: Option<String>
    ) -> AppResult<Option<History>> {
        let Some(mut record) = self.repository.get::<History>(id.to_string()).await? else {
            return Ok(None);
        };

        if !record.apply_status(status, detail, Utc::now())? {
            return Ok(Some(record));
        }

        let updated = self.repository.put(record).await?;
        info!("History {} transitioned to {}", id, status.as_str());
        self.events.publish(&updated).await;
        Ok(Some(updated))
    }

    async fn record_retry(&self, id: &str) -> AppResult<Option<History>> {
        let Some(mut record) = self.repository.get::<History>(id.to_string()).await? else {
            return Ok(None);
        };

        record.last_retry = Some(Utc::now());
        let updated = self.repository.put(record).await?;
        Ok(Some(updated))
    }

    async fn delete_by_id_and_person(&self, id: &str, person_id: &str) -> AppResult<bool> {
        let Some(record) = self.find_by_id_and_person(id, person_id).await? else {
            return Ok(false);
        };

        // Synthetic terminal event precedes the removal so subscribers see
        // the deletion in order.
        let mut tombstone = record.clone();
        tombstone.status = NotificationStatus::Deleted;
        tombstone.status_detail = None;
        tombstone.read_at = None;
        tombstone.template.variables = serde_json::Value::Object(serde_json::Map::new());
        tombstone.sent_at = Utc::now();
        self.events.publish(&tombstone).await;

        self.repository.delete::<History>(id.to_string()).await
    }

    async fn find_all_scheduled(&self) -> AppResult<Vec<History>> {
        self.repository
            .query_index::<History>(
                "StatusIndex",
                "status",
                NotificationStatus::Scheduled.as_str().to_string()
            ).await
    }
}
