//! Persisted fire-time queue.
//!
//! Entries live in the document store keyed by job id; the worker loop
//! wakes on the earliest pending fire time (or a schedule upsert) and runs
//! the single registered handler. Mutual exclusion per job id is the
//! conditional PENDING -> FIRING transition: whichever worker wins the
//! condition owns the fire. Firing is at-least-once under crash recovery,
//! so handlers are idempotent on `(job_id, fire_at)`.

use std::sync::Arc;
use std::sync::atomic::{ AtomicI64, Ordering };
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{ DateTime, Utc };
use tokio::sync::{ Notify, watch };
use tracing::{ error, info, warn };

use crate::error::{ AppError, AppResult, DispatchResult };
use crate::models::schedule_entry::{ ScheduleEntry, ScheduleState };
use crate::repository::{ DynamoDbEntity, Repository };

const FIRE_TIMEOUT: Duration = Duration::from_secs(30);
const IDLE_POLL: Duration = Duration::from_secs(60);

pub const MISSED_SCHEDULE_DETAIL: &str = "Missed Schedule";

/// The single handler invoked when a schedule fires.
#[async_trait]
pub trait FireHandler: Send + Sync {
    async fn handle(&self, job_id: &str, payload: &str) -> DispatchResult<()>;
}

/// The schedule persistence operations the orchestrator depends on.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// Upserts a pending entry; an existing entry for the job id is
    /// replaced outright, payload and fire time included.
    async fn schedule(
        &self,
        job_id: &str,
        payload: String,
        fire_at: DateTime<Utc>,
        window_secs: i64
    ) -> AppResult<()>;

    /// Removes a pending entry. Removal after firing is a no-op.
    async fn remove(&self, job_id: &str) -> AppResult<bool>;

    async fn list_pending(&self) -> AppResult<Vec<ScheduleEntry>>;
}

pub struct Scheduler {
    repository: Repository,
    wake: Notify,
    heartbeat: AtomicI64,
}

impl Scheduler {
    pub fn new(repository: Repository) -> Self {
        Self {
            repository,
            wake: Notify::new(),
            heartbeat: AtomicI64::new(Utc::now().timestamp()),
        }
    }

    /// Whether the worker loop has run recently; feeds the health probe.
    pub fn is_live(&self) -> bool {
        let last = self.heartbeat.load(Ordering::Relaxed);
        Utc::now().timestamp() - last < (IDLE_POLL.as_secs() as i64) * 3
    }

    /// Claims an entry for firing. Loses gracefully when another worker got
    /// there first or the entry was removed.
    async fn claim(&self, job_id: &str) -> AppResult<bool> {
        let result = self.repository
            .client()
            .update_item()
            .table_name(ScheduleEntry::table_name())
            .key("id", AttributeValue::S(job_id.to_string()))
            .update_expression("SET #s = :firing, updated_at = :now")
            .condition_expression("#s = :pending")
            .expression_attribute_names("#s", "state")
            .expression_attribute_values(":firing", AttributeValue::S(ScheduleState::Firing.as_str().to_string()))
            .expression_attribute_values(":pending", AttributeValue::S(ScheduleState::Pending.as_str().to_string()))
            .expression_attribute_values(":now", AttributeValue::S(Utc::now().to_rfc3339()))
            .send().await;

        match result {
            Ok(_) => Ok(true),
            Err(e) if e.to_string().contains("ConditionalCheckFailed") => Ok(false),
            Err(e) => Err(AppError::DatabaseError(format!("Failed to claim schedule: {}", e))),
        }
    }

    async fn complete(&self, mut entry: ScheduleEntry, failure: Option<String>) -> AppResult<()> {
        entry.state = ScheduleState::Done;
        entry.failure = failure;
        entry.updated_at = Utc::now();
        self.repository.put(entry).await?;
        Ok(())
    }

    /// Fires everything due and reports the next pending fire time.
    pub async fn fire_due(
        &self,
        handler: &Arc<dyn FireHandler>
    ) -> AppResult<Option<DateTime<Utc>>> {
        let pending = self.list_pending().await?;
        let now = Utc::now();
        let mut next_fire: Option<DateTime<Utc>> = None;

        for entry in pending {
            if entry.fire_at > now {
                next_fire = match next_fire {
                    Some(t) if t <= entry.fire_at => Some(t),
                    _ => Some(entry.fire_at),
                };
                continue;
            }

            if !self.claim(&entry.job_id).await? {
                continue;
            }

            if entry.is_missed(now) && entry.window_secs == 0 {
                warn!("Dropping missed schedule {} (no grace window)", entry.job_id);
                self.complete(entry, Some(MISSED_SCHEDULE_DETAIL.to_string())).await?;
                continue;
            }

            let job_id = entry.job_id.clone();
            let outcome = tokio::time
                ::timeout(FIRE_TIMEOUT, handler.handle(&entry.job_id, &entry.payload)).await;

            let failure = match outcome {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(e.to_string()),
                Err(_) => Some("Fire handler timed out".to_string()),
            };

            if let Some(reason) = &failure {
                error!("Fire of {} failed: {}", job_id, reason);
            } else {
                info!("Fired schedule {}", job_id);
            }

            self.complete(entry, failure).await?;
        }

        Ok(next_fire)
    }

    /// Worker loop: wakes on the earliest fire time, a schedule upsert or
    /// shutdown. Runs missed-fire recovery on its first pass.
    pub async fn run(
        self: Arc<Self>,
        handler: Arc<dyn FireHandler>,
        mut shutdown: watch::Receiver<bool>
    ) {
        info!("Scheduler worker started");

        loop {
            self.heartbeat.store(Utc::now().timestamp(), Ordering::Relaxed);

            let next_fire = match self.fire_due(&handler).await {
                Ok(next) => next,
                Err(e) => {
                    error!("Scheduler pass failed: {}", e);
                    None
                }
            };

            let sleep_for = next_fire
                .map(|t| {
                    (t - Utc::now()).to_std().unwrap_or(Duration::ZERO)
                })
                .unwrap_or(IDLE_POLL)
                .min(IDLE_POLL);

            tokio::select! {
                _ = tokio::time::sleep(sleep_for) => {}
                _ = self.wake.notified() => {}
                _ = shutdown.changed() => {
                    info!("Scheduler worker stopping");
                    break;
                }
            }
        }
    }
}

#[async_trait]
impl ScheduleStore for Scheduler {
    async fn schedule(
        &self,
        job_id: &str,
        payload: String,
        fire_at: DateTime<Utc>,
        window_secs: i64
    ) -> AppResult<()> {
        let entry = ScheduleEntry::new(job_id.to_string(), payload, fire_at, window_secs)?;
        self.repository.put(entry).await?;
        self.wake.notify_one();
        Ok(())
    }

    async fn remove(&self, job_id: &str) -> AppResult<bool> {
        let result = self.repository
            .client()
            .delete_item()
            .table_name(ScheduleEntry::table_name())
            .key("id", AttributeValue::S(job_id.to_string()))
            .condition_expression("#s = :pending")
            .expression_attribute_names("#s", "state")
            .expression_attribute_values(":pending", AttributeValue::S(ScheduleState::Pending.as_str().to_string()))
            .send().await;

        match result {
            Ok(_) => Ok(true),
            Err(e) if e.to_string().contains("ConditionalCheckFailed") => Ok(false),
            Err(e) => Err(AppError::DatabaseError(format!("Failed to remove schedule: {}", e))),
        }
    }

    async fn list_pending(&self) -> AppResult<Vec<ScheduleEntry>> {
        self.repository
            .query_index::<ScheduleEntry>(
                "StateIndex",
                "state",
                ScheduleState::Pending.as_str().to_string()
            ).await
    }
}
