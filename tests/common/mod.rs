//! In-memory stand-ins for the external collaborators, shared by the
//! orchestration tests.

#![allow(dead_code)]

use std::collections::{ HashMap, HashSet };
use std::sync::{ Arc, Mutex };

use async_trait::async_trait;
use chrono::{ DateTime, Utc };

use trainee_notify::config::TemplateConfig;
use trainee_notify::error::{ AppError, AppResult, DispatchResult };
use trainee_notify::models::account::UserDetails;
use trainee_notify::models::history::{
    History,
    MessageChannel,
    NotificationStatus,
    TisReference,
};
use trainee_notify::models::local_office_contact::LocalOfficeContact;
use trainee_notify::models::notification_type::NotificationType;
use trainee_notify::models::schedule_entry::{ ScheduleEntry, ScheduleState };
use trainee_notify::outbox::{ MailSender, Outbox, OutboundEmail };
use trainee_notify::scheduler::ScheduleStore;
use trainee_notify::services::history::HistoryStore;
use trainee_notify::services::messaging::RecipientGate;
use trainee_notify::services::notification::{ NotificationService, NotificationSettings };
use trainee_notify::services::reference::ContactReference;
use trainee_notify::services::user_directory::UserDirectory;
use trainee_notify::templates::{ TemplateEngine, TemplateVersions };

#[derive(Default)]
pub struct InMemoryHistory {
    pub rows: Mutex<HashMap<String, History>>,
    pub published: Mutex<Vec<History>>,
}

impl InMemoryHistory {
    pub fn seed(&self, record: History) {
        self.rows.lock().unwrap().insert(record.id.clone(), record);
    }

    pub fn all(&self) -> Vec<History> {
        self.rows.lock().unwrap().values().cloned().collect()
    }

    pub fn get(&self, id: &str) -> Option<History> {
        self.rows.lock().unwrap().get(id).cloned()
    }

    pub fn published_statuses(&self) -> Vec<NotificationStatus> {
        self.published.lock().unwrap().iter().map(|h| h.status).collect()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistory {
    async fn save(&self, mut history: History) -> AppResult<History> {
        if history.id.trim().is_empty() {
            history.id = History::generate_id();
        }
        self.rows.lock().unwrap().insert(history.id.clone(), history.clone());
        self.published.lock().unwrap().push(history.clone());
        Ok(history)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<History>> {
        Ok(self.get(id))
    }

    async fn find_all_by_person(&self, person_id: &str) -> AppResult<Vec<History>> {
        let mut records: Vec<History> = self
            .all()
            .into_iter()
            .filter(|h| h.recipient.person_id == person_id)
            .collect();
        records.sort_by(|a, b| b.sent_at.cmp(&a.sent_at));
        Ok(records)
    }

    async fn find_by_id_and_person(
        &self,
        id: &str,
        person_id: &str
    ) -> AppResult<Option<History>> {
        Ok(self.get(id).filter(|h| h.recipient.person_id == person_id))
    }

    async fn find_scheduled_for_trainee(
        &self,
        person_id: &str,
        tis_reference: &TisReference,
        notification_type: NotificationType
    ) -> AppResult<Option<History>> {
        Ok(
            self
                .all()
                .into_iter()
                .find(|h| {
                    h.status == NotificationStatus::Scheduled &&
                        h.recipient.person_id == person_id &&
                        h.tis_reference == *tis_reference &&
                        h.notification_type == notification_type
                })
        )
    }

    async fn find_for_job(
        &self,
        person_id: &str,
        tis_reference: &TisReference,
        notification_type: NotificationType
    ) -> AppResult<Vec<History>> {
        Ok(
            self
                .all()
                .into_iter()
                .filter(|h| {
                    h.recipient.person_id == person_id &&
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
        let mut rows = self.rows.lock().unwrap();
        let Some(record) = rows.get_mut(id) else {
            return Ok(None);
        };

        if record.apply_status(status, detail, Utc::now())? {
            self.published.lock().unwrap().push(record.clone());
        }

        Ok(Some(record.clone()))
    }

    async fn record_retry(&self, id: &str) -> AppResult<Option<History>> {
        let mut rows = self.rows.lock().unwrap();
        let Some(record) = rows.get_mut(id) else {
            return Ok(None);
        };
        record.last_retry = Some(Utc::now());
        Ok(Some(record.clone()))
    }

    async fn delete_by_id_and_person(&self, id: &str, person_id: &str) -> AppResult<bool> {
        let mut rows = self.rows.lock().unwrap();
        let matches = rows
            .get(id)
            .is_some_and(|h| h.recipient.person_id == person_id);

        if matches {
            let record = rows.remove(id).unwrap();
            self.published.lock().unwrap().push(record);
        }

        Ok(matches)
    }

    async fn find_all_scheduled(&self) -> AppResult<Vec<History>> {
        Ok(
            self
                .all()
                .into_iter()
                .filter(|h| h.status == NotificationStatus::Scheduled)
                .collect()
        )
    }
}

#[derive(Default)]
pub struct InMemoryScheduler {
    pub entries: Mutex<HashMap<String, ScheduleEntry>>,
}

impl InMemoryScheduler {
    pub fn pending(&self) -> Vec<ScheduleEntry> {
        let mut entries: Vec<ScheduleEntry> = self.entries
            .lock()
            .unwrap()
            .values()
            .filter(|e| e.state == ScheduleState::Pending)
            .cloned()
            .collect();
        entries.sort_by(|a, b| a.fire_at.cmp(&b.fire_at));
        entries
    }

    pub fn get(&self, job_id: &str) -> Option<ScheduleEntry> {
        self.entries.lock().unwrap().get(job_id).cloned()
    }
}

#[async_trait]
impl ScheduleStore for InMemoryScheduler {
    async fn schedule(
        &self,
        job_id: &str,
        payload: String,
        fire_at: DateTime<Utc>,
        window_secs: i64
    ) -> AppResult<()> {
        let entry = ScheduleEntry::new(job_id.to_string(), payload, fire_at, window_secs)?;
        self.entries.lock().unwrap().insert(job_id.to_string(), entry);
        Ok(())
    }

    async fn remove(&self, job_id: &str) -> AppResult<bool> {
        let mut entries = self.entries.lock().unwrap();
        let removable = entries
            .get(job_id)
            .is_some_and(|e| e.state == ScheduleState::Pending);
        if removable {
            entries.remove(job_id);
        }
        Ok(removable)
    }

    async fn list_pending(&self) -> AppResult<Vec<ScheduleEntry>> {
        Ok(self.pending())
    }
}

pub struct StaticGate {
    pub email_enabled: bool,
    pub in_app_enabled: bool,
    pub whitelist: HashSet<String>,
    pub remote_checks: bool,
}

impl StaticGate {
    pub fn allow_all() -> Self {
        Self {
            email_enabled: true,
            in_app_enabled: true,
            whitelist: HashSet::new(),
            remote_checks: true,
        }
    }
}

#[async_trait]
impl RecipientGate for StaticGate {
    fn is_valid_recipient(&self, person_id: &str, channel: MessageChannel) -> bool {
        if self.whitelist.contains(person_id) {
            return true;
        }
        match channel {
            MessageChannel::Email => self.email_enabled,
            MessageChannel::InApp => self.in_app_enabled,
        }
    }

    async fn is_placement_in_pilot_2024(&self, _person_id: &str, _placement_id: &str) -> bool {
        self.remote_checks
    }

    async fn is_programme_membership_in_pilot_2024(
        &self,
        _person_id: &str,
        _programme_membership_id: &str
    ) -> bool {
        self.remote_checks
    }

    async fn is_programme_membership_new_starter(
        &self,
        _person_id: &str,
        _programme_membership_id: &str
    ) -> bool {
        self.remote_checks
    }
}

#[derive(Default)]
pub struct FakeDirectory {
    pub accounts: HashMap<String, HashSet<String>>,
    pub details: HashMap<String, UserDetails>,
}

impl FakeDirectory {
    pub fn with_user(person_id: &str, user_id: &str, email: &str) -> Self {
        let mut directory = Self::default();
        directory.accounts.insert(
            person_id.to_string(),
            HashSet::from([user_id.to_string()])
        );
        directory.details.insert(user_id.to_string(), UserDetails {
            email: email.to_string(),
            family_name: Some("Gilliam".to_string()),
            given_name: Some("Anthony".to_string()),
            gmc_number: None,
        });
        directory
    }
}

#[async_trait]
impl UserDirectory for FakeDirectory {
    async fn get_user_account_ids(&self, person_id: &str) -> AppResult<HashSet<String>> {
        Ok(self.accounts.get(person_id).cloned().unwrap_or_default())
    }

    async fn get_user_details_by_id(&self, user_id: &str) -> AppResult<UserDetails> {
        self.details
            .get(user_id)
            .cloned()
            .ok_or_else(|| AppError::UserNotFound(user_id.to_string()))
    }

    async fn get_user_details_by_email(&self, email: &str) -> AppResult<UserDetails> {
        self.details
            .values()
            .find(|d| d.email == email)
            .cloned()
            .ok_or_else(|| AppError::UserNotFound(email.to_string()))
    }
}

#[derive(Default)]
pub struct FakeReference {
    pub contacts: HashMap<String, Vec<LocalOfficeContact>>,
}

#[async_trait]
impl ContactReference for FakeReference {
    async fn get_local_office_contacts(
        &self,
        owner: &str
    ) -> AppResult<Vec<LocalOfficeContact>> {
        Ok(self.contacts.get(owner).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
pub struct RecordingOutbox {
    pub enqueued: Mutex<Vec<String>>,
}

impl RecordingOutbox {
    pub fn ids(&self) -> Vec<String> {
        self.enqueued.lock().unwrap().clone()
    }
}

#[async_trait]
impl Outbox for RecordingOutbox {
    async fn enqueue(&self, notification_id: &str) -> AppResult<()> {
        self.enqueued.lock().unwrap().push(notification_id.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<OutboundEmail>>,
}

impl RecordingMailer {
    pub fn messages(&self) -> Vec<OutboundEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailSender for RecordingMailer {
    async fn send(&self, email: &OutboundEmail) -> DispatchResult<()> {
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

/// A template engine with every known type registered at the default
/// version.
pub fn test_templates() -> Arc<TemplateEngine> {
    let config = TemplateConfig {
        default_version: "v1.0.0".to_string(),
        version_overrides: None,
        root: "templates".to_string(),
    };

    let versions = TemplateVersions::from_config(&config).unwrap();
    let mut engine = TemplateEngine::new(chrono_tz::Europe::London, versions);

    for notification_type in NotificationType::all() {
        for channel in notification_type.channels() {
            engine
                .register(
                    channel.message_type(),
                    notification_type.template_name(),
                    "v1.0.0",
                    "Update for {{personId}}",
                    "<p>Hello {{personId}}</p>"
                )
                .unwrap();
        }
    }

    Arc::new(engine)
}

pub struct Harness {
    pub service: Arc<NotificationService>,
    pub history: Arc<InMemoryHistory>,
    pub scheduler: Arc<InMemoryScheduler>,
    pub outbox: Arc<RecordingOutbox>,
    pub mailer: Arc<RecordingMailer>,
}

pub fn harness(gate: StaticGate, directory: FakeDirectory) -> Harness {
    let history = Arc::new(InMemoryHistory::default());
    let scheduler = Arc::new(InMemoryScheduler::default());
    let outbox = Arc::new(RecordingOutbox::default());
    let mailer = Arc::new(RecordingMailer::default());

    let settings = NotificationSettings {
        timezone: chrono_tz::Europe::London,
        delay_minutes: 0,
        support_contact: "TSS_SUPPORT".to_string(),
    };

    let service = Arc::new(
        NotificationService::new(
            history.clone(),
            scheduler.clone(),
            Arc::new(gate),
            Arc::new(directory),
            Arc::new(FakeReference::default()),
            outbox.clone(),
            mailer.clone(),
            test_templates(),
            settings
        )
    );

    Harness { service, history, scheduler, outbox, mailer }
}
