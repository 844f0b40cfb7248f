//! Notification orchestration.
//!
//! Turns a domain entity into zero or more deliveries: enriches it, applies
//! the eligibility and suppression rules, computes milestones, upserts
//! schedules keyed by stable job identity, fires immediate deliveries,
//! persists history and heals missed schedules. Everything it touches is
//! behind a capability trait so the domain services stay pure and the whole
//! flow is testable against in-memory fakes.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{ DateTime, Duration, Utc };
use chrono_tz::Tz;
use serde_json::Value as Json;
use tracing::{ info, warn };

use crate::config::NotificationConfig;
use crate::error::{ AppError, AppResult, DispatchError, DispatchResult };
use crate::models::account::AccountUpdate;
use crate::models::forms::FormUpdate;
use crate::models::gmc::GmcUpdate;
use crate::models::history::{
    History,
    MessageChannel,
    NotificationStatus,
    Recipient,
    TemplateInfo,
    TisReference,
    TisReferenceType,
};
use crate::models::local_office_contact::{ ContactHref, LocalOfficeContact };
use crate::models::ltft::LtftUpdate;
use crate::models::notification_type::NotificationType;
use crate::models::placement::Placement;
use crate::models::planned::{ job_id, JobData, PlannedNotification };
use crate::models::programme_membership::ProgrammeMembership;
use crate::outbox::{ MailSender, Outbox, OutboundEmail };
use crate::scheduler::{ FireHandler, ScheduleStore, MISSED_SCHEDULE_DETAIL };
use crate::services::account::AccountService;
use crate::services::coj::CojService;
use crate::services::forms::FormService;
use crate::services::gmc::GmcService;
use crate::services::history::HistoryStore;
use crate::services::ltft::LtftService;
use crate::services::messaging::RecipientGate;
use crate::services::placement::PlacementService;
use crate::services::programme::ProgrammeMembershipService;
use crate::services::reference::ContactReference;
use crate::services::user_directory::UserDirectory;
use crate::templates::TemplateEngine;

pub const SUPPRESSED_DETAIL: &str = "suppressed";

/// Dispatch within this margin of the fire time happens inline instead of
/// through the schedule store.
const IMMEDIATE_EPSILON_SECS: i64 = 2;

#[derive(Clone, Debug)]
pub struct NotificationSettings {
    pub timezone: Tz,
    pub delay_minutes: i64,
    pub support_contact: String,
}

impl NotificationSettings {
    pub fn from_config(config: &NotificationConfig) -> Self {
        Self {
            timezone: config.timezone,
            delay_minutes: config.delay_minutes,
            support_contact: config.support_contact.clone(),
        }
    }
}

pub struct NotificationService {
    history: Arc<dyn HistoryStore>,
    schedules: Arc<dyn ScheduleStore>,
    gate: Arc<dyn RecipientGate>,
    directory: Arc<dyn UserDirectory>,
    reference: Arc<dyn ContactReference>,
    outbox: Arc<dyn Outbox>,
    mailer: Arc<dyn MailSender>,
    templates: Arc<TemplateEngine>,
    settings: NotificationSettings,
}

impl NotificationService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        history: Arc<dyn HistoryStore>,
        schedules: Arc<dyn ScheduleStore>,
        gate: Arc<dyn RecipientGate>,
        directory: Arc<dyn UserDirectory>,
        reference: Arc<dyn ContactReference>,
        outbox: Arc<dyn Outbox>,
        mailer: Arc<dyn MailSender>,
        templates: Arc<TemplateEngine>,
        settings: NotificationSettings
    ) -> Self {
        Self {
            history,
            schedules,
            gate,
            directory,
            reference,
            outbox,
            mailer,
            templates,
            settings,
        }
    }

    // ----- public operations consumed by listeners ---------------------

    pub async fn apply_programme_membership(
        &self,
        membership: &ProgrammeMembership
    ) -> DispatchResult<()> {
        let today = Utc::now().with_timezone(&self.settings.timezone).date_naive();

        let eligible =
            !ProgrammeMembershipService::is_excluded(membership, today) &&
            self.gate
                .is_programme_membership_new_starter(&membership.person_id, &membership.tis_id)
                .await;

        let mut plans = if eligible {
            ProgrammeMembershipService::plan(membership, self.settings.timezone)
        } else {
            Vec::new()
        };

        let contact = self.resolve_office_contact(membership.managing_deanery.as_deref()).await;
        for plan in &mut plans {
            enrich_with_contact(&mut plan.variables, &contact);
        }

        self.apply_plans(
            &membership.person_id,
            NotificationType::programme_milestones(),
            &TisReference::new(TisReferenceType::ProgrammeMembership, membership.tis_id.clone()),
            plans,
            true
        ).await
    }

    pub async fn apply_placement(&self, placement: &Placement) -> DispatchResult<()> {
        let today = Utc::now().with_timezone(&self.settings.timezone).date_naive();

        let eligible =
            !PlacementService::is_excluded(placement, today) &&
            self.gate.is_placement_in_pilot_2024(&placement.person_id, &placement.tis_id).await;

        let mut plans = if eligible {
            PlacementService::plan(placement, self.settings.timezone)
        } else {
            Vec::new()
        };

        let contact = self.resolve_office_contact(placement.owner.as_deref()).await;
        for plan in &mut plans {
            enrich_with_contact(&mut plan.variables, &contact);
        }

        self.apply_plans(
            &placement.person_id,
            NotificationType::placement_milestones(),
            &TisReference::new(TisReferenceType::Placement, placement.tis_id.clone()),
            plans,
            true
        ).await
    }

    pub async fn delete_programme_membership(&self, tis_id: &str) -> DispatchResult<()> {
        self.clean_reference(TisReferenceType::ProgrammeMembership, tis_id).await
    }

    pub async fn delete_placement(&self, tis_id: &str) -> DispatchResult<()> {
        self.clean_reference(TisReferenceType::Placement, tis_id).await
    }

    pub async fn apply_coj(&self, membership: &ProgrammeMembership) -> DispatchResult<()> {
        let plans = CojService::plan(membership);
        let reference = TisReference::new(
            TisReferenceType::ProgrammeMembership,
            membership.tis_id.clone()
        );
        self.apply_plans(&membership.person_id, &[], &reference, plans, false).await
    }

    pub async fn apply_form(&self, form: &FormUpdate) -> DispatchResult<()> {
        let plans = FormService::plan(form);
        let reference = TisReference::new(TisReferenceType::Form, form.form_name.clone());
        self.apply_plans(&form.person_id, &[], &reference, plans, false).await
    }

    pub async fn apply_gmc(&self, update: &GmcUpdate) -> DispatchResult<()> {
        let plans = GmcService::plan(update);
        let reference = TisReference::new(TisReferenceType::Person, update.person_id.clone());
        self.apply_plans(&update.person_id, &[], &reference, plans, false).await
    }

    pub async fn apply_ltft(&self, update: &LtftUpdate) -> DispatchResult<()> {
        let reference = TisReference::new(TisReferenceType::LtftForm, update.form_ref.clone());

        // The user's action supersedes any reminder still pending for this
        // form, whatever its type.
        for superseded in LtftService::superseded_types() {
            self.clean_stale(&update.person_id, &reference, *superseded).await?;
        }

        let plans = LtftService::plan(update);
        self.apply_plans(&update.person_id, &[], &reference, plans, false).await
    }

    pub async fn apply_account(&self, update: &AccountUpdate) -> DispatchResult<()> {
        let is_new_user = match self.directory.get_user_account_ids(&update.person_id).await {
            Ok(ids) => ids.is_empty(),
            Err(_) => false,
        };

        let plans = AccountService::plan(update, is_new_user);
        let reference = TisReference::new(TisReferenceType::Person, update.person_id.clone());
        self.apply_plans(&update.person_id, &[], &reference, plans, false).await
    }

    /// Bypasses milestone computation entirely; the configured minimum
    /// delay still applies.
    pub async fn send_immediate(
        &self,
        person_id: &str,
        notification_type: NotificationType,
        reference_type: TisReferenceType,
        reference_id: &str,
        variables: Json
    ) -> DispatchResult<()> {
        let reference = TisReference::new(reference_type, reference_id.to_string());
        let fire_at = Utc::now() + Duration::minutes(self.settings.delay_minutes);

        let plan = PlannedNotification::new(
            notification_type,
            notification_type.channels()[0],
            variables,
            fire_at,
            reference.clone()
        );

        self.apply_plans(person_id, &[], &reference, vec![plan], false).await
    }

    /// Loads a history row, re-renders it from the recorded template and
    /// submits it to the mail gateway. Invoked by the outbox worker for
    /// every wake-up; idempotent for rows already sent.
    pub async fn resend_scheduled(&self, history_id: &str) -> DispatchResult<()> {
        let Some(record) = self.history.find_by_id(history_id).await? else {
            return Err(DispatchError::Validation(format!("Unknown history id {}", history_id)));
        };

        match record.status {
            NotificationStatus::Scheduled => {}
            NotificationStatus::Sent => {
                return Ok(());
            }
            other => {
                return Err(
                    DispatchError::Validation(
                        format!("History {} is {}, not sendable", history_id, other.as_str())
                    )
                );
            }
        }

        let rendered = self.templates.render(
            MessageChannel::Email.message_type(),
            record.notification_type,
            &record.template.version,
            &record.template.variables
        )?;

        let to = match &record.recipient.contact {
            Some(contact) => contact.clone(),
            None => {
                match self.resolve_email(&record.recipient.person_id).await {
                    Ok(email) => email,
                    Err(e) => {
                        self.history.update_status(
                            history_id,
                            NotificationStatus::Failed,
                            Some(format!("Contact resolution failed: {}", e))
                        ).await?;
                        return Ok(());
                    }
                }
            }
        };

        let email = OutboundEmail {
            to,
            subject: rendered.subject,
            html_body: rendered.body,
            notification_id: history_id.to_string(),
        };

        match self.mailer.send(&email).await {
            Ok(()) => {
                self.history.update_status(history_id, NotificationStatus::Sent, None).await?;
                Ok(())
            }
            Err(DispatchError::Transient(reason)) => {
                self.history.record_retry(history_id).await?;
                Err(DispatchError::Transient(reason))
            }
            Err(e) => {
                self.history.update_status(
                    history_id,
                    NotificationStatus::Failed,
                    Some(e.to_string())
                ).await?;
                Ok(())
            }
        }
    }

    /// Provider feedback (bounce or complaint) terminates a sent record.
    pub async fn record_delivery_feedback(
        &self,
        notification_id: &str,
        detail: String
    ) -> DispatchResult<()> {
        let updated = self.history.update_status(
            notification_id,
            NotificationStatus::Failed,
            Some(detail)
        ).await?;

        if updated.is_none() {
            warn!("Delivery feedback for unknown history {}", notification_id);
        }

        Ok(())
    }

    /// Reconciliation sweep: heal SCHEDULED rows with no matching schedule
    /// entry. Rows still within their grace window are replayed; the rest
    /// are failed.
    pub async fn sweep_orphans(&self) -> AppResult<()> {
        let scheduled = self.history.find_all_scheduled().await?;
        let pending: HashSet<String> = self.schedules
            .list_pending().await?
            .into_iter()
            .map(|e| e.job_id)
            .collect();
        let now = Utc::now();

        for record in scheduled {
            let job = job_id(record.notification_type, &record.tis_reference.id);
            if pending.contains(&job) {
                continue;
            }

            let window = Duration::seconds(record.notification_type.window_secs());

            if record.sent_at > now || now <= record.sent_at + window {
                // The schedule insertion was lost; put it back. Past-due
                // rows replay immediately.
                let fire_at = record.sent_at.max(now);
                info!("Healing orphan schedule {} (fire at {})", job, fire_at);
                let payload = job_payload_from_history(&record)?;
                self.schedules
                    .schedule(&job, payload, fire_at, record.notification_type.window_secs())
                    .await?;
            } else {
                info!("Failing orphan schedule {} past its window", job);
                self.history.update_status(
                    &record.id,
                    NotificationStatus::Failed,
                    Some(MISSED_SCHEDULE_DETAIL.to_string())
                ).await?;
            }
        }

        Ok(())
    }

    // ----- planning internals ------------------------------------------

    /// Steps 3-8 of the apply-entity algorithm for one batch of plans.
    /// `family_types` lists every milestone type of the entity family so
    /// stale jobs are cleaned even when no longer planned.
    async fn apply_plans(
        &self,
        person_id: &str,
        family_types: &[NotificationType],
        reference: &TisReference,
        plans: Vec<PlannedNotification>,
        dedupe: bool
    ) -> DispatchResult<()> {
        let planned_types: HashSet<NotificationType> = plans
            .iter()
            .map(|p| p.notification_type)
            .collect();

        for notification_type in family_types {
            if !planned_types.contains(notification_type) {
                self.clean_stale(person_id, reference, *notification_type).await?;
            }
        }

        let now = Utc::now();

        for plan in plans {
            let notification_type = plan.notification_type;

            if dedupe {
                let previous = self.history
                    .find_for_job(person_id, reference, notification_type).await?;
                if previous.iter().any(|h| h.status.is_terminal_for_planning()) {
                    self.clean_stale(person_id, reference, notification_type).await?;
                    continue;
                }
            }

            // Per-channel suppression; a gated channel leaves an audit row.
            let mut surviving = Vec::new();
            for channel in notification_type.channels() {
                if self.gate.is_valid_recipient(person_id, *channel) {
                    surviving.push(*channel);
                } else {
                    self.record_suppressed(person_id, &plan, *channel).await?;
                }
            }

            if surviving.is_empty() {
                self.clean_stale(person_id, reference, notification_type).await?;
                continue;
            }

            // Missed milestones fire immediately when the type permits it,
            // otherwise they are dropped.
            let window = Duration::seconds(plan.window_secs);
            let fire_at = if plan.fire_at < now - window {
                if notification_type.allows_missed_fire() {
                    now
                } else {
                    self.clean_stale(person_id, reference, notification_type).await?;
                    continue;
                }
            } else {
                plan.fire_at
            };

            let job = JobData {
                person_id: person_id.to_string(),
                notification_type,
                tis_reference: reference.clone(),
                channels: surviving,
                variables: plan.variables.clone(),
            };

            self.schedule_or_send(job, fire_at, plan.window_secs).await?;
        }

        Ok(())
    }

    async fn schedule_or_send(
        &self,
        job: JobData,
        fire_at: DateTime<Utc>,
        window_secs: i64
    ) -> DispatchResult<()> {
        let now = Utc::now();
        let record = self.upsert_scheduled_history(&job, fire_at).await?;

        if fire_at > now + Duration::seconds(IMMEDIATE_EPSILON_SECS) {
            let payload = serde_json
                ::to_string(&job)
                .map_err(|e| DispatchError::Fatal(format!("Unserializable job: {}", e)))?;
            self.schedules.schedule(&job.job_id(), payload, fire_at, window_secs).await?;
            info!("Scheduled {} for {}", job.job_id(), fire_at);
        } else {
            self.dispatch(&job, record).await?;
        }

        Ok(())
    }

    /// Creates or refreshes the unique open SCHEDULED row for a job.
    async fn upsert_scheduled_history(
        &self,
        job: &JobData,
        fire_at: DateTime<Utc>
    ) -> DispatchResult<History> {
        let primary = job.channels[0];
        let version = self.templates
            .versions()
            .resolve(job.notification_type, primary)?
            .to_string();

        let template = TemplateInfo {
            name: job.notification_type.template_name().to_string(),
            version,
            variables: job.variables.clone(),
        };

        let existing = self.history
            .find_scheduled_for_trainee(&job.person_id, &job.tis_reference, job.notification_type)
            .await?;

        let record = match existing {
            Some(mut record) => {
                record.sent_at = fire_at;
                record.template = template;
                record.recipient.channel = primary;
                self.history.save(record).await?
            }
            None => {
                let record = History::new(
                    None,
                    job.tis_reference.clone(),
                    job.notification_type,
                    Recipient {
                        person_id: job.person_id.clone(),
                        channel: primary,
                        contact: None,
                    },
                    template,
                    fire_at,
                    NotificationStatus::Scheduled,
                    None
                )?;
                self.history.save(record).await?
            }
        };

        Ok(record)
    }

    /// Fire-time delivery of one job across its channels.
    async fn dispatch(&self, job: &JobData, record: History) -> DispatchResult<()> {
        let mut email_handed_off = false;

        for channel in &job.channels {
            match channel {
                MessageChannel::Email => {
                    let email = match self.resolve_email(&job.person_id).await {
                        Ok(email) => email,
                        Err(e) => {
                            self.history.update_status(
                                &record.id,
                                NotificationStatus::Failed,
                                Some(format!("Contact resolution failed: {}", e))
                            ).await?;
                            return Ok(());
                        }
                    };

                    // Render now so a broken binding surfaces before the
                    // wake-up is queued; the outbox re-renders on delivery.
                    self.templates.render(
                        MessageChannel::Email.message_type(),
                        job.notification_type,
                        &record.template.version,
                        &record.template.variables
                    )?;

                    let mut updated = record.clone();
                    updated.recipient.contact = Some(email);
                    self.history.save(updated).await?;

                    self.outbox.enqueue(&record.id).await?;
                    email_handed_off = true;
                }
                MessageChannel::InApp => {
                    self.persist_in_app(job).await?;
                }
            }
        }

        if !email_handed_off {
            // No provider hand-off to wait on; the job is done.
            self.history.update_status(&record.id, NotificationStatus::Sent, None).await?;
        }

        Ok(())
    }

    /// In-app delivery is a fresh UNREAD row the trainee can read and
    /// archive, separate from the schedule-bearing record.
    async fn persist_in_app(&self, job: &JobData) -> DispatchResult<()> {
        let version = self.templates
            .versions()
            .resolve(job.notification_type, MessageChannel::InApp)?
            .to_string();

        let contact = self.directory
            .get_user_account_ids(&job.person_id).await
            .ok()
            .and_then(|ids| {
                let mut sorted: Vec<String> = ids.into_iter().collect();
                sorted.sort();
                sorted.into_iter().next()
            });

        let record = History::new(
            None,
            job.tis_reference.clone(),
            job.notification_type,
            Recipient {
                person_id: job.person_id.clone(),
                channel: MessageChannel::InApp,
                contact,
            },
            TemplateInfo {
                name: job.notification_type.template_name().to_string(),
                version,
                variables: job.variables.clone(),
            },
            Utc::now(),
            NotificationStatus::Unread,
            None
        )?;

        self.history.save(record).await?;
        Ok(())
    }

    async fn record_suppressed(
        &self,
        person_id: &str,
        plan: &PlannedNotification,
        channel: MessageChannel
    ) -> DispatchResult<()> {
        let version = self.templates
            .versions()
            .resolve(plan.notification_type, channel)?
            .to_string();

        let record = History::new(
            None,
            plan.tis_reference.clone(),
            plan.notification_type,
            Recipient {
                person_id: person_id.to_string(),
                channel,
                contact: None,
            },
            TemplateInfo {
                name: plan.notification_type.template_name().to_string(),
                version,
                variables: plan.variables.clone(),
            },
            Utc::now(),
            NotificationStatus::Failed,
            Some(SUPPRESSED_DETAIL.to_string())
        )?;

        self.history.save(record).await?;
        info!(
            "Suppressed {} on {} for {}",
            plan.notification_type.as_str(),
            channel.as_str(),
            person_id
        );
        Ok(())
    }

    /// Removes the schedule entry for a job and deletes its open history.
    async fn clean_stale(
        &self,
        person_id: &str,
        reference: &TisReference,
        notification_type: NotificationType
    ) -> DispatchResult<()> {
        let job = job_id(notification_type, &reference.id);
        self.schedules.remove(&job).await?;

        if
            let Some(record) = self.history
                .find_scheduled_for_trainee(person_id, reference, notification_type).await?
        {
            self.history.update_status(&record.id, NotificationStatus::Deleted, None).await?;
        }

        Ok(())
    }

    /// Cleanup for a deleted entity, located by reference alone.
    async fn clean_reference(
        &self,
        reference_type: TisReferenceType,
        reference_id: &str
    ) -> DispatchResult<()> {
        let scheduled = self.history.find_all_scheduled().await?;

        for record in scheduled {
            if
                record.tis_reference.reference_type == reference_type &&
                record.tis_reference.id == reference_id
            {
                let job = job_id(record.notification_type, reference_id);
                self.schedules.remove(&job).await?;
                self.history.update_status(&record.id, NotificationStatus::Deleted, None).await?;
            }
        }

        Ok(())
    }

    // ----- contact resolution ------------------------------------------

    async fn resolve_email(&self, person_id: &str) -> AppResult<String> {
        let ids = self.directory.get_user_account_ids(person_id).await?;

        let mut sorted: Vec<String> = ids.into_iter().collect();
        sorted.sort();

        let Some(user_id) = sorted.into_iter().next() else {
            return Err(AppError::UserNotFound(person_id.to_string()));
        };

        let details = self.directory.get_user_details_by_id(&user_id).await?;
        if details.email.trim().is_empty() {
            return Err(AppError::UserNotFound(person_id.to_string()));
        }

        Ok(details.email)
    }

    /// The best contact for an owner, or the configured support fallback.
    async fn resolve_office_contact(&self, owner: Option<&str>) -> LocalOfficeContact {
        if let Some(owner) = owner {
            match self.reference.get_local_office_contacts(owner).await {
                Ok(contacts) => {
                    if let Some(contact) = pick_contact(contacts) {
                        return contact;
                    }
                }
                Err(e) => {
                    warn!("Local office contact lookup failed for {}: {}", owner, e);
                }
            }
        }

        LocalOfficeContact {
            contact_type: None,
            contact: self.settings.support_contact.clone(),
            href_type: ContactHref::NonHref,
        }
    }
}

/// Prefer a linkable contact; fall back to any.
fn pick_contact(contacts: Vec<LocalOfficeContact>) -> Option<LocalOfficeContact> {
    let mut fallback = None;
    for contact in contacts {
        match contact.href_type {
            ContactHref::Email | ContactHref::Url => {
                return Some(contact);
            }
            ContactHref::NonHref => {
                fallback.get_or_insert(contact);
            }
        }
    }
    fallback
}

fn enrich_with_contact(variables: &mut Json, contact: &LocalOfficeContact) {
    if let Json::Object(map) = variables {
        map.insert(
            "localOfficeContact".to_string(),
            Json::String(contact.contact.clone())
        );
        map.insert(
            "localOfficeContactType".to_string(),
            Json::String(contact.href_type.as_str().to_string())
        );
    }
}

fn job_payload_from_history(record: &History) -> AppResult<String> {
    let job = JobData {
        person_id: record.recipient.person_id.clone(),
        notification_type: record.notification_type,
        tis_reference: record.tis_reference.clone(),
        channels: record.notification_type.channels().to_vec(),
        variables: record.template.variables.clone(),
    };

    serde_json
        ::to_string(&job)
        .map_err(|e| AppError::InternalServerError(format!("Unserializable job: {}", e)))
}

/// The scheduler's single registered handler: re-resolve, render, dispatch.
#[async_trait]
impl FireHandler for NotificationService {
    async fn handle(&self, job_id: &str, payload: &str) -> DispatchResult<()> {
        let job: JobData = serde_json
            ::from_str(payload)
            .map_err(|e| {
                DispatchError::Validation(format!("Unreadable payload for {}: {}", job_id, e))
            })?;

        let record = match
            self.history.find_scheduled_for_trainee(
                &job.person_id,
                &job.tis_reference,
                job.notification_type
            ).await?
        {
            Some(record) => record,
            // The open row disappeared (e.g. created then healed); recreate
            // it so the dispatch leaves an auditable trail.
            None => self.upsert_scheduled_history(&job, Utc::now()).await?,
        };

        self.dispatch(&job, record).await
    }
}
