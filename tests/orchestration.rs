mod common;

use std::collections::HashSet;

use chrono::{ Duration, NaiveDate, TimeZone, Utc };

use common::{ harness, FakeDirectory, StaticGate };
use trainee_notify::models::history::{
    History,
    MessageChannel,
    NotificationStatus,
    Recipient,
    TemplateInfo,
    TisReference,
    TisReferenceType,
};
use trainee_notify::models::ltft::{ LtftState, LtftUpdate };
use trainee_notify::models::notification_type::NotificationType;
use trainee_notify::models::placement::Placement;
use trainee_notify::models::programme_membership::ProgrammeMembership;
use trainee_notify::scheduler::ScheduleStore;
use trainee_notify::services::history::HistoryStore;
use trainee_notify::services::notification::SUPPRESSED_DETAIL;

fn programme_membership(tis_id: &str, person_id: &str, start: &str) -> ProgrammeMembership {
    ProgrammeMembership {
        tis_id: tis_id.to_string(),
        person_id: person_id.to_string(),
        programme_name: Some("General Practice".to_string()),
        programme_number: Some("NW-123".to_string()),
        managing_deanery: Some("North West".to_string()),
        start_date: NaiveDate::parse_from_str(start, "%Y-%m-%d").ok(),
        ..ProgrammeMembership::default()
    }
}

fn placement(tis_id: &str, person_id: &str, start: NaiveDate, placement_type: &str) -> Placement {
    Placement {
        tis_id: tis_id.to_string(),
        person_id: person_id.to_string(),
        start_date: Some(start),
        placement_type: Some(placement_type.to_string()),
        site: Some("General Hospital".to_string()),
        specialty: Some("Cardiology".to_string()),
        owner: Some("North West".to_string()),
        ..Placement::default()
    }
}

fn scheduled_row(
    person_id: &str,
    reference: TisReference,
    notification_type: NotificationType,
    sent_at: chrono::DateTime<Utc>
) -> History {
    History::new(
        None,
        reference,
        notification_type,
        Recipient {
            person_id: person_id.to_string(),
            channel: MessageChannel::Email,
            contact: Some("trainee@example.com".to_string()),
        },
        TemplateInfo {
            name: notification_type.template_name().to_string(),
            version: "v1.0.0".to_string(),
            variables: serde_json::json!({ "personId": person_id }),
        },
        sent_at,
        NotificationStatus::Scheduled,
        None
    ).unwrap()
}

#[tokio::test]
async fn programme_milestones_schedule_at_local_midnights() {
    let h = harness(StaticGate::allow_all(), FakeDirectory::with_user("p-9", "u-9", "p9@nhs.net"));

    let membership = programme_membership("pm-1", "p-9", "2030-01-01");
    h.service.apply_programme_membership(&membership).await.unwrap();

    let pending = h.scheduler.pending();
    assert_eq!(pending.len(), 3);

    let expected = [
        ("PROGRAMME_UPDATED_WEEK_8-pm-1", Utc.with_ymd_and_hms(2029, 11, 6, 0, 0, 0).unwrap()),
        ("PROGRAMME_UPDATED_WEEK_4-pm-1", Utc.with_ymd_and_hms(2029, 12, 4, 0, 0, 0).unwrap()),
        ("PROGRAMME_UPDATED_WEEK_0-pm-1", Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()),
    ];

    for (job_id, fire_at) in expected {
        let entry = h.scheduler.get(job_id).unwrap_or_else(|| panic!("missing {}", job_id));
        assert_eq!(entry.fire_at, fire_at, "fire time for {}", job_id);
    }

    // One open SCHEDULED row per job, sent_at carrying the intended fire time
    let scheduled: Vec<History> = h.history
        .all()
        .into_iter()
        .filter(|r| r.status == NotificationStatus::Scheduled)
        .collect();
    assert_eq!(scheduled.len(), 3);
    for record in &scheduled {
        let job = format!("{}-pm-1", record.notification_type.as_str());
        let entry = h.scheduler.get(&job).unwrap();
        assert_eq!(record.sent_at, entry.fire_at);
    }
}

#[tokio::test]
async fn redelivered_event_produces_no_duplicate_schedules() {
    let h = harness(StaticGate::allow_all(), FakeDirectory::with_user("p-9", "u-9", "p9@nhs.net"));

    let membership = programme_membership("pm-1", "p-9", "2030-01-01");
    h.service.apply_programme_membership(&membership).await.unwrap();
    h.service.apply_programme_membership(&membership).await.unwrap();

    assert_eq!(h.scheduler.pending().len(), 3);

    let scheduled_count = h.history
        .all()
        .iter()
        .filter(|r| r.status == NotificationStatus::Scheduled)
        .count();
    assert_eq!(scheduled_count, 3, "re-delivery must not duplicate open schedules");
    assert!(h.outbox.ids().is_empty());
}

#[tokio::test]
async fn placement_type_change_cleans_stale_schedule() {
    let h = harness(StaticGate::allow_all(), FakeDirectory::with_user("p-9", "u-9", "p9@nhs.net"));

    let today = Utc::now().with_timezone(&chrono_tz::Europe::London).date_naive();
    let start = today + Duration::days(120);

    h.service.apply_placement(&placement("placement-7", "p-9", start, "In Post")).await.unwrap();
    assert!(h.scheduler.get("PLACEMENT_UPDATED_WEEK_12-placement-7").is_some());

    // Same placement arrives with a non-notifiable type
    h.service.apply_placement(&placement("placement-7", "p-9", start, "RANDOM")).await.unwrap();

    assert!(h.scheduler.get("PLACEMENT_UPDATED_WEEK_12-placement-7").is_none());

    let record = h.history
        .all()
        .into_iter()
        .find(|r| r.tis_reference.id == "placement-7")
        .unwrap();
    assert_eq!(record.status, NotificationStatus::Deleted);
    assert!(
        h.history.published_statuses().contains(&NotificationStatus::Deleted),
        "deletion must be broadcast"
    );
}

#[tokio::test]
async fn bounce_feedback_fails_sent_history() {
    let h = harness(StaticGate::allow_all(), FakeDirectory::with_user("p-9", "u-9", "p9@nhs.net"));

    let mut record = scheduled_row(
        "p-9",
        TisReference::new(TisReferenceType::ProgrammeMembership, "pm-1"),
        NotificationType::ProgrammeUpdatedWeek0,
        Utc::now()
    );
    record.status = NotificationStatus::Sent;
    let id = record.id.clone();
    h.history.seed(record);

    let body = serde_json::json!({
        "type": "Bounce",
        "bounce": { "bounceType": "Transient", "bounceSubType": "General" },
        "headers": [{ "name": "NotificationId", "value": id }]
    }).to_string();

    let (notification_id, detail) = trainee_notify::listeners::email_feedback
        ::map_event(&body)
        .unwrap();
    h.service.record_delivery_feedback(&notification_id, detail).await.unwrap();

    let updated = h.history.get(&id).unwrap();
    assert_eq!(updated.status, NotificationStatus::Failed);
    assert_eq!(updated.status_detail.as_deref(), Some("Bounce: Transient - General"));
    assert!(h.history.published_statuses().contains(&NotificationStatus::Failed));
}

#[tokio::test]
async fn archive_is_idempotent() {
    let h = harness(StaticGate::allow_all(), FakeDirectory::default());

    let mut record = scheduled_row(
        "p-9",
        TisReference::new(TisReferenceType::ProgrammeMembership, "pm-1"),
        NotificationType::ProgrammeUpdatedWeek0,
        Utc::now()
    );
    record.status = NotificationStatus::Unread;
    record.recipient.channel = MessageChannel::InApp;
    let id = record.id.clone();
    h.history.seed(record);

    let first = h.history
        .update_status(&id, NotificationStatus::Archived, None).await
        .unwrap()
        .unwrap();
    assert_eq!(first.status, NotificationStatus::Archived);

    let second = h.history
        .update_status(&id, NotificationStatus::Archived, None).await
        .unwrap()
        .unwrap();
    assert_eq!(second.status, NotificationStatus::Archived);

    // Only the real transition was broadcast
    let archived_events = h.history
        .published_statuses()
        .into_iter()
        .filter(|s| *s == NotificationStatus::Archived)
        .count();
    assert_eq!(archived_events, 1);
}

#[tokio::test]
async fn whitelisted_person_bypasses_disabled_email_channel() {
    let gate = StaticGate {
        email_enabled: false,
        in_app_enabled: false,
        whitelist: HashSet::from(["p-42".to_string()]),
        remote_checks: true,
    };

    let mut directory = FakeDirectory::with_user("p-42", "u-42", "p42@nhs.net");
    directory.accounts.insert("p-43".to_string(), HashSet::from(["u-43".to_string()]));
    directory.details.insert("u-43".to_string(), trainee_notify::models::account::UserDetails {
        email: "p43@nhs.net".to_string(),
        family_name: None,
        given_name: None,
        gmc_number: None,
    });

    let h = harness(gate, directory);

    // Whitelisted trainee: the email is dispatched through the outbox
    h.service
        .send_immediate(
            "p-42",
            NotificationType::Welcome,
            TisReferenceType::Person,
            "p-42",
            serde_json::json!({ "personId": "p-42" })
        ).await
        .unwrap();

    let enqueued = h.outbox.ids();
    assert_eq!(enqueued.len(), 1);

    h.service.resend_scheduled(&enqueued[0]).await.unwrap();

    let sent = h.history.get(&enqueued[0]).unwrap();
    assert_eq!(sent.status, NotificationStatus::Sent);

    let messages = h.mailer.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].to, "p42@nhs.net");
    assert_eq!(messages[0].notification_id, enqueued[0]);

    // Gated trainee: suppressed audit row, no mail
    h.service
        .send_immediate(
            "p-43",
            NotificationType::Welcome,
            TisReferenceType::Person,
            "p-43",
            serde_json::json!({ "personId": "p-43" })
        ).await
        .unwrap();

    let suppressed = h.history
        .all()
        .into_iter()
        .find(|r| r.recipient.person_id == "p-43")
        .unwrap();
    assert_eq!(suppressed.status, NotificationStatus::Failed);
    assert_eq!(suppressed.status_detail.as_deref(), Some(SUPPRESSED_DETAIL));
    assert_eq!(h.outbox.ids().len(), 1, "no outbox hand-off for the suppressed trainee");
    assert_eq!(h.mailer.messages().len(), 1);
}

#[tokio::test]
async fn orphan_sweep_fails_schedules_past_their_window() {
    let h = harness(StaticGate::allow_all(), FakeDirectory::with_user("p-9", "u-9", "p9@nhs.net"));

    let record = scheduled_row(
        "p-9",
        TisReference::new(TisReferenceType::ProgrammeMembership, "pm-old"),
        NotificationType::ProgrammeUpdatedWeek0,
        Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()
    );
    let id = record.id.clone();
    h.history.seed(record);

    h.service.sweep_orphans().await.unwrap();

    let swept = h.history.get(&id).unwrap();
    assert_eq!(swept.status, NotificationStatus::Failed);
    assert_eq!(swept.status_detail.as_deref(), Some("Missed Schedule"));
    assert!(h.outbox.ids().is_empty(), "no delivery attempt for a missed schedule");
    assert!(h.mailer.messages().is_empty());
}

#[tokio::test]
async fn orphan_sweep_replays_schedules_still_inside_window() {
    let h = harness(StaticGate::allow_all(), FakeDirectory::with_user("p-9", "u-9", "p9@nhs.net"));

    // Milestone window is a day; half an hour late is still replayable
    let record = scheduled_row(
        "p-9",
        TisReference::new(TisReferenceType::ProgrammeMembership, "pm-late"),
        NotificationType::ProgrammeUpdatedWeek0,
        Utc::now() - Duration::minutes(30)
    );
    h.history.seed(record);

    h.service.sweep_orphans().await.unwrap();

    let entry = h.scheduler.get("PROGRAMME_UPDATED_WEEK_0-pm-late");
    assert!(entry.is_some(), "late-but-in-window schedule must be replayed");
}

#[tokio::test]
async fn placement_starting_today_fires_missed_milestone_immediately() {
    let h = harness(StaticGate::allow_all(), FakeDirectory::with_user("p-9", "u-9", "p9@nhs.net"));

    let today = Utc::now().with_timezone(&chrono_tz::Europe::London).date_naive();
    h.service
        .apply_placement(&placement("placement-1", "p-9", today, "In Post")).await
        .unwrap();

    // The WEEK_12 point is long past; it must dispatch now instead of being
    // scheduled.
    assert!(h.scheduler.get("PLACEMENT_UPDATED_WEEK_12-placement-1").is_none());
    assert_eq!(h.outbox.ids().len(), 1, "email hand-off happens immediately");

    let unread = h.history
        .all()
        .into_iter()
        .any(|r| r.status == NotificationStatus::Unread);
    assert!(unread, "in-app copy is persisted as UNREAD at fire time");
}

#[tokio::test]
async fn past_start_date_membership_gets_no_schedules() {
    let h = harness(StaticGate::allow_all(), FakeDirectory::with_user("p-9", "u-9", "p9@nhs.net"));

    let membership = programme_membership("pm-2", "p-9", "2019-01-01");
    h.service.apply_programme_membership(&membership).await.unwrap();

    assert!(h.scheduler.pending().is_empty());
    assert!(h.history.all().is_empty());
}

#[tokio::test]
async fn ltft_transition_supersedes_open_reminder() {
    let h = harness(StaticGate::allow_all(), FakeDirectory::with_user("p-9", "u-9", "p9@nhs.net"));

    // An open reminder left over from a previous submission
    let reference = TisReference::new(TisReferenceType::LtftForm, "ltft-3");
    let reminder = scheduled_row(
        "p-9",
        reference.clone(),
        NotificationType::LtftSubmitted,
        Utc::now() + Duration::days(3)
    );
    let reminder_id = reminder.id.clone();
    h.history.seed(reminder);
    h.scheduler
        .schedule("LTFT_SUBMITTED-ltft-3", "{}".to_string(), Utc::now() + Duration::days(3), 3600)
        .await
        .unwrap();

    let update = LtftUpdate {
        form_ref: "ltft-3".to_string(),
        person_id: "p-9".to_string(),
        state: LtftState::Approved,
        timestamp: Utc::now(),
        form_name: Some("My LTFT application".to_string()),
    };
    h.service.apply_ltft(&update).await.unwrap();

    assert!(h.scheduler.get("LTFT_SUBMITTED-ltft-3").is_none());
    assert_eq!(
        h.history.get(&reminder_id).unwrap().status,
        NotificationStatus::Deleted
    );

    // The approval itself was dispatched
    assert_eq!(h.outbox.ids().len(), 1);
}
