use trainee_notify::models::history::MessageChannel;
use trainee_notify::models::notification_type::NotificationType;
use trainee_notify::models::planned::job_id;

#[test]
fn test_milestone_offsets_are_preserved() {
    assert_eq!(NotificationType::ProgrammeUpdatedWeek8.milestone_days(), Some(56));
    assert_eq!(NotificationType::ProgrammeUpdatedWeek4.milestone_days(), Some(28));
    assert_eq!(NotificationType::ProgrammeUpdatedWeek0.milestone_days(), Some(0));
    assert_eq!(NotificationType::PlacementUpdatedWeek12.milestone_days(), Some(84));
    assert_eq!(NotificationType::Welcome.milestone_days(), None);
    assert_eq!(NotificationType::LtftApproved.milestone_days(), None);
}

#[test]
fn test_wire_names_round_trip() {
    for notification_type in NotificationType::all() {
        let parsed = NotificationType::from_string(notification_type.as_str()).unwrap();
        assert_eq!(parsed, *notification_type);
    }

    assert!(NotificationType::from_string("NOT_A_TYPE").is_err());
}

#[test]
fn test_template_names_round_trip() {
    for notification_type in NotificationType::all() {
        let parsed = NotificationType::from_template_name(
            notification_type.template_name()
        ).unwrap();
        assert_eq!(parsed, *notification_type);
    }

    assert!(NotificationType::from_template_name("mystery-template").is_err());
}

#[test]
fn test_job_id_format() {
    assert_eq!(
        job_id(NotificationType::ProgrammeUpdatedWeek8, "pm-1"),
        "PROGRAMME_UPDATED_WEEK_8-pm-1"
    );
    assert_eq!(
        job_id(NotificationType::PlacementUpdatedWeek12, "placement-7"),
        "PLACEMENT_UPDATED_WEEK_12-placement-7"
    );
}

#[test]
fn test_every_type_has_at_least_one_channel() {
    for notification_type in NotificationType::all() {
        assert!(
            !notification_type.channels().is_empty(),
            "{} has no delivery channel",
            notification_type.as_str()
        );
    }
}

#[test]
fn test_milestones_tolerate_missed_fires() {
    assert!(NotificationType::ProgrammeUpdatedWeek0.allows_missed_fire());
    assert!(NotificationType::PlacementUpdatedWeek12.allows_missed_fire());
    assert!(!NotificationType::FormUpdated.allows_missed_fire());

    assert_eq!(NotificationType::ProgrammeUpdatedWeek8.window_secs(), 86_400);
    assert_eq!(NotificationType::Welcome.window_secs(), 3_600);
}

#[test]
fn test_email_only_types() {
    assert_eq!(NotificationType::Welcome.channels(), &[MessageChannel::Email]);
    assert_eq!(NotificationType::GmcRejected.channels(), &[MessageChannel::Email]);
}

#[test]
fn test_programme_and_placement_milestone_families() {
    assert_eq!(NotificationType::programme_milestones().len(), 3);
    assert_eq!(NotificationType::placement_milestones().len(), 1);
}
