use chrono::{ Duration, Utc };

use trainee_notify::models::schedule_entry::{ ScheduleEntry, ScheduleState };
use trainee_notify::repository::DynamoDbEntity;

fn entry(fire_offset_secs: i64, window_secs: i64) -> ScheduleEntry {
    ScheduleEntry::new(
        "PROGRAMME_UPDATED_WEEK_0-pm-1".to_string(),
        r#"{"personId":"p-9"}"#.to_string(),
        Utc::now() + Duration::seconds(fire_offset_secs),
        window_secs
    ).unwrap()
}

#[test]
fn test_new_entry_is_pending() {
    let entry = entry(3600, 0);
    assert_eq!(entry.state, ScheduleState::Pending);
    assert!(entry.failure.is_none());
}

#[test]
fn test_blank_job_id_is_rejected() {
    let result = ScheduleEntry::new(" ".to_string(), "{}".to_string(), Utc::now(), 0);
    assert!(result.is_err());
}

#[test]
fn test_missed_detection_honours_window() {
    let now = Utc::now();

    let within_window = entry(-1800, 3600);
    assert!(!within_window.is_missed(now), "half an hour late, hour window");

    let beyond_window = entry(-7200, 3600);
    assert!(beyond_window.is_missed(now), "two hours late, hour window");

    let no_window = entry(-1, 0);
    assert!(no_window.is_missed(now), "any lateness misses a zero window");

    let future = entry(3600, 0);
    assert!(!future.is_missed(now));
}

#[test]
fn test_dynamo_item_round_trip() {
    let mut original = entry(3600, 86_400);
    original.state = ScheduleState::Firing;
    original.failure = Some("handler timed out".to_string());

    let item = original.to_item();
    let restored = ScheduleEntry::from_item(&item).expect("item should parse back");

    assert_eq!(restored.job_id, original.job_id);
    assert_eq!(restored.payload, original.payload);
    assert_eq!(restored.window_secs, 86_400);
    assert_eq!(restored.state, ScheduleState::Firing);
    assert_eq!(restored.failure.as_deref(), Some("handler timed out"));
}

#[test]
fn test_state_strings_round_trip() {
    for state in [ScheduleState::Pending, ScheduleState::Firing, ScheduleState::Done] {
        assert_eq!(ScheduleState::from_string(state.as_str()).unwrap(), state);
    }
    assert!(ScheduleState::from_string("SLEEPING").is_err());
}
