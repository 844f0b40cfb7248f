use chrono::NaiveDate;
use serde_json::json;

use trainee_notify::error::DispatchError;
use trainee_notify::listeners::{
    account,
    coj,
    email_feedback,
    gmc,
    ltft,
    outbox,
    placement,
    programme_membership,
};
use trainee_notify::listeners::programme_membership::ProgrammeMembershipEvent;
use trainee_notify::models::ltft::LtftState;

#[test]
fn test_programme_membership_upsert_mapping() {
    let body = json!({
        "traineeTisId": "p-9",
        "record": {
            "operationType": "UPDATE",
            "data": {
                "tisId": "pm-1",
                "programmeName": "General Practice",
                "managingDeanery": "North West",
                "startDate": "2030-01-01",
                "unknownField": 42
            }
        }
    }).to_string();

    match programme_membership::map_event(&body).unwrap() {
        ProgrammeMembershipEvent::Upserted { membership, created } => {
            assert!(!created);
            assert_eq!(membership.tis_id, "pm-1");
            assert_eq!(membership.person_id, "p-9", "envelope trainee id wins");
            assert_eq!(membership.managing_deanery.as_deref(), Some("North West"));
            assert_eq!(
                membership.start_date,
                NaiveDate::parse_from_str("2030-01-01", "%Y-%m-%d").ok()
            );
        }
        other => panic!("unexpected event: {:?}", other),
    }
}

#[test]
fn test_programme_membership_create_flag() {
    let body = json!({
        "traineeTisId": "p-9",
        "record": { "operationType": "CREATE", "data": { "tisId": "pm-1" } }
    }).to_string();

    match programme_membership::map_event(&body).unwrap() {
        ProgrammeMembershipEvent::Upserted { created, .. } => assert!(created),
        other => panic!("unexpected event: {:?}", other),
    }
}

#[test]
fn test_programme_membership_delete_mapping() {
    let body = json!({
        "traineeTisId": "p-9",
        "record": { "operationType": "DELETE", "data": { "tisId": "pm-1" } }
    }).to_string();

    match programme_membership::map_event(&body).unwrap() {
        ProgrammeMembershipEvent::Deleted(tis_id) => assert_eq!(tis_id, "pm-1"),
        other => panic!("unexpected event: {:?}", other),
    }
}

#[test]
fn test_unparseable_message_is_validation_error() {
    let result = programme_membership::map_event("not json at all");
    assert!(matches!(result, Err(DispatchError::Validation(_))));
}

#[test]
fn test_missing_trainee_id_is_validation_error() {
    let body = json!({
        "record": { "data": { "tisId": "pm-1" } }
    }).to_string();

    assert!(matches!(
        programme_membership::map_event(&body),
        Err(DispatchError::Validation(_))
    ));
}

#[test]
fn test_placement_mapping() {
    let body = json!({
        "traineeTisId": "p-9",
        "record": {
            "data": {
                "tisId": "placement-7",
                "placementType": "In Post",
                "startDate": "2030-06-01",
                "site": "General Hospital"
            }
        }
    }).to_string();

    match placement::map_event(&body).unwrap() {
        placement::PlacementEvent::Upserted(pl) => {
            assert_eq!(pl.tis_id, "placement-7");
            assert_eq!(pl.placement_type.as_deref(), Some("In Post"));
            assert_eq!(pl.site.as_deref(), Some("General Hospital"));
        }
        other => panic!("unexpected event: {:?}", other),
    }
}

#[test]
fn test_coj_mapping() {
    let body = json!({
        "traineeTisId": "p-9",
        "record": {
            "data": {
                "tisId": "pm-1",
                "programmeName": "General Practice",
                "signedAt": "2026-05-01T12:30:00Z"
            }
        }
    }).to_string();

    let membership = coj::map_event(&body).unwrap();
    assert_eq!(membership.tis_id, "pm-1");
    assert_eq!(membership.person_id, "p-9");
    assert!(membership.has_signed_coj());
}

#[test]
fn test_gmc_rejection_mapping() {
    let body = json!({
        "tisId": "p-9",
        "tisTrigger": "GMC_REJECTED",
        "tisTriggerDetail": "Number mismatch",
        "record": { "data": { "gmcNumber": "1234567", "gmcStatus": "Registered" } }
    }).to_string();

    let update = gmc::map_event(&body).unwrap();
    assert_eq!(update.person_id, "p-9");
    assert_eq!(update.gmc_number.as_deref(), Some("1234567"));
    assert_eq!(update.tis_trigger.as_deref(), Some("GMC_REJECTED"));
    assert!(update.wants_audit_record());
}

#[test]
fn test_ltft_mapping() {
    let body = json!({
        "formRef": "ltft-3",
        "traineeTisId": "p-9",
        "status": {
            "current": { "state": "APPROVED", "timestamp": "2026-07-01T08:00:00Z" }
        },
        "content": { "name": "My LTFT application" }
    }).to_string();

    let update = ltft::map_event(&body).unwrap();
    assert_eq!(update.form_ref, "ltft-3");
    assert_eq!(update.state, LtftState::Approved);
    assert_eq!(update.form_name.as_deref(), Some("My LTFT application"));
}

#[test]
fn test_ltft_unknown_state_is_validation_error() {
    let body = json!({
        "formRef": "ltft-3",
        "traineeTisId": "p-9",
        "status": { "current": { "state": "DAYDREAMING", "timestamp": "2026-07-01T08:00:00Z" } }
    }).to_string();

    assert!(matches!(ltft::map_event(&body), Err(DispatchError::Validation(_))));
}

#[test]
fn test_account_mapping() {
    let body = json!({
        "traineeTisId": "p-9",
        "record": { "data": { "email": "new@nhs.net", "familyName": "Gilliam" } }
    }).to_string();

    let update = account::map_event(&body).unwrap();
    assert_eq!(update.person_id, "p-9");
    assert_eq!(update.email.as_deref(), Some("new@nhs.net"));
}

#[test]
fn test_bounce_feedback_detail() {
    let body = json!({
        "type": "Bounce",
        "bounce": { "bounceType": "Permanent", "bounceSubType": "Suppressed" },
        "headers": [
            { "name": "Content-Type", "value": "text/html" },
            { "name": "NotificationId", "value": "H-1" }
        ]
    }).to_string();

    let (id, detail) = email_feedback::map_event(&body).unwrap();
    assert_eq!(id, "H-1");
    assert_eq!(detail, "Bounce: Permanent - Suppressed");
}

#[test]
fn test_complaint_feedback_detail_prefers_sub_type() {
    let body = json!({
        "type": "Complaint",
        "complaint": { "complaintSubType": "OnAccountSuppressionList" },
        "headers": [{ "name": "NotificationId", "value": "H-2" }]
    }).to_string();

    let (_, detail) = email_feedback::map_event(&body).unwrap();
    assert_eq!(detail, "Complaint: OnAccountSuppressionList");
}

#[test]
fn test_complaint_feedback_detail_falls_back_to_undetermined() {
    let body = json!({
        "type": "Complaint",
        "headers": [{ "name": "NotificationId", "value": "H-3" }]
    }).to_string();

    let (_, detail) = email_feedback::map_event(&body).unwrap();
    assert_eq!(detail, "Complaint: Undetermined");
}

#[test]
fn test_feedback_without_notification_id_is_rejected() {
    let body = json!({
        "type": "Bounce",
        "bounce": { "bounceType": "Transient", "bounceSubType": "General" },
        "headers": []
    }).to_string();

    assert!(matches!(
        email_feedback::map_event(&body),
        Err(DispatchError::Validation(_))
    ));
}

#[test]
fn test_outbox_wake_up_mapping() {
    let body = json!({ "notificationId": "H-9" }).to_string();
    assert_eq!(outbox::map_event(&body).unwrap(), "H-9");
}
