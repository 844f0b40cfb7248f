use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

use trainee_notify::auth;
use trainee_notify::models::local_office_contact::{ ContactHref, LocalOfficeContact };

fn token_with_payload(payload: serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{}.{}.signature", header, body)
}

#[test]
fn test_trainee_id_extracted_from_token_payload() {
    let token = token_with_payload(serde_json::json!({ "custom:tisId": "p-9", "sub": "u-1" }));
    assert_eq!(auth::trainee_id_from_token(&token).as_deref(), Some("p-9"));
}

#[test]
fn test_token_without_claim_yields_none() {
    let token = token_with_payload(serde_json::json!({ "sub": "u-1" }));
    assert!(auth::trainee_id_from_token(&token).is_none());
}

#[test]
fn test_blank_claim_yields_none() {
    let token = token_with_payload(serde_json::json!({ "custom:tisId": "  " }));
    assert!(auth::trainee_id_from_token(&token).is_none());
}

#[test]
fn test_garbage_token_yields_none() {
    assert!(auth::trainee_id_from_token("garbage").is_none());
    assert!(auth::trainee_id_from_token("a.b.c").is_none());
}

#[test]
fn test_bearer_header_extraction() {
    let token = token_with_payload(serde_json::json!({ "custom:tisId": "p-9" }));

    let mut headers = axum::http::HeaderMap::new();
    headers.insert(
        axum::http::header::AUTHORIZATION,
        format!("Bearer {}", token).parse().unwrap()
    );
    assert_eq!(auth::trainee_id_from_headers(&headers).as_deref(), Some("p-9"));

    let empty = axum::http::HeaderMap::new();
    assert!(auth::trainee_id_from_headers(&empty).is_none());
}

#[test]
fn test_contact_href_classification() {
    assert_eq!(ContactHref::classify("https://support.example.org/contact"), ContactHref::Url);
    assert_eq!(ContactHref::classify("http://intranet/page"), ContactHref::Url);
    assert_eq!(ContactHref::classify("england.support@nhs.net"), ContactHref::Email);
    assert_eq!(ContactHref::classify("  england.support@nhs.net  "), ContactHref::Email);

    // Neither a URL nor a single address renders as plain text
    assert_eq!(ContactHref::classify("TSS_SUPPORT"), ContactHref::NonHref);
    assert_eq!(ContactHref::classify("a@b.com, c@d.com"), ContactHref::NonHref);
    assert_eq!(ContactHref::classify("call 0113 000 0000"), ContactHref::NonHref);
}

#[test]
fn test_local_office_contact_classifies_on_construction() {
    let contact = LocalOfficeContact::new(
        Some("Onboarding".to_string()),
        "england.support@nhs.net"
    );
    assert_eq!(contact.href_type, ContactHref::Email);

    let opaque = LocalOfficeContact::new(None, "see local intranet");
    assert_eq!(opaque.href_type, ContactHref::NonHref);
}
