//! Read-only trainee-facing HTTP API.
//!
//! Three operations, all scoped to the trainee id carried in the bearer
//! token: list the visible history, re-render one message, and move an
//! in-app notification between read states.

use axum::{ Json, Router };
use axum::extract::{ Path, State };
use axum::http::{ HeaderMap, StatusCode };
use axum::response::{ Html, IntoResponse, Response };
use axum::routing::{ get, put };
use chrono::{ DateTime, Utc };
use serde::Serialize;
use tracing::warn;

use crate::auth;
use crate::context::AppContext;
use crate::models::history::{ History, NotificationStatus };

pub fn router(context: AppContext) -> Router {
    Router::new()
        .route("/api/history/trainee", get(list_history))
        .route("/api/history/trainee/message/{id}", get(get_message))
        .route("/api/history/trainee/notification/{id}/{action}", put(update_notification))
        .route("/health", get(health))
        .with_state(context)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TraineeHistoryDto {
    id: String,
    channel: &'static str,
    notification_type: &'static str,
    contact: Option<String>,
    sent_at: DateTime<Utc>,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    subject_text: Option<String>,
}

/// Statuses a trainee can see. Failed attempts stay internal.
fn is_visible(status: NotificationStatus) -> bool {
    matches!(
        status,
        NotificationStatus::Sent
            | NotificationStatus::Unread
            | NotificationStatus::Read
            | NotificationStatus::Archived
    )
}

fn to_dto(context: &AppContext, record: &History) -> TraineeHistoryDto {
    let subject_text = context.templates
        .render(
            record.recipient.channel.message_type(),
            record.notification_type,
            &record.template.version,
            &record.template.variables
        )
        .map(|rendered| rendered.subject)
        .ok();

    TraineeHistoryDto {
        id: record.id.clone(),
        channel: record.recipient.channel.as_str(),
        notification_type: record.notification_type.as_str(),
        contact: record.recipient.contact.clone(),
        sent_at: record.sent_at,
        status: record.status.as_str(),
        subject_text,
    }
}

async fn list_history(
    State(context): State<AppContext>,
    headers: HeaderMap
) -> Response {
    let Some(person_id) = auth::trainee_id_from_headers(&headers) else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    match context.history.find_all_by_person(&person_id).await {
        Ok(records) => {
            let dtos: Vec<TraineeHistoryDto> = records
                .iter()
                .filter(|h| is_visible(h.status))
                .map(|h| to_dto(&context, h))
                .collect();
            Json(dtos).into_response()
        }
        Err(e) => {
            warn!("History listing failed for {}: {}", person_id, e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn get_message(
    State(context): State<AppContext>,
    headers: HeaderMap,
    Path(id): Path<String>
) -> Response {
    let Some(person_id) = auth::trainee_id_from_headers(&headers) else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    let record = match context.history.find_by_id_and_person(&id, &person_id).await {
        Ok(Some(record)) => record,
        Ok(None) => {
            return StatusCode::NOT_FOUND.into_response();
        }
        Err(e) => {
            warn!("Message lookup failed for {}: {}", id, e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match
        context.templates.render(
            record.recipient.channel.message_type(),
            record.notification_type,
            &record.template.version,
            &record.template.variables
        )
    {
        Ok(rendered) => Html(rendered.body).into_response(),
        Err(e) => {
            warn!("Message render failed for {}: {}", id, e);
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

async fn update_notification(
    State(context): State<AppContext>,
    headers: HeaderMap,
    Path((id, action)): Path<(String, String)>
) -> Response {
    let Some(person_id) = auth::trainee_id_from_headers(&headers) else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    let status = match action.as_str() {
        "mark-read" => NotificationStatus::Read,
        "mark-unread" => NotificationStatus::Unread,
        "archive" => NotificationStatus::Archived,
        _ => {
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    match context.history.find_by_id_and_person(&id, &person_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return StatusCode::NOT_FOUND.into_response();
        }
        Err(e) => {
            warn!("Notification lookup failed for {}: {}", id, e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    match context.history.update_status(&id, status, None).await {
        Ok(Some(updated)) => Json(to_dto(&context, &updated)).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            warn!("Notification update failed for {}: {}", id, e);
            StatusCode::BAD_REQUEST.into_response()
        }
    }
}

/// OK only when the document store answers and the scheduler worker is
/// heartbeating.
async fn health(State(context): State<AppContext>) -> Response {
    if !context.scheduler.is_live() {
        return (StatusCode::SERVICE_UNAVAILABLE, "scheduler not live").into_response();
    }

    let db_ok = context.repository
        .client()
        .list_tables()
        .limit(1)
        .send().await
        .is_ok();

    if db_ok {
        (StatusCode::OK, "OK").into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "datastore unreachable").into_response()
    }
}
