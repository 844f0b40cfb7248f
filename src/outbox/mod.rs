//! Outbox: persisted send-now work items and the mail gateway behind them.
//!
//! Email is never sent inline from the orchestration path. A wake-up
//! carrying the history id is queued instead, and the outbox worker drains
//! wake-ups into the mail gateway, re-rendering from the recorded template
//! so a retry always sends what the history row says it sent. The
//! `NotificationId` header correlates provider feedback back to the row.

use std::time::Duration;

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport,
    AsyncTransport,
    Message,
    Tokio1Executor,
    message::header::{ ContentType, Header, HeaderName, HeaderValue },
    transport::smtp::authentication::Credentials,
};
use serde_json::json;
use tracing::info;

use crate::config::MailConfig;
use crate::error::{ AppError, AppResult, DispatchError, DispatchResult };

const MAIL_TIMEOUT: Duration = Duration::from_secs(10);

/// Correlation header echoed back by provider feedback events.
#[derive(Clone)]
pub struct NotificationIdHeader(pub String);

impl Header for NotificationIdHeader {
    fn name() -> HeaderName {
        HeaderName::new_from_ascii_str("NotificationId")
    }

    fn parse(s: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        Ok(Self(s.to_string()))
    }

    fn display(&self) -> HeaderValue {
        HeaderValue::new(Self::name(), self.0.clone())
    }
}

#[derive(Clone, Debug)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub html_body: String,
    pub notification_id: String,
}

/// Accepts send-now wake-ups for later draining.
#[async_trait]
pub trait Outbox: Send + Sync {
    async fn enqueue(&self, notification_id: &str) -> AppResult<()>;
}

pub struct SqsOutbox {
    client: aws_sdk_sqs::Client,
    queue_url: String,
}

impl SqsOutbox {
    pub fn new(client: aws_sdk_sqs::Client, queue_url: impl Into<String>) -> Self {
        Self { client, queue_url: queue_url.into() }
    }
}

#[async_trait]
impl Outbox for SqsOutbox {
    async fn enqueue(&self, notification_id: &str) -> AppResult<()> {
        let body = json!({ "notificationId": notification_id }).to_string();

        self.client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(body)
            .send().await
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to enqueue outbox wake-up: {}", e))
            })?;

        info!("Queued outbox wake-up for {}", notification_id);
        Ok(())
    }
}

/// A wake-up message on the outbox queue.
#[derive(serde::Deserialize)]
pub struct OutboxWakeUp {
    #[serde(rename = "notificationId")]
    pub notification_id: String,
}

#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send(&self, email: &OutboundEmail) -> DispatchResult<()>;
}

pub struct SmtpMailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: lettre::message::Mailbox,
}

impl SmtpMailSender {
    pub fn new(config: &MailConfig) -> AppResult<Self> {
        let sender = config.sender
            .parse()
            .map_err(|e| AppError::ConfigError(format!("Invalid mail sender address: {}", e)))?;

        let transport = match (&config.smtp_username, &config.smtp_password) {
            (Some(username), Some(password)) => {
                AsyncSmtpTransport::<Tokio1Executor>
                    ::relay(&config.smtp_host)
                    .map_err(|e| AppError::ConfigError(format!("Invalid SMTP relay: {}", e)))?
                    .port(config.smtp_port)
                    .credentials(Credentials::new(username.clone(), password.clone()))
                    .timeout(Some(MAIL_TIMEOUT))
                    .build()
            }
            _ => {
                AsyncSmtpTransport::<Tokio1Executor>
                    ::builder_dangerous(&config.smtp_host)
                    .port(config.smtp_port)
                    .timeout(Some(MAIL_TIMEOUT))
                    .build()
            }
        };

        Ok(Self { transport, sender })
    }
}

#[async_trait]
impl MailSender for SmtpMailSender {
    async fn send(&self, email: &OutboundEmail) -> DispatchResult<()> {
        let to = email.to
            .parse()
            .map_err(|e| {
                DispatchError::Validation(format!("Invalid recipient address {}: {}", email.to, e))
            })?;

        let message = Message::builder()
            .from(self.sender.clone())
            .to(to)
            .subject(&email.subject)
            .header(NotificationIdHeader(email.notification_id.clone()))
            .header(ContentType::TEXT_HTML)
            .body(email.html_body.clone())
            .map_err(|e| DispatchError::Validation(format!("Failed to build message: {}", e)))?;

        self.transport
            .send(message).await
            .map_err(|e| DispatchError::Transient(format!("Mail submission failed: {}", e)))?;

        Ok(())
    }
}
