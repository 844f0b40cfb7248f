//! Lifecycle event broadcasting.
//!
//! Every history mutation is published to the configured pub/sub topic so
//! downstream subscribers can mirror notification state. Broadcasting is
//! strictly fire-and-forget: the pipeline never blocks or fails on it.

use async_trait::async_trait;
use aws_sdk_sns::types::MessageAttributeValue;
use serde_json::json;
use tracing::{ debug, warn };

use crate::models::history::History;

#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, history: &History);
}

pub struct SnsBroadcaster {
    client: aws_sdk_sns::Client,
    topic_arn: Option<String>,
    message_attribute: Option<String>,
}

impl SnsBroadcaster {
    pub fn new(
        client: aws_sdk_sns::Client,
        topic_arn: Option<String>,
        message_attribute: Option<String>
    ) -> Self {
        Self { client, topic_arn, message_attribute }
    }
}

#[async_trait]
impl EventSink for SnsBroadcaster {
    async fn publish(&self, history: &History) {
        let Some(topic_arn) = &self.topic_arn else {
            debug!("No topic configured, skipping broadcast for {}", history.id);
            return;
        };

        let message = json!({
            "id": history.id,
            "tisReference": {
                "type": history.tis_reference.reference_type.as_str(),
                "id": history.tis_reference.id,
            },
            "notificationType": history.notification_type.as_str(),
            "recipient": {
                "personId": history.recipient.person_id,
                "channel": history.recipient.channel.as_str(),
                "contact": history.recipient.contact,
            },
            "template": {
                "name": history.template.name,
                "version": history.template.version,
                "variables": history.template.variables,
            },
            "sentAt": history.sent_at.to_rfc3339(),
            "readAt": history.read_at.map(|t| t.to_rfc3339()),
            "status": history.status.as_str(),
            "statusDetail": history.status_detail,
            "lastRetry": history.last_retry.map(|t| t.to_rfc3339()),
        });

        let mut request = self.client
            .publish()
            .topic_arn(topic_arn)
            .message(message.to_string());

        if topic_arn.ends_with(".fifo") {
            request = request
                .message_group_id(format!("notifications_event_{}", history.id))
                .message_deduplication_id(uuid::Uuid::new_v4().to_string());
        }

        if let Some(attribute_name) = &self.message_attribute {
            match
                MessageAttributeValue::builder()
                    .data_type("String")
                    .string_value(history.status.as_str())
                    .build()
            {
                Ok(value) => {
                    request = request.message_attributes(attribute_name, value);
                }
                Err(e) => {
                    warn!("Failed to build message attribute: {}", e);
                }
            }
        }

        if let Err(e) = request.send().await {
            warn!("Failed to broadcast event for history {}: {}", history.id, e);
        }
    }
}

/// Sink used when broadcasting is disabled outright.
pub struct NoopEventSink;

#[async_trait]
impl EventSink for NoopEventSink {
    async fn publish(&self, _history: &History) {}
}
