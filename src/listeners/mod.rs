//! Inbound queue consumption.
//!
//! One consumer per event family. Each listener deserializes the message,
//! translates it to a domain entity with a pure mapper and invokes the
//! matching notification-service operation. Only transient failures leave
//! the message for redelivery; validation failures ride the transport's
//! redrive policy to the dead-letter queue. A fatal outcome stops the
//! worker: orchestration must not silently drop.

pub mod account;
pub mod coj;
pub mod email_feedback;
pub mod forms;
pub mod gmc;
pub mod ltft;
pub mod outbox;
pub mod placement;
pub mod programme_membership;

use serde::Deserialize;
use serde_json::Value as Json;
use tokio::sync::watch;
use tracing::{ error, info, warn };

use crate::error::{ AppError, AppResult, DispatchError, DispatchResult };

const WAIT_TIME_SECONDS: i32 = 20;
const MAX_MESSAGES: i32 = 10;

/// The `{traineeTisId, record: {data: {...}}}` envelope most event
/// families arrive in. Unknown fields are ignored throughout.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordEnvelope {
    #[serde(default)]
    pub trainee_tis_id: Option<String>,
    #[serde(default)]
    pub record: Option<RecordBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordBody {
    #[serde(default)]
    pub operation_type: Option<String>,
    #[serde(default)]
    pub data: Option<Json>,
}

impl RecordEnvelope {
    pub fn parse(body: &str) -> DispatchResult<Self> {
        serde_json
            ::from_str(body)
            .map_err(|e| DispatchError::Validation(format!("Unparseable message: {}", e)))
    }

    pub fn is_delete(&self) -> bool {
        self.record
            .as_ref()
            .and_then(|r| r.operation_type.as_deref())
            .is_some_and(|op| op.eq_ignore_ascii_case("DELETE"))
    }

    pub fn data(&self) -> DispatchResult<Json> {
        self.record
            .as_ref()
            .and_then(|r| r.data.clone())
            .ok_or_else(|| DispatchError::Validation("Message has no record data".to_string()))
    }
}

pub struct QueueConsumer {
    client: aws_sdk_sqs::Client,
    queue_url: String,
    name: &'static str,
}

impl QueueConsumer {
    pub fn new(client: aws_sdk_sqs::Client, queue_url: impl Into<String>, name: &'static str) -> Self {
        Self { client, queue_url: queue_url.into(), name }
    }

    /// Long-poll loop. Returns only on shutdown or a fatal outcome.
    pub async fn run<F, Fut>(
        &self,
        mut shutdown: watch::Receiver<bool>,
        handler: F
    ) -> AppResult<()>
        where F: Fn(String) -> Fut + Send + Sync, Fut: Future<Output = DispatchResult<()>> + Send
    {
        info!("Listener {} started on {}", self.name, self.queue_url);

        loop {
            let receive = self.client
                .receive_message()
                .queue_url(&self.queue_url)
                .wait_time_seconds(WAIT_TIME_SECONDS)
                .max_number_of_messages(MAX_MESSAGES)
                .send();

            let response = tokio::select! {
                r = receive => r,
                _ = shutdown.changed() => {
                    info!("Listener {} stopping", self.name);
                    return Ok(());
                }
            };

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    warn!("Listener {} receive failed: {}", self.name, e);
                    tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                    continue;
                }
            };

            for message in response.messages() {
                let Some(body) = message.body() else {
                    continue;
                };

                match handler(body.to_string()).await {
                    Ok(()) => {
                        self.ack(message.receipt_handle()).await;
                    }
                    Err(e) if e.is_retryable() => {
                        // No ack; the transport redelivers.
                        warn!("Listener {} transient failure: {}", self.name, e);
                    }
                    Err(DispatchError::Fatal(reason)) => {
                        error!("Listener {} fatal failure: {}", self.name, reason);
                        return Err(AppError::InternalServerError(reason));
                    }
                    Err(e) => {
                        warn!("Listener {} recorded failure, acking: {}", self.name, e);
                        self.ack(message.receipt_handle()).await;
                    }
                }
            }
        }
    }

    async fn ack(&self, receipt_handle: Option<&str>) {
        let Some(receipt_handle) = receipt_handle else {
            return;
        };

        if
            let Err(e) = self.client
                .delete_message()
                .queue_url(&self.queue_url)
                .receipt_handle(receipt_handle)
                .send().await
        {
            warn!("Listener {} failed to ack message: {}", self.name, e);
        }
    }
}
