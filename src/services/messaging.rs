//! Messaging gatekeeper.
//!
//! Decides whether a person may be messaged on a channel at all, and answers
//! the pilot/new-starter questions by deferring to the trainee-details
//! service. The remote side is authoritative, so answers are never cached
//! here; any error or null answer suppresses conservatively.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::config::{ NotificationConfig, ServiceConfig };
use crate::models::history::MessageChannel;

#[async_trait]
pub trait RecipientGate: Send + Sync {
    fn is_valid_recipient(&self, person_id: &str, channel: MessageChannel) -> bool;

    async fn is_placement_in_pilot_2024(&self, person_id: &str, placement_id: &str) -> bool;

    async fn is_programme_membership_in_pilot_2024(
        &self,
        person_id: &str,
        programme_membership_id: &str
    ) -> bool;

    async fn is_programme_membership_new_starter(
        &self,
        person_id: &str,
        programme_membership_id: &str
    ) -> bool;
}

pub struct MessagingController {
    whitelist: HashSet<String>,
    email_enabled: bool,
    in_app_enabled: bool,
    http: reqwest::Client,
    trainee_service_url: String,
}

impl MessagingController {
    pub fn new(notifications: &NotificationConfig, services: &ServiceConfig) -> Self {
        let http = reqwest::Client
            ::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_default();

        Self {
            whitelist: notifications.whitelist.iter().cloned().collect(),
            email_enabled: notifications.email_enabled,
            in_app_enabled: notifications.in_app_enabled,
            http,
            trainee_service_url: services.trainee_url.clone(),
        }
    }

    async fn remote_flag(&self, path: String) -> bool {
        let url = format!("{}{}", self.trainee_service_url, path);

        let response = match self.http.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!("Messaging check failed, suppressing: {} ({})", url, e);
                return false;
            }
        };

        if !response.status().is_success() {
            warn!("Messaging check returned {}, suppressing: {}", response.status(), url);
            return false;
        }

        match response.json::<Option<bool>>().await {
            Ok(Some(flag)) => flag,
            Ok(None) => false,
            Err(e) => {
                warn!("Messaging check body unreadable, suppressing: {} ({})", url, e);
                false
            }
        }
    }
}

#[async_trait]
impl RecipientGate for MessagingController {
    fn is_valid_recipient(&self, person_id: &str, channel: MessageChannel) -> bool {
        if self.whitelist.contains(person_id) {
            return true;
        }

        match channel {
            MessageChannel::Email => self.email_enabled,
            MessageChannel::InApp => self.in_app_enabled,
        }
    }

    async fn is_placement_in_pilot_2024(&self, person_id: &str, placement_id: &str) -> bool {
        self.remote_flag(
            format!("/api/placement/ispilot2024/{}/{}", person_id, placement_id)
        ).await
    }

    async fn is_programme_membership_in_pilot_2024(
        &self,
        person_id: &str,
        programme_membership_id: &str
    ) -> bool {
        self.remote_flag(
            format!(
                "/api/programme-membership/ispilot2024/{}/{}",
                person_id,
                programme_membership_id
            )
        ).await
    }

    async fn is_programme_membership_new_starter(
        &self,
        person_id: &str,
        programme_membership_id: &str
    ) -> bool {
        self.remote_flag(
            format!(
                "/api/programme-membership/isnewstarter/{}/{}",
                person_id,
                programme_membership_id
            )
        ).await
    }
}
