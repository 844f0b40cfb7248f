//! Reference-service adapter for local-office contact lookup.
//!
//! Contacts are cached per owner name; readers accept slightly stale data
//! and a failed refresh falls through to the configured support contact at
//! normalization time.

use std::time::Duration;

use async_trait::async_trait;
use moka::sync::Cache;
use tracing::warn;

use crate::config::ServiceConfig;
use crate::error::{ AppError, AppResult };
use crate::models::local_office_contact::LocalOfficeContact;

const CONTACT_CACHE_TTL: Duration = Duration::from_secs(15 * 60);
const CONTACT_CACHE_CAPACITY: u64 = 256;

#[async_trait]
pub trait ContactReference: Send + Sync {
    async fn get_local_office_contacts(
        &self,
        owner: &str
    ) -> AppResult<Vec<LocalOfficeContact>>;
}

pub struct ReferenceClient {
    http: reqwest::Client,
    base_url: String,
    cache: Cache<String, Vec<LocalOfficeContact>>,
}

impl ReferenceClient {
    pub fn new(services: &ServiceConfig) -> Self {
        let http = reqwest::Client
            ::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_default();

        Self {
            http,
            base_url: services.reference_url.clone(),
            cache: Cache::builder()
                .max_capacity(CONTACT_CACHE_CAPACITY)
                .time_to_live(CONTACT_CACHE_TTL)
                .build(),
        }
    }
}

#[async_trait]
impl ContactReference for ReferenceClient {
    async fn get_local_office_contacts(
        &self,
        owner: &str
    ) -> AppResult<Vec<LocalOfficeContact>> {
        if let Some(contacts) = self.cache.get(owner) {
            return Ok(contacts);
        }

        let url = format!(
            "{}/api/local-office-contact-by-lo-name/{}",
            self.base_url,
            urlencoding::encode(owner)
        );

        let response = self.http
            .get(&url)
            .send().await
            .map_err(|e| AppError::DatabaseError(format!("Reference service error: {}", e)))?;

        if !response.status().is_success() {
            warn!("Reference service returned {} for {}", response.status(), owner);
            return Err(
                AppError::DatabaseError(
                    format!("Reference service returned {}", response.status())
                )
            );
        }

        let raw: Vec<serde_json::Value> = response
            .json().await
            .map_err(|e| AppError::DatabaseError(format!("Reference service body: {}", e)))?;

        let contacts: Vec<LocalOfficeContact> = raw
            .into_iter()
            .filter_map(|value| {
                let contact = value.get("contact")?.as_str()?.to_string();
                let contact_type = value
                    .get("contactTypeName")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string());
                Some(LocalOfficeContact::new(contact_type, contact))
            })
            .collect();

        self.cache.insert(owner.to_string(), contacts.clone());
        Ok(contacts)
    }
}
