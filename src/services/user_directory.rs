//! User directory adapter.
//!
//! Maps TIS person ids to directory account ids via a warm cache rebuilt
//! from a full paginated pool scan, and fetches contact details for a
//! single account on demand. The rebuild is rate-limited: at most one scan
//! per cooldown period, and the cooldown persists across further misses.

use std::collections::{ HashMap, HashSet };
use std::time::{ Duration, Instant };

use async_trait::async_trait;
use aws_sdk_cognitoidentityprovider::Client;
use tokio::sync::{ Mutex, RwLock };
use tracing::{ info, warn };

use crate::error::{ AppError, AppResult };
use crate::models::account::UserDetails;

const REBUILD_COOLDOWN: Duration = Duration::from_secs(15 * 60);

const PERSON_ID_ATTRIBUTE: &str = "custom:tisId";

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Account ids held by a person; empty when the person has none.
    async fn get_user_account_ids(&self, person_id: &str) -> AppResult<HashSet<String>>;

    async fn get_user_details_by_id(&self, user_id: &str) -> AppResult<UserDetails>;

    async fn get_user_details_by_email(&self, email: &str) -> AppResult<UserDetails>;
}

pub struct CognitoUserDirectory {
    client: Client,
    user_pool_id: String,
    cache: RwLock<HashMap<String, HashSet<String>>>,
    last_rebuild: Mutex<Option<Instant>>,
}

impl CognitoUserDirectory {
    pub fn new(client: Client, user_pool_id: impl Into<String>) -> Self {
        Self {
            client,
            user_pool_id: user_pool_id.into(),
            cache: RwLock::new(HashMap::new()),
            last_rebuild: Mutex::new(None),
        }
    }

    /// Rebuilds the whole person-id to account-id map with one paginated
    /// scan, unless a rebuild ran within the cooldown.
    async fn rebuild_cache(&self) -> AppResult<()> {
        let mut last_rebuild = self.last_rebuild.lock().await;
        if last_rebuild.is_some_and(|at| at.elapsed() < REBUILD_COOLDOWN) {
            return Ok(());
        }
        *last_rebuild = Some(Instant::now());

        let mut map: HashMap<String, HashSet<String>> = HashMap::new();
        let mut pagination_token: Option<String> = None;

        loop {
            let response = self.client
                .list_users()
                .user_pool_id(&self.user_pool_id)
                .set_pagination_token(pagination_token)
                .send().await
                .map_err(|e| {
                    AppError::DatabaseError(format!("Failed to list directory users: {}", e))
                })?;

            for user in response.users() {
                let Some(username) = user.username() else {
                    continue;
                };

                let person_id = user
                    .attributes()
                    .iter()
                    .find(|a| a.name() == PERSON_ID_ATTRIBUTE)
                    .and_then(|a| a.value());

                if let Some(person_id) = person_id {
                    map.entry(person_id.to_string())
                        .or_default()
                        .insert(username.to_string());
                }
            }

            pagination_token = response.pagination_token().map(|t| t.to_string());
            if pagination_token.is_none() {
                break;
            }
        }

        info!("Rebuilt user directory cache with {} persons", map.len());
        *self.cache.write().await = map;
        Ok(())
    }

    async fn single_user(&self, filter: String) -> AppResult<UserDetails> {
        let response = self.client
            .list_users()
            .user_pool_id(&self.user_pool_id)
            .filter(&filter)
            .limit(1)
            .send().await
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to query directory: {}", e))
            })?;

        let Some(user) = response.users().first() else {
            return Err(AppError::UserNotFound(filter));
        };

        let attribute = |name: &str| {
            user.attributes()
                .iter()
                .find(|a| a.name() == name)
                .and_then(|a| a.value())
                .map(|v| v.to_string())
        };

        Ok(UserDetails {
            email: attribute("email").unwrap_or_default(),
            family_name: attribute("family_name"),
            given_name: attribute("given_name"),
            gmc_number: attribute("custom:gmcNumber"),
        })
    }
}

#[async_trait]
impl UserDirectory for CognitoUserDirectory {
    async fn get_user_account_ids(&self, person_id: &str) -> AppResult<HashSet<String>> {
        if let Some(ids) = self.cache.read().await.get(person_id) {
            return Ok(ids.clone());
        }

        if let Err(e) = self.rebuild_cache().await {
            warn!("User directory rebuild failed: {}", e);
            return Err(e);
        }

        Ok(self.cache.read().await.get(person_id).cloned().unwrap_or_default())
    }

    async fn get_user_details_by_id(&self, user_id: &str) -> AppResult<UserDetails> {
        self.single_user(format!("sub = \"{}\"", user_id)).await
    }

    async fn get_user_details_by_email(&self, email: &str) -> AppResult<UserDetails> {
        self.single_user(format!("email = \"{}\"", email)).await
    }
}
