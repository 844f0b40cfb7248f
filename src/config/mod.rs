use chrono_tz::Tz;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub aws: AwsConfig,
    pub notifications: NotificationConfig,
    pub templates: TemplateConfig,
    pub services: ServiceConfig,
    pub mail: MailConfig,
    pub sns: SnsConfig,
    pub cognito: CognitoConfig,
    pub queues: QueueConfig,
    pub environment: String,
    pub allow_origins: String,
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Local DynamoDB endpoint; unset in deployed environments.
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AwsConfig {
    pub region: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationConfig {
    /// Localization of schedule computation and template dates.
    pub timezone: Tz,
    /// Global channel gates; the whitelist bypasses them.
    pub email_enabled: bool,
    pub in_app_enabled: bool,
    /// Persons that always receive messages irrespective of channel gates.
    pub whitelist: Vec<String>,
    /// Minimum delay applied to immediate dispatch.
    pub delay_minutes: i64,
    /// Fallback support contact used when a local office has none usable.
    pub support_contact: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TemplateConfig {
    /// Version selected for every (type, channel) pair without an override.
    pub default_version: String,
    /// JSON map of `"EMAIL/PROGRAMME_UPDATED_WEEK_8": "v1.2.0"` overrides.
    pub version_overrides: Option<String>,
    /// Directory holding the template tree.
    pub root: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub trainee_url: String,
    pub reference_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub sender: String,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnsConfig {
    /// Unset disables broadcasting entirely.
    pub topic_arn: Option<String>,
    /// Name of the message attribute carrying the event type, when set.
    pub message_attribute: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CognitoConfig {
    pub user_pool_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    pub programme_membership_url: String,
    pub placement_url: String,
    pub coj_url: String,
    pub form_url: String,
    pub gmc_url: String,
    pub ltft_url: String,
    pub account_url: String,
    pub email_feedback_url: String,
    pub outbox_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self, crate::AppError> {
        envy::from_env().map_err(|e| {
            crate::AppError::ConfigError(format!("Failed to load config from environment: {}", e))
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                endpoint: Some("http://localhost:8000".to_string()),
            },
            aws: AwsConfig {
                region: "eu-west-2".to_string(),
                access_key_id: None,
                secret_access_key: None,
            },
            notifications: NotificationConfig {
                timezone: chrono_tz::Europe::London,
                email_enabled: true,
                in_app_enabled: true,
                whitelist: Vec::new(),
                delay_minutes: 0,
                support_contact: "TSS_SUPPORT".to_string(),
            },
            templates: TemplateConfig {
                default_version: "v1.0.0".to_string(),
                version_overrides: None,
                root: "templates".to_string(),
            },
            services: ServiceConfig {
                trainee_url: "http://localhost:8203".to_string(),
                reference_url: "http://localhost:8205".to_string(),
            },
            mail: MailConfig {
                sender: "no-reply@tis.localhost".to_string(),
                smtp_host: "localhost".to_string(),
                smtp_port: 1025,
                smtp_username: None,
                smtp_password: None,
            },
            sns: SnsConfig {
                topic_arn: None,
                message_attribute: None,
            },
            cognito: CognitoConfig {
                user_pool_id: "local_pool".to_string(),
            },
            queues: QueueConfig {
                programme_membership_url: "".to_string(),
                placement_url: "".to_string(),
                coj_url: "".to_string(),
                form_url: "".to_string(),
                gmc_url: "".to_string(),
                ltft_url: "".to_string(),
                account_url: "".to_string(),
                email_feedback_url: "".to_string(),
                outbox_url: "".to_string(),
            },
            environment: "dev".to_string(),
            allow_origins: "".to_string(),
            log_level: "info".to_string(),
        }
    }
}
