//! Template resolution and rendering.
//!
//! Templates are addressed as `{message_type}/{template_name}/{version}` and
//! carry two named fragments: `subject` (plain text, whitespace collapsed)
//! and `content` (HTML). The version bound to a `(notification type,
//! message type)` pair comes from configuration; asking for an unbound pair
//! is an `UnknownTemplate` error.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use chrono::DateTime;
use chrono_tz::Tz;
use handlebars::Handlebars;
use serde_json::Value as Json;
use tracing::debug;

use crate::config::TemplateConfig;
use crate::error::{ AppError, AppResult };
use crate::models::history::MessageChannel;
use crate::models::notification_type::NotificationType;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedMessage {
    pub subject: String,
    pub body: String,
}

/// Configured `(notification type, message type) -> version` table.
#[derive(Clone, Debug)]
pub struct TemplateVersions {
    versions: HashMap<(NotificationType, MessageChannel), String>,
}

impl TemplateVersions {
    pub fn from_config(config: &TemplateConfig) -> AppResult<Self> {
        let mut versions = HashMap::new();

        for notification_type in NotificationType::all() {
            for channel in notification_type.channels() {
                versions.insert(
                    (*notification_type, *channel),
                    config.default_version.clone()
                );
            }
        }

        if let Some(raw) = &config.version_overrides {
            let overrides: HashMap<String, String> = serde_json
                ::from_str(raw)
                .map_err(|e| {
                    AppError::ConfigError(format!("Invalid template version overrides: {}", e))
                })?;

            for (key, version) in overrides {
                let (channel_str, type_str) = key.split_once('/').ok_or_else(|| {
                    AppError::ConfigError(format!("Invalid template override key: {}", key))
                })?;
                let channel = MessageChannel::from_string(channel_str)?;
                let notification_type = NotificationType::from_string(type_str)?;
                versions.insert((notification_type, channel), version);
            }
        }

        Ok(Self { versions })
    }

    pub fn resolve(
        &self,
        notification_type: NotificationType,
        channel: MessageChannel
    ) -> AppResult<&str> {
        self.versions
            .get(&(notification_type, channel))
            .map(|v| v.as_str())
            .ok_or_else(|| {
                AppError::UnknownTemplate(
                    format!("{}/{}", channel.message_type(), notification_type.template_name())
                )
            })
    }
}

pub struct TemplateEngine {
    registry: Handlebars<'static>,
    versions: TemplateVersions,
    timezone: Tz,
}

impl TemplateEngine {
    pub fn new(timezone: Tz, versions: TemplateVersions) -> Self {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(false);
        Self { registry, versions, timezone }
    }

    pub fn versions(&self) -> &TemplateVersions {
        &self.versions
    }

    /// Registers the subject and content fragments of one template version.
    pub fn register(
        &mut self,
        message_type: &str,
        template_name: &str,
        version: &str,
        subject_source: &str,
        content_source: &str
    ) -> AppResult<()> {
        let base = format!("{}/{}/{}", message_type, template_name, version);

        self.registry
            .register_template_string(&format!("{}/subject", base), subject_source)
            .map_err(|e| AppError::TemplateError(format!("{}: {}", base, e)))?;
        self.registry
            .register_template_string(&format!("{}/content", base), content_source)
            .map_err(|e| AppError::TemplateError(format!("{}: {}", base, e)))?;

        Ok(())
    }

    /// Loads a `{root}/{message_type}/{name}/{version}/{subject,content}.hbs`
    /// tree into the registry.
    pub fn load_dir(&mut self, root: &Path) -> AppResult<()> {
        for message_type in ["email", "in-app"] {
            let type_dir = root.join(message_type);
            if !type_dir.is_dir() {
                continue;
            }

            for name_entry in read_dir(&type_dir)? {
                if !name_entry.is_dir() {
                    continue;
                }
                for version_entry in read_dir(&name_entry)? {
                    if !version_entry.is_dir() {
                        continue;
                    }
                    let subject = read_fragment(&version_entry.join("subject.hbs"))?;
                    let content = read_fragment(&version_entry.join("content.hbs"))?;
                    let name = file_name(&name_entry);
                    let version = file_name(&version_entry);
                    self.register(message_type, &name, &version, &subject, &content)?;
                    debug!("Registered template {}/{}/{}", message_type, name, version);
                }
            }
        }

        Ok(())
    }

    /// Renders the addressed template against timezone-localized variables.
    pub fn render(
        &self,
        message_type: &str,
        notification_type: NotificationType,
        version: &str,
        variables: &Json
    ) -> AppResult<RenderedMessage> {
        let base = format!(
            "{}/{}/{}",
            message_type,
            notification_type.template_name(),
            version
        );
        let subject_key = format!("{}/subject", base);
        let content_key = format!("{}/content", base);

        if
            !self.registry.has_template(&subject_key) ||
            !self.registry.has_template(&content_key)
        {
            return Err(AppError::UnknownTemplate(base));
        }

        let localized = localize_variables(variables, self.timezone);

        let subject_raw = self.registry
            .render(&subject_key, &localized)
            .map_err(|e| AppError::TemplateError(format!("{}: {}", subject_key, e)))?;
        let body = self.registry
            .render(&content_key, &localized)
            .map_err(|e| AppError::TemplateError(format!("{}: {}", content_key, e)))?;

        Ok(RenderedMessage {
            subject: collapse_whitespace(&subject_raw),
            body,
        })
    }
}

/// Absolute timestamps are presented in the configured local timezone;
/// every other value passes through unchanged.
pub fn localize_variables(variables: &Json, timezone: Tz) -> Json {
    match variables {
        Json::Object(map) => {
            let localized = map
                .iter()
                .map(|(k, v)| (k.clone(), localize_variables(v, timezone)))
                .collect();
            Json::Object(localized)
        }
        Json::Array(values) => {
            Json::Array(values.iter().map(|v| localize_variables(v, timezone)).collect())
        }
        Json::String(s) => {
            match DateTime::parse_from_rfc3339(s) {
                Ok(instant) => {
                    let local = instant.with_timezone(&timezone);
                    Json::String(local.format("%-d %B %Y %H:%M").to_string())
                }
                Err(_) => Json::String(s.clone()),
            }
        }
        other => other.clone(),
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn read_dir(dir: &Path) -> AppResult<Vec<std::path::PathBuf>> {
    let entries = fs
        ::read_dir(dir)
        .map_err(|e| AppError::TemplateError(format!("{}: {}", dir.display(), e)))?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| AppError::TemplateError(e.to_string()))?;
        paths.push(entry.path());
    }
    paths.sort();
    Ok(paths)
}

fn read_fragment(path: &Path) -> AppResult<String> {
    fs::read_to_string(path).map_err(|e| {
        AppError::TemplateError(format!("{}: {}", path.display(), e))
    })
}

fn file_name(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}
