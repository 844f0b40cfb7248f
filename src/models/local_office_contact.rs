use std::sync::LazyLock;

use regex::Regex;
use serde::{ Deserialize, Serialize };

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s,;]+@[^@\s,;]+\.[^@\s,;]+$").expect("email regex")
});

static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://\S+$").expect("url regex")
});

/// How a contact value should be presented to the trainee.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactHref {
    Email,
    Url,
    NonHref,
}

impl ContactHref {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactHref::Email => "email",
            ContactHref::Url => "url",
            ContactHref::NonHref => "non_href",
        }
    }

    /// Classify a raw contact value. Anything that is neither a URL nor a
    /// single email address renders as plain text.
    pub fn classify(value: &str) -> ContactHref {
        let trimmed = value.trim();
        if URL_RE.is_match(trimmed) {
            ContactHref::Url
        } else if EMAIL_RE.is_match(trimmed) {
            ContactHref::Email
        } else {
            ContactHref::NonHref
        }
    }
}

/// A contact point owned by a local office, served by the reference service
/// and cached by owner name.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct LocalOfficeContact {
    #[serde(default)]
    pub contact_type: Option<String>,
    pub contact: String,
    #[serde(default = "default_href")]
    pub href_type: ContactHref,
}

fn default_href() -> ContactHref {
    ContactHref::NonHref
}

impl LocalOfficeContact {
    pub fn new(contact_type: Option<String>, contact: impl Into<String>) -> Self {
        let contact = contact.into();
        let href_type = ContactHref::classify(&contact);
        Self { contact_type, contact, href_type }
    }
}
