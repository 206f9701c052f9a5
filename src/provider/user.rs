use chrono::{DateTime, Utc};
use serde::Deserialize;

const NO_EMAIL: &str = "No email";
const NO_NAME: &str = "No name";
const NEVER: &str = "Never";
const UNKNOWN: &str = "Unknown";

/// Snapshot of one directory entry. Never patched in place: changes are picked
/// up by fetching the directory again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub email_verified: bool,
    pub disabled: bool,
    pub creation_time: Option<DateTime<Utc>>,
    pub last_sign_in: Option<DateTime<Utc>>,
}

impl UserRecord {
    pub fn email_label(&self) -> &str {
        self.email.as_deref().unwrap_or(NO_EMAIL)
    }

    pub fn name_label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(NO_NAME)
    }

    pub fn created_label(&self) -> String {
        timestamp_label(self.creation_time, UNKNOWN)
    }

    pub fn last_sign_in_label(&self) -> String {
        timestamp_label(self.last_sign_in, NEVER)
    }
}

fn timestamp_label(ts: Option<DateTime<Utc>>, fallback: &str) -> String {
    ts.map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| fallback.to_string())
}

/// User object as returned by the Identity Toolkit admin API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawUser {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    email_verified: bool,
    #[serde(default)]
    disabled: bool,
    /// Milliseconds since the epoch, encoded as a string.
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    last_login_at: Option<String>,
}

impl From<RawUser> for UserRecord {
    fn from(raw: RawUser) -> Self {
        Self {
            uid: raw.local_id,
            email: raw.email.filter(|e| !e.is_empty()),
            display_name: raw.display_name.filter(|n| !n.is_empty()),
            email_verified: raw.email_verified,
            disabled: raw.disabled,
            creation_time: parse_millis(raw.created_at.as_deref()),
            last_sign_in: parse_millis(raw.last_login_at.as_deref()),
        }
    }
}

fn parse_millis(value: Option<&str>) -> Option<DateTime<Utc>> {
    let millis: i64 = value?.parse().ok()?;
    DateTime::<Utc>::from_timestamp_millis(millis)
}
