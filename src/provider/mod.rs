pub mod firebase;
mod user;

use std::fmt;

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

pub use firebase::FirebaseProvider;
pub(crate) use user::RawUser;
pub use user::UserRecord;

/// One page of the provider's user listing.
#[derive(Debug, Clone, Default)]
pub struct UserPage {
    pub users: Vec<UserRecord>,
    /// Cursor for the following page; `None` once the listing is exhausted.
    pub next_page_token: Option<String>,
}

/// A single-field account update. Each variant names exactly one field, so an
/// update can never overwrite anything else on the account.
#[derive(Clone, PartialEq, Eq)]
pub enum UserUpdate {
    Password(String),
    DisplayName(String),
}

impl UserUpdate {
    pub fn field(&self) -> &'static str {
        match self {
            UserUpdate::Password(_) => "password",
            UserUpdate::DisplayName(_) => "displayName",
        }
    }
}

impl fmt::Debug for UserUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserUpdate::Password(_) => f.write_str("Password(<redacted>)"),
            UserUpdate::DisplayName(name) => f.debug_tuple("DisplayName").field(name).finish(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("no user record for uid '{0}'")]
    NotFound(String),

    /// No HTTP answer at all (DNS, connect, TLS, timeout).
    #[error("request failed: {0}")]
    Transport(String),

    #[error("provider returned {status}: {message}")]
    Rejected { status: u16, message: String },

    /// The service account could not be turned into a usable credential.
    #[error("credential error: {0}")]
    Credential(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// The identity SDK surface the console consumes.
pub trait IdentityProvider {
    fn name(&self) -> &str;
    fn list_users_page(&self, page_token: Option<&str>) -> Result<UserPage, ProviderError>;
    fn get_user(&self, uid: &str) -> Result<UserRecord, ProviderError>;
    fn update_user(&self, uid: &str, update: &UserUpdate) -> Result<(), ProviderError>;
    fn create_custom_token(
        &self,
        uid: &str,
        claims: Option<&Map<String, Value>>,
    ) -> Result<String, ProviderError>;
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Pulls `error.message` out of a Google API error body.
pub(crate) fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error.message)
        .filter(|message| !message.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_from_envelope() {
        let body = r#"{"error": {"code": 400, "message": "INVALID_PASSWORD", "errors": []}}"#;
        assert_eq!(error_message(body), Some("INVALID_PASSWORD".to_string()));
    }

    #[test]
    fn test_error_message_missing() {
        assert_eq!(error_message(r#"{"error": {"code": 500}}"#), None);
        assert_eq!(error_message("<html>bad gateway</html>"), None);
        assert_eq!(error_message(r#"{"error": {"message": ""}}"#), None);
    }

    #[test]
    fn test_update_debug_hides_password() {
        let debug = format!("{:?}", UserUpdate::Password("hunter22".to_string()));
        assert!(!debug.contains("hunter22"));
        assert_eq!(UserUpdate::DisplayName("Ann".to_string()).field(), "displayName");
    }
}
