use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// The handful of JWT payload fields worth showing an operator.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenClaims {
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub iss: Option<String>,
    #[serde(default)]
    pub exp: Option<i64>,
}

impl TokenClaims {
    /// Custom tokens carry `uid`; ID tokens carry `user_id` and `sub`.
    pub fn subject(&self) -> Option<&str> {
        self.uid
            .as_deref()
            .or(self.user_id.as_deref())
            .or(self.sub.as_deref())
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp(self.exp?, 0)
    }
}

/// Reads a JWT payload without checking the signature. Display only.
pub fn peek(token: &str) -> Option<TokenClaims> {
    let mut segments = token.split('.');
    let (_header, payload, _signature) = (segments.next()?, segments.next()?, segments.next()?);
    if segments.next().is_some() {
        return None;
    }

    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    serde_json::from_slice(&bytes).ok()
}
