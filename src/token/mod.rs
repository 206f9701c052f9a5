pub mod claims;
pub mod rest;

use std::fmt;

use serde_json::{Map, Value};
use tracing::info;

use crate::directory::DirectoryClient;
use crate::error::ConsoleError;
use crate::provider::IdentityProvider;

pub use rest::IdentityToolkit;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    CustomToken,
    IdToken,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::CustomToken => f.write_str("Custom token"),
            TokenKind::IdToken => f.write_str("ID token"),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub value: String,
    /// Returned by the REST sign-in paths; kept but not used.
    pub refresh_token: Option<String>,
    pub expires_in: Option<u64>,
}

impl IssuedToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            refresh_token: None,
            expires_in: None,
        }
    }
}

impl fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedToken")
            .field("value", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Outcome of one issuance call: a token or an error, never both.
#[derive(Debug)]
pub struct TokenResult {
    pub kind: TokenKind,
    pub outcome: Result<IssuedToken, ConsoleError>,
}

impl TokenResult {
    pub fn new(kind: TokenKind, outcome: Result<IssuedToken, ConsoleError>) -> Self {
        Self { kind, outcome }
    }

    pub fn value(&self) -> Option<&str> {
        self.outcome.as_ref().ok().map(|t| t.value.as_str())
    }

    pub fn error(&self) -> Option<&ConsoleError> {
        self.outcome.as_ref().err()
    }
}

/// The two issuance paths: custom tokens signed with the admin credential, and
/// REST sign-ins that need the project's web API key.
pub struct TokenIssuer {
    toolkit: IdentityToolkit,
}

impl TokenIssuer {
    pub fn new(toolkit: IdentityToolkit) -> Self {
        Self { toolkit }
    }

    /// Checks that `uid` exists before signing anything for it.
    pub fn mint_custom_token<P: IdentityProvider>(
        &self,
        directory: &DirectoryClient<P>,
        uid: &str,
        claims: Option<&Map<String, Value>>,
    ) -> TokenResult {
        let outcome = directory
            .find_by_uid(uid)
            .and_then(|user| directory.create_custom_token(&user.uid, claims))
            .map(IssuedToken::new);
        if outcome.is_ok() {
            info!(uid, "custom token minted");
        }
        TokenResult::new(TokenKind::CustomToken, outcome)
    }

    pub fn sign_in_with_password(&self, email: &str, password: &str, api_key: &str) -> TokenResult {
        TokenResult::new(
            TokenKind::IdToken,
            self.toolkit.sign_in_with_password(email, password, api_key),
        )
    }

    pub fn exchange_custom_token(&self, custom_token: &str, api_key: &str) -> TokenResult {
        TokenResult::new(
            TokenKind::IdToken,
            self.toolkit.sign_in_with_custom_token(custom_token, api_key),
        )
    }
}
