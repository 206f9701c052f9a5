use std::cell::RefCell;

use chrono::{Duration, Utc};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::service_account::ServiceAccountKey;
use crate::provider::ProviderError;

const GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const SCOPES: &str = "https://www.googleapis.com/auth/cloud-platform https://www.googleapis.com/auth/identitytoolkit";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Fetch a new token this long before the cached one runs out.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Clone)]
struct CachedToken {
    access_token: String,
    refresh_at: chrono::DateTime<Utc>,
}

/// OAuth2 access tokens for the admin API, obtained with the JWT-bearer grant
/// and reused until shortly before they expire.
pub struct AccessTokenSource {
    key: ServiceAccountKey,
    client: Client,
    cached: RefCell<Option<CachedToken>>,
}

impl AccessTokenSource {
    pub fn new(key: ServiceAccountKey, client: Client) -> Self {
        Self {
            key,
            client,
            cached: RefCell::new(None),
        }
    }

    pub fn token(&self) -> Result<String, ProviderError> {
        if let Some(cached) = self.cached.borrow().as_ref() {
            if Utc::now() < cached.refresh_at {
                return Ok(cached.access_token.clone());
            }
        }

        let fresh = self.fetch()?;
        let token = fresh.access_token.clone();
        *self.cached.borrow_mut() = Some(fresh);
        Ok(token)
    }

    fn fetch(&self) -> Result<CachedToken, ProviderError> {
        let iat = Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: &self.key.client_email,
            scope: SCOPES,
            aud: &self.key.token_uri,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };
        let assertion = self
            .key
            .sign(&claims)
            .map_err(|e| ProviderError::Credential(format!("could not sign assertion: {}", e)))?;

        debug!(token_uri = %self.key.token_uri, "requesting admin access token");

        let response = self
            .client
            .post(&self.key.token_uri)
            .form(&[("grant_type", GRANT_TYPE), ("assertion", assertion.as_str())])
            .send()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        if !status.is_success() {
            let detail = serde_json::from_str::<TokenErrorResponse>(&body)
                .ok()
                .map(|e| {
                    format!(
                        "{} - {}",
                        e.error.unwrap_or_default(),
                        e.error_description.unwrap_or_default()
                    )
                })
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            return Err(ProviderError::Credential(format!(
                "token exchange failed: {}",
                detail
            )));
        }

        let parsed: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| ProviderError::Credential(format!("unreadable token response: {}", e)))?;

        // Capped at the assertion lifetime.
        let lifetime = parsed.expires_in.clamp(0, ASSERTION_LIFETIME_SECS) - EXPIRY_MARGIN_SECS;
        let refresh_at = Duration::try_seconds(lifetime)
            .and_then(|d| Utc::now().checked_add_signed(d))
            .ok_or_else(|| {
                ProviderError::Credential(format!(
                    "unusable token lifetime: {}s",
                    parsed.expires_in
                ))
            })?;

        Ok(CachedToken {
            access_token: parsed.access_token,
            refresh_at,
        })
    }
}
