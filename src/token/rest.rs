use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use super::IssuedToken;
use crate::error::ConsoleError;
use crate::provider::error_message;

pub const DEFAULT_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";

const SIGN_IN_WITH_PASSWORD: &str = "accounts:signInWithPassword";
const SIGN_IN_WITH_CUSTOM_TOKEN: &str = "accounts:signInWithCustomToken";
const UNKNOWN_ERROR: &str = "Unknown error";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordSignIn<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CustomTokenSignIn<'a> {
    token: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    id_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    /// Seconds, as a string.
    #[serde(default)]
    expires_in: Option<String>,
}

/// End-user REST sign-in endpoints. Every call needs the project's web API
/// key, which the admin credential cannot produce.
pub struct IdentityToolkit {
    base_url: String,
    client: Client,
}

impl IdentityToolkit {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    pub fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
        api_key: &str,
    ) -> Result<IssuedToken, ConsoleError> {
        let body = PasswordSignIn {
            email,
            password,
            return_secure_token: true,
        };
        self.post(SIGN_IN_WITH_PASSWORD, api_key, &body)
    }

    pub fn sign_in_with_custom_token(
        &self,
        token: &str,
        api_key: &str,
    ) -> Result<IssuedToken, ConsoleError> {
        let body = CustomTokenSignIn {
            token,
            return_secure_token: true,
        };
        self.post(SIGN_IN_WITH_CUSTOM_TOKEN, api_key, &body)
    }

    fn post<B: Serialize>(
        &self,
        endpoint: &str,
        api_key: &str,
        body: &B,
    ) -> Result<IssuedToken, ConsoleError> {
        if api_key.trim().is_empty() {
            return Err(ConsoleError::TokenIssuanceFailed(
                "a web API key is required".to_string(),
            ));
        }

        let mut url = Url::parse(&format!("{}/{}", self.base_url, endpoint))
            .map_err(|e| ConsoleError::NetworkError(format!("invalid endpoint: {}", e)))?;
        url.query_pairs_mut().append_pair("key", api_key.trim());

        debug!(endpoint, "sending sign-in request");

        let response = self.client.post(url).json(body).send().map_err(|e| {
            warn!(endpoint, error = %e, "sign-in request did not complete");
            ConsoleError::NetworkError(e.to_string())
        })?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|e| ConsoleError::NetworkError(e.to_string()))?;

        if status.as_u16() != 200 {
            let message = error_message(&text).unwrap_or_else(|| UNKNOWN_ERROR.to_string());
            warn!(endpoint, status = status.as_u16(), %message, "sign-in rejected");
            return Err(ConsoleError::TokenIssuanceFailed(message));
        }

        let parsed: SignInResponse = serde_json::from_str(&text).map_err(|e| {
            ConsoleError::TokenIssuanceFailed(format!("unreadable sign-in response: {}", e))
        })?;

        Ok(IssuedToken {
            value: parsed.id_token,
            refresh_token: parsed.refresh_token,
            expires_in: parsed.expires_in.and_then(|s| s.parse().ok()),
        })
    }
}
