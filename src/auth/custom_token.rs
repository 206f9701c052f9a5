use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};

use super::service_account::ServiceAccountKey;
use crate::provider::ProviderError;

pub const CUSTOM_TOKEN_AUDIENCE: &str =
    "https://identitytoolkit.googleapis.com/google.identity.identitytoolkit.v1.IdentityToolkit";

/// Custom tokens are valid for one hour; the provider enforces it on exchange.
const CUSTOM_TOKEN_LIFETIME_SECS: i64 = 3600;
const MAX_UID_LEN: usize = 128;

/// Claim names the provider reserves for itself.
const RESERVED_CLAIMS: &[&str] = &[
    "acr", "amr", "at_hash", "aud", "auth_time", "azp", "cnf", "c_hash", "exp", "firebase",
    "iat", "iss", "jti", "nbf", "nonce", "sub",
];

#[derive(Serialize)]
struct CustomTokenClaims<'a> {
    iss: &'a str,
    sub: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
    uid: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    claims: Option<&'a Map<String, Value>>,
}

/// Signs a custom token for `uid` locally with the service account key.
pub fn sign_custom_token(
    key: &ServiceAccountKey,
    uid: &str,
    claims: Option<&Map<String, Value>>,
) -> Result<String, ProviderError> {
    if uid.is_empty() || uid.chars().count() > MAX_UID_LEN {
        return Err(ProviderError::InvalidArgument(format!(
            "uid must be 1-{} characters",
            MAX_UID_LEN
        )));
    }

    if let Some(claims) = claims {
        if let Some(reserved) = claims
            .keys()
            .find(|name| RESERVED_CLAIMS.contains(&name.as_str()))
        {
            return Err(ProviderError::InvalidArgument(format!(
                "claim '{}' is reserved",
                reserved
            )));
        }
    }

    let iat = Utc::now().timestamp();
    let payload = CustomTokenClaims {
        iss: &key.client_email,
        sub: &key.client_email,
        aud: CUSTOM_TOKEN_AUDIENCE,
        iat,
        exp: iat + CUSTOM_TOKEN_LIFETIME_SECS,
        uid,
        claims: claims.filter(|c| !c.is_empty()),
    };

    key.sign(&payload)
        .map_err(|e| ProviderError::Credential(format!("could not sign custom token: {}", e)))
}
