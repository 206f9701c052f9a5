use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

const REQUIRED_FIELDS: &[&str] = &["type", "project_id", "private_key", "client_email"];
const SERVICE_ACCOUNT_TYPE: &str = "service_account";

#[derive(Deserialize)]
struct RawServiceAccount {
    #[serde(rename = "type")]
    kind: String,
    project_id: String,
    private_key: String,
    client_email: String,
    #[serde(default)]
    private_key_id: Option<String>,
    #[serde(default)]
    token_uri: Option<String>,
}

/// Firebase admin service account, loaded once at startup.
#[derive(Clone)]
pub struct ServiceAccountKey {
    pub project_id: String,
    pub client_email: String,
    pub private_key_id: Option<String>,
    pub token_uri: String,
    encoding_key: EncodingKey,
}

impl ServiceAccountKey {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read admin JSON file: {}", path.display()))?;
        Self::from_json(&contents)
            .with_context(|| format!("Invalid Firebase admin JSON file: {}", path.display()))
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        let value: serde_json::Value =
            serde_json::from_str(contents).context("File is not valid JSON")?;

        let missing: Vec<&str> = REQUIRED_FIELDS
            .iter()
            .copied()
            .filter(|field| value.get(field).is_none())
            .collect();
        if !missing.is_empty() {
            anyhow::bail!("Missing required field(s): {}", missing.join(", "));
        }

        let raw: RawServiceAccount =
            serde_json::from_value(value).context("Malformed service account fields")?;

        if raw.kind != SERVICE_ACCOUNT_TYPE {
            anyhow::bail!(
                "Expected type '{}', found '{}'",
                SERVICE_ACCOUNT_TYPE,
                raw.kind
            );
        }

        let encoding_key = EncodingKey::from_rsa_pem(raw.private_key.as_bytes())
            .context("private_key is not a valid RSA PEM key")?;

        Ok(Self {
            project_id: raw.project_id,
            client_email: raw.client_email,
            private_key_id: raw.private_key_id,
            token_uri: raw
                .token_uri
                .filter(|uri| !uri.is_empty())
                .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
            encoding_key,
        })
    }

    /// Signs `claims` as an RS256 JWT with the service account key.
    pub fn sign<T: Serialize>(&self, claims: &T) -> Result<String, jsonwebtoken::errors::Error> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.private_key_id.clone();
        encode(&header, claims, &self.encoding_key)
    }
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}
