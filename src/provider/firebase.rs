use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;
use url::Url;

use super::{error_message, IdentityProvider, ProviderError, RawUser, UserPage, UserRecord, UserUpdate};
use crate::auth::{sign_custom_token, AccessTokenSource, ServiceAccountKey};

pub const DEFAULT_ADMIN_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";

const USER_NOT_FOUND: &str = "USER_NOT_FOUND";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchGetResponse {
    #[serde(default)]
    users: Vec<RawUser>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<RawUser>,
}

/// Identity Toolkit admin API, authenticated as the service account.
pub struct FirebaseProvider {
    key: ServiceAccountKey,
    base_url: String,
    page_size: u32,
    client: Client,
    tokens: AccessTokenSource,
}

impl FirebaseProvider {
    pub fn new(key: ServiceAccountKey, base_url: impl Into<String>, page_size: u32) -> Self {
        let client = Client::new();
        Self {
            tokens: AccessTokenSource::new(key.clone(), client.clone()),
            key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            page_size,
            client,
        }
    }

    pub fn project_id(&self) -> &str {
        &self.key.project_id
    }

    fn accounts_url(&self, operation: &str) -> String {
        format!(
            "{}/projects/{}/accounts:{}",
            self.base_url, self.key.project_id, operation
        )
    }

    fn send(&self, request: RequestBuilder) -> Result<Response, ProviderError> {
        let access_token = self.tokens.token()?;
        let response = request
            .bearer_auth(access_token)
            .send()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().unwrap_or_default();
        Err(ProviderError::Rejected {
            status: status.as_u16(),
            message: error_message(&body).unwrap_or_else(|| format!("HTTP {}", status.as_u16())),
        })
    }
}

fn not_found_or(err: ProviderError, uid: &str) -> ProviderError {
    match err {
        ProviderError::Rejected { ref message, .. } if message.starts_with(USER_NOT_FOUND) => {
            ProviderError::NotFound(uid.to_string())
        }
        other => other,
    }
}

fn unreadable(e: reqwest::Error) -> ProviderError {
    ProviderError::Rejected {
        status: 200,
        message: format!("unreadable response: {}", e),
    }
}

impl IdentityProvider for FirebaseProvider {
    fn name(&self) -> &str {
        "firebase"
    }

    fn list_users_page(&self, page_token: Option<&str>) -> Result<UserPage, ProviderError> {
        let mut url = Url::parse(&self.accounts_url("batchGet"))
            .map_err(|e| ProviderError::Transport(format!("invalid admin endpoint: {}", e)))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("maxResults", &self.page_size.to_string());
            if let Some(token) = page_token {
                query.append_pair("nextPageToken", token);
            }
        }

        let page: BatchGetResponse = self.send(self.client.get(url))?.json().map_err(unreadable)?;
        debug!(count = page.users.len(), more = page.next_page_token.is_some(), "listed users");

        Ok(UserPage {
            users: page.users.into_iter().map(UserRecord::from).collect(),
            next_page_token: page.next_page_token.filter(|t| !t.is_empty()),
        })
    }

    fn get_user(&self, uid: &str) -> Result<UserRecord, ProviderError> {
        let request = self
            .client
            .post(self.accounts_url("lookup"))
            .json(&json!({ "localId": [uid] }));

        let lookup: LookupResponse = self
            .send(request)
            .map_err(|e| not_found_or(e, uid))?
            .json()
            .map_err(unreadable)?;

        lookup
            .users
            .into_iter()
            .next()
            .map(UserRecord::from)
            .ok_or_else(|| ProviderError::NotFound(uid.to_string()))
    }

    fn update_user(&self, uid: &str, update: &UserUpdate) -> Result<(), ProviderError> {
        let body = match update {
            UserUpdate::Password(password) => json!({ "localId": uid, "password": password }),
            UserUpdate::DisplayName(name) => json!({ "localId": uid, "displayName": name }),
        };

        debug!(uid, field = update.field(), "updating user");
        self.send(self.client.post(self.accounts_url("update")).json(&body))
            .map_err(|e| not_found_or(e, uid))?;
        Ok(())
    }

    fn create_custom_token(
        &self,
        uid: &str,
        claims: Option<&Map<String, Value>>,
    ) -> Result<String, ProviderError> {
        sign_custom_token(&self.key, uid, claims)
    }
}
