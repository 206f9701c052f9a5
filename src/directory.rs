use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::ConsoleError;
use crate::provider::{IdentityProvider, ProviderError, UserRecord, UserUpdate};

/// The console's view of the identity provider: full listings, point lookups
/// and single-field updates, with provider failures mapped onto the session's
/// error taxonomy.
pub struct DirectoryClient<P> {
    provider: P,
}

impl<P: IdentityProvider> DirectoryClient<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Drains the paginated listing. Any failing page discards everything
    /// fetched so far.
    pub fn fetch_all_users(&self) -> Result<Vec<UserRecord>, ConsoleError> {
        let mut users = Vec::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self
                .provider
                .list_users_page(page_token.as_deref())
                .map_err(|err| {
                    warn!(provider = self.provider.name(), page = pages + 1, error = %err, "user listing failed");
                    ConsoleError::DirectoryUnavailable(err.to_string())
                })?;
            pages += 1;
            debug!(page = pages, count = page.users.len(), "fetched user page");
            users.extend(page.users);

            match page.next_page_token {
                Some(next) if page_token.as_deref() == Some(next.as_str()) => {
                    warn!(page = pages, "pagination cursor did not advance");
                    return Err(ConsoleError::DirectoryUnavailable(
                        "pagination cursor did not advance".to_string(),
                    ));
                }
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        info!(pages, users = users.len(), "directory loaded");
        Ok(users)
    }

    pub fn find_by_uid(&self, uid: &str) -> Result<UserRecord, ConsoleError> {
        self.provider.get_user(uid).map_err(|err| match err {
            ProviderError::NotFound(_) => ConsoleError::UserNotFound(uid.to_string()),
            other => {
                warn!(uid, error = %other, "user lookup failed");
                ConsoleError::DirectoryUnavailable(other.to_string())
            }
        })
    }

    pub fn set_password(&self, uid: &str, new_password: &str) -> Result<(), ConsoleError> {
        self.update(uid, UserUpdate::Password(new_password.to_string()))
    }

    pub fn set_display_name(&self, uid: &str, new_name: &str) -> Result<(), ConsoleError> {
        self.update(uid, UserUpdate::DisplayName(new_name.to_string()))
    }

    /// Signs a custom token through the provider. Callers verify the uid first.
    pub fn create_custom_token(
        &self,
        uid: &str,
        claims: Option<&Map<String, Value>>,
    ) -> Result<String, ConsoleError> {
        self.provider.create_custom_token(uid, claims).map_err(|err| {
            warn!(uid, error = %err, "custom token signing failed");
            ConsoleError::TokenIssuanceFailed(err.to_string())
        })
    }

    fn update(&self, uid: &str, update: UserUpdate) -> Result<(), ConsoleError> {
        let field = update.field();
        match self.provider.update_user(uid, &update) {
            Ok(()) => {
                info!(uid, field, "user updated");
                Ok(())
            }
            Err(err) => {
                warn!(uid, field, error = %err, "user update failed");
                Err(match err {
                    ProviderError::Transport(msg) => ConsoleError::NetworkError(msg),
                    ProviderError::Credential(msg) => ConsoleError::DirectoryUnavailable(msg),
                    ProviderError::Rejected { message, .. } => ConsoleError::MutationFailed(message),
                    other => ConsoleError::MutationFailed(other.to_string()),
                })
            }
        }
    }
}
