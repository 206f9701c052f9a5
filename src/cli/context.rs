use std::path::Path;

use anyhow::Result;
use tracing::info;

use crate::auth::ServiceAccountKey;
use crate::directory::DirectoryClient;
use crate::provider::FirebaseProvider;
use crate::storage::{Config, ConfigStore};
use crate::token::{IdentityToolkit, TokenIssuer};

/// Everything a command needs once the admin credential has been accepted.
pub struct AppContext {
    pub config: Config,
    pub directory: DirectoryClient<FirebaseProvider>,
    pub issuer: TokenIssuer,
    pub api_key: Option<String>,
}

impl AppContext {
    /// Fails before any session state exists if the credential file is
    /// unreadable or incomplete.
    pub fn build(store: &ConfigStore, credentials: &Path, api_key: Option<&str>) -> Result<Self> {
        let config = store.load_config()?;
        let key = ServiceAccountKey::load(credentials)?;
        info!(project = %key.project_id, account = %key.client_email, "admin credential loaded");

        let provider = FirebaseProvider::new(
            key,
            &config.endpoints.admin,
            config.effective_page_size(),
        );
        let issuer = TokenIssuer::new(IdentityToolkit::new(&config.endpoints.identity_toolkit));
        let api_key = resolve_api_key(api_key, &config);

        Ok(Self {
            directory: DirectoryClient::new(provider),
            issuer,
            api_key,
            config,
        })
    }
}

/// Command line (or environment) first, then the config file. `None` leaves
/// it to the interactive prompt.
pub fn resolve_api_key(flag: Option<&str>, config: &Config) -> Option<String> {
    flag.map(str::trim)
        .filter(|k| !k.is_empty())
        .or_else(|| config.api_key())
        .map(str::to_string)
}
