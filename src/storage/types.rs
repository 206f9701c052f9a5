use serde::{Deserialize, Serialize};

use crate::console::DEFAULT_CANCEL_KEYWORD;
use crate::provider::firebase::DEFAULT_ADMIN_BASE_URL;
use crate::token::rest::DEFAULT_BASE_URL as DEFAULT_IDENTITY_TOOLKIT_URL;

pub const MAX_PAGE_SIZE: u32 = 1000;

/// Top-level config file. Stored as config.toml.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Web API key for the REST sign-in endpoints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_cancel_keyword")]
    pub cancel_keyword: String,
    #[serde(default)]
    pub endpoints: Endpoints,
}

/// Base URLs, overridable for emulators and tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    #[serde(default = "default_admin")]
    pub admin: String,
    #[serde(default = "default_identity_toolkit")]
    pub identity_toolkit: String,
}

fn default_page_size() -> u32 {
    MAX_PAGE_SIZE
}

fn default_cancel_keyword() -> String {
    DEFAULT_CANCEL_KEYWORD.to_string()
}

fn default_admin() -> String {
    DEFAULT_ADMIN_BASE_URL.to_string()
}

fn default_identity_toolkit() -> String {
    DEFAULT_IDENTITY_TOOLKIT_URL.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            page_size: default_page_size(),
            cancel_keyword: default_cancel_keyword(),
            endpoints: Endpoints::default(),
        }
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            admin: default_admin(),
            identity_toolkit: default_identity_toolkit(),
        }
    }
}

impl Config {
    /// The listing page size, clamped to what the provider accepts.
    pub fn effective_page_size(&self) -> u32 {
        self.page_size.clamp(1, MAX_PAGE_SIZE)
    }

    /// A blank keyword would cancel on every empty answer.
    pub fn effective_cancel_keyword(&self) -> &str {
        let keyword = self.cancel_keyword.trim();
        if keyword.is_empty() {
            DEFAULT_CANCEL_KEYWORD
        } else {
            keyword
        }
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }
}
