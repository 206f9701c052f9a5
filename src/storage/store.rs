use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use super::types::*;

const APP_DIR: &str = "fbadmin";
const CONFIG_FILE: &str = "config.toml";

pub struct ConfigStore {
    config_path: PathBuf,
}

impl ConfigStore {
    /// The per-user config file under the platform config directory.
    pub fn new() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join(APP_DIR);
        Ok(Self::at(config_dir.join(CONFIG_FILE)))
    }

    pub fn at(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// A missing file means defaults.
    pub fn load_config(&self) -> Result<Config> {
        if !self.config_path.exists() {
            debug!(path = %self.config_path.display(), "no config file, using defaults");
            return Ok(Config::default());
        }
        let contents = fs::read_to_string(&self.config_path)
            .with_context(|| format!("Failed to read {}", self.config_path.display()))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Invalid config file {}", self.config_path.display()))?;
        Ok(config)
    }

    /// Writes the config with 0600 permissions; it may hold the API key.
    pub fn save_config(&self, config: &Config) -> Result<()> {
        if let Some(dir) = self.config_path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        let contents = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, contents)
            .with_context(|| format!("Failed to write {}", self.config_path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.config_path, fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }

    pub fn set_api_key(&self, api_key: &str) -> Result<()> {
        let mut config = self.load_config()?;
        config.api_key = Some(api_key.trim().to_string()).filter(|k| !k.is_empty());
        self.save_config(&config)
    }

    pub fn set_page_size(&self, page_size: u32) -> Result<()> {
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            anyhow::bail!("page size must be between 1 and {}", MAX_PAGE_SIZE);
        }
        let mut config = self.load_config()?;
        config.page_size = page_size;
        self.save_config(&config)
    }
}
