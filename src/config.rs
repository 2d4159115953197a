use crate::client::Credentials;
use crate::pool::DEFAULT_CONNECTION_LIMIT;
use anyhow::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub username: String,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    #[serde(default = "default_connection_limit")]
    pub connection_limit: usize,
    #[serde(default)]
    pub configured: bool,
}

fn default_connection_limit() -> usize {
    DEFAULT_CONNECTION_LIMIT
}

impl Default for Config {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: None,
            connection_limit: DEFAULT_CONNECTION_LIMIT,
            configured: false,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(config_path) => Self::load_from(&config_path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(config_path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        if let Some(config_path) = Self::config_path() {
            self.save_to(&config_path)?;
        }
        Ok(())
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "remote-fs", "remote-fs")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }

    pub fn is_configured(&self) -> bool {
        self.configured && !self.username.is_empty()
    }

    /// Credentials for new clients; anonymous when no username is set.
    pub fn credentials(&self) -> Credentials {
        if self.username.is_empty() {
            return Credentials::anonymous();
        }
        Credentials::new(
            self.username.clone(),
            self.password.clone().unwrap_or_default(),
        )
    }
}
