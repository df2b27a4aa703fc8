use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, anyhow};

pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";
pub const SERVER_ENV_VAR: &str = "DOCCHAT_SERVER";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub server_url: Option<String>,
    pub log_filter: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(config_path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(config_path, config_content)?;
        Ok(())
    }

    /// Server URL: explicit override, then env var, then config file, then default
    pub fn resolve_server_url(&self, cli_override: Option<&str>) -> String {
        let env_value = std::env::var(SERVER_ENV_VAR).ok();
        Self::pick_server_url(cli_override, env_value.as_deref(), self.server_url.as_deref())
    }

    fn pick_server_url(cli: Option<&str>, env: Option<&str>, file: Option<&str>) -> String {
        [cli, env, file]
            .into_iter()
            .flatten()
            .find(|url| !url.trim().is_empty())
            .unwrap_or(DEFAULT_SERVER_URL)
            .to_string()
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("docchat").join("config.json"))
    }
}
