use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// API key for the generative-language service. AI endpoints are
    /// disabled when absent.
    pub gemini_api_key: Option<String>,

    #[serde(default = "default_model")]
    pub gemini_model: String,

    /// Bearer token required on admin routes. When unset the admin area is
    /// open (development mode).
    pub admin_token: Option<String>,
}

fn default_db_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("autoblog");
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.join("blog.db").to_string_lossy().to_string()
}

fn default_bind_addr() -> String {
    "127.0.0.1:5800".to_string()
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            bind_addr: default_bind_addr(),
            gemini_api_key: None,
            gemini_model: default_model(),
            admin_token: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        let mut config: Config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            let config = Config::default();
            config.save()?;
            config
        };

        // Secrets may come from the environment; read once at startup.
        if let Ok(key) = std::env::var("GEMINI_API_KEY") {
            if !key.is_empty() {
                config.gemini_api_key = Some(key);
            }
        }
        if let Ok(token) = std::env::var("AUTOBLOG_ADMIN_TOKEN") {
            if !token.is_empty() {
                config.admin_token = Some(token);
            }
        }
        if let Ok(addr) = std::env::var("AUTOBLOG_BIND_ADDR") {
            if !addr.is_empty() {
                config.bind_addr = addr;
            }
        }

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("autoblog")
            .join("config.toml")
    }
}
