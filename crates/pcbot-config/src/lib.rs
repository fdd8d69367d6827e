use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable consulted when the config file carries no bot token.
pub const BOT_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON5 parse error: {0}")]
    Json5(#[from] json5::Error),
    #[error("Config directory not found")]
    NoDirFound,
    #[error("Telegram bot token not configured (set telegram.bot_token or {BOT_TOKEN_ENV})")]
    MissingBotToken,
}

/// Telegram bot settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot token; falls back to `TELEGRAM_BOT_TOKEN` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_token: Option<String>,
    /// Chat that receives the startup notification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_chat_id: Option<i64>,
    /// User IDs allowed to issue commands. Empty means everyone.
    #[serde(default)]
    pub allowed_users: Vec<i64>,
    /// Long-poll timeout passed to `getUpdates`.
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,
}

fn default_poll_timeout() -> u64 {
    30
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            admin_chat_id: None,
            allowed_users: Vec::new(),
            poll_timeout_secs: default_poll_timeout(),
        }
    }
}

/// How privileged actions are carried out.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionsConfig {
    /// Log actions instead of running the OS shutdown utility.
    #[serde(default)]
    pub dry_run: bool,
}

/// Top-level pcbot configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PcBotConfig {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub actions: ActionsConfig,
}

impl PcBotConfig {
    /// Resolve the bot token from config, then the environment.
    pub fn bot_token(&self) -> Result<String, ConfigError> {
        if let Some(token) = self.telegram.bot_token.as_deref().filter(|t| !t.is_empty()) {
            return Ok(token.to_string());
        }
        std::env::var(BOT_TOKEN_ENV)
            .ok()
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::MissingBotToken)
    }
}

/// Resolve the pcbot config directory (~/.pcbot/).
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    dirs::home_dir()
        .map(|h| h.join(".pcbot"))
        .ok_or(ConfigError::NoDirFound)
}

/// Resolve the config file path (~/.pcbot/config.json5).
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.json5"))
}

/// Load configuration from the default path, falling back to defaults.
pub fn load_config() -> Result<PcBotConfig, ConfigError> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let path = config_file_path()?;
    load_config_from(&path)
}

/// Load configuration from a specific path, falling back to defaults if not found.
pub fn load_config_from(path: &Path) -> Result<PcBotConfig, ConfigError> {
    if !path.exists() {
        tracing::debug!("Config file not found at {}, using defaults", path.display());
        return Ok(PcBotConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: PcBotConfig = json5::from_str(&content)?;
    Ok(config)
}
