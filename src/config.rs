//! Configuration loading for boardlink.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

const DEFAULT_BOARD_API_URL: &str = "https://api.trello.com/1";

/// Get the boardlink home directory (~/.boardlink).
pub fn get_home_dir() -> Result<PathBuf> {
    let home = directories::UserDirs::new()
        .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))?;

    Ok(home.home_dir().join(".boardlink"))
}

/// Get the default settings file path.
pub fn get_settings_path() -> Result<PathBuf> {
    Ok(get_home_dir()?.join("settings.json"))
}

/// Load settings from an explicit path, or ~/.boardlink/settings.json.
pub fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => get_settings_path()?,
    };

    if !path.exists() {
        return Err(Error::Config(format!(
            "Settings file not found at {}. Run 'boardlink setup' first.",
            path.display()
        )));
    }

    let content = std::fs::read_to_string(&path)?;
    let settings: Settings = serde_json::from_str(&content)?;

    validate_settings(&settings)?;

    tracing::debug!("Loaded settings from {}", path.display());
    Ok(settings)
}

/// Write default settings to `path` unless a file is already there.
///
/// Returns `true` when a new file was written.
pub fn write_default_settings(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(&Settings::default())?;
    std::fs::write(path, content)?;
    tracing::info!("Wrote default settings to {}", path.display());
    Ok(true)
}

fn validate_settings(settings: &Settings) -> Result<()> {
    let prefix = &settings.commands.prefix;
    if prefix.is_empty() {
        return Err(Error::Config("commands.prefix must not be empty".to_string()));
    }
    if prefix.chars().any(char::is_whitespace) {
        return Err(Error::Config(format!(
            "commands.prefix '{}' must not contain whitespace",
            prefix
        )));
    }
    if settings.board_api.timeout_secs == 0 {
        return Err(Error::Config(
            "board_api.timeout_secs must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

/// Board API credentials and endpoints.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct BoardApiConfig {
    pub api_key: Option<String>,
    pub api_token: Option<String>,
    pub callback_url: Option<String>,
    #[serde(default = "default_board_api_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_board_api_url() -> String {
    DEFAULT_BOARD_API_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    15
}

impl Default for BoardApiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_token: None,
            callback_url: None,
            base_url: default_board_api_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl BoardApiConfig {
    /// Key, token and callback URL, or a config error naming the first missing one.
    pub fn require_credentials(&self) -> Result<(String, String, String)> {
        let key = required(&self.api_key, "board_api.api_key")?;
        let token = required(&self.api_token, "board_api.api_token")?;
        let callback = required(&self.callback_url, "board_api.callback_url")?;
        Ok((key, token, callback))
    }
}

fn required(value: &Option<String>, name: &str) -> Result<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| Error::Config(format!("{} is not configured", name)))
}

/// Telegram transport configuration.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct TelegramConfig {
    pub bot_token: Option<String>,
}

/// Command parsing configuration.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CommandsConfig {
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

fn default_prefix() -> String {
    "!".to_string()
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
        }
    }
}

/// Permission configuration.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct PermissionsConfig {
    /// User ids that get owner level in every channel.
    #[serde(default)]
    pub owners: Vec<String>,
}

/// Storage configuration.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct StorageConfig {
    pub database_path: Option<PathBuf>,
}

impl StorageConfig {
    pub fn resolve_database_path(&self) -> Result<PathBuf> {
        match &self.database_path {
            Some(p) => Ok(p.clone()),
            None => Ok(get_home_dir()?.join("bindings.db")),
        }
    }
}

/// boardlink settings.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Settings {
    #[serde(default)]
    pub telegram: TelegramConfig,

    #[serde(default)]
    pub board_api: BoardApiConfig,

    #[serde(default)]
    pub commands: CommandsConfig,

    #[serde(default)]
    pub permissions: PermissionsConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gets_defaults() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.commands.prefix, "!");
        assert_eq!(settings.board_api.base_url, DEFAULT_BOARD_API_URL);
        assert_eq!(settings.board_api.timeout_secs, 15);
        assert!(settings.permissions.owners.is_empty());
        assert!(validate_settings(&settings).is_ok());
    }

    #[test]
    fn rejects_whitespace_prefix() {
        let mut settings = Settings::default();
        settings.commands.prefix = "! ".to_string();
        assert!(matches!(validate_settings(&settings), Err(Error::Config(_))));

        settings.commands.prefix = String::new();
        assert!(matches!(validate_settings(&settings), Err(Error::Config(_))));
    }

    #[test]
    fn missing_credentials_are_named() {
        let mut api = BoardApiConfig::default();
        api.api_key = Some("key".to_string());
        api.api_token = Some("  ".to_string());
        let err = api.require_credentials().unwrap_err();
        assert!(err.to_string().contains("board_api.api_token"));
    }

    #[test]
    fn load_roundtrips_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        assert!(write_default_settings(&path).unwrap());
        assert!(!write_default_settings(&path).unwrap());

        let settings = load_settings(Some(&path)).unwrap();
        assert_eq!(settings.commands.prefix, "!");
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_settings(Some(&dir.path().join("nope.json"))).unwrap_err();
        assert!(err.to_string().contains("boardlink setup"));
    }
}
