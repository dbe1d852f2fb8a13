//! Configuration file utilities
//!
//! Provides helper functions for reading and writing app configuration files.
//! All config files are stored in the platform-specific config directory
//! under "image-feed-uploader/".

use crate::errors::{ClientError, ClientResult};
use crate::feed_sync::SyncConfig;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR_NAME: &str = "image-feed-uploader";
pub const CONFIG_FILE_NAME: &str = "config.json";
const API_HOST_ENV: &str = "IMAGE_FEED_API_HOST";
const DEFAULT_API_HOST: &str = "http://localhost:5000";

/// Logging options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter when RUST_LOG is unset
    pub level: String,
    /// Also write a daily-rolling log file
    pub file: bool,
    /// Emit the log file as JSON lines
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: false,
            json: false,
        }
    }
}

/// Client configuration as stored in config.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub poll_interval_ms: u64,
    pub request_timeout_secs: u64,
    pub log: LogConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_HOST.to_string(),
            poll_interval_ms: SyncConfig::default().poll_interval_ms,
            request_timeout_secs: 60,
            log: LogConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Load config.json (or defaults) and apply environment overrides.
    ///
    /// Priority for the base URL: runtime env var > compile-time env var >
    /// config file > default.
    pub fn load() -> ClientResult<Self> {
        let config = load_config_file::<ClientConfig>(CONFIG_FILE_NAME)?.unwrap_or_default();
        Ok(config.with_env_overrides())
    }

    pub fn with_env_overrides(mut self) -> Self {
        if let Some(host) = env::var(API_HOST_ENV)
            .ok()
            .or_else(|| option_env!("IMAGE_FEED_API_HOST").map(String::from))
            .filter(|host| !host.trim().is_empty())
        {
            self.api_base_url = host;
        }
        self
    }

    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            poll_interval_ms: self.poll_interval_ms,
        }
    }

    pub fn validate(&self) -> ClientResult<()> {
        reqwest::Url::parse(&self.api_base_url)
            .map_err(|e| ClientError::Config(format!("invalid api_base_url '{}': {}", self.api_base_url, e)))?;
        if self.poll_interval_ms == 0 {
            return Err(ClientError::Config("poll_interval_ms must be positive".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ClientError::Config("request_timeout_secs must be positive".to_string()));
        }
        Ok(())
    }
}

/// Get the app's config directory path.
///
/// Returns: `~/.config/image-feed-uploader` (Linux)
///          `~/Library/Application Support/image-feed-uploader` (macOS)
///          `C:\Users\<User>\AppData\Roaming\image-feed-uploader` (Windows)
pub fn get_config_dir() -> ClientResult<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| ClientError::Config("Could not find config directory".to_string()))?;
    Ok(config_dir.join(APP_DIR_NAME))
}

/// Get the directory where log files are written.
///
/// Returns: `~/.image-feed-uploader/logs`
pub fn get_logs_dir() -> ClientResult<PathBuf> {
    let home_dir = dirs::home_dir()
        .ok_or_else(|| ClientError::Config("Could not find home directory".to_string()))?;
    Ok(home_dir.join(format!(".{}", APP_DIR_NAME)).join("logs"))
}

/// Get the full path to a config file.
pub fn config_file_path(filename: &str) -> ClientResult<PathBuf> {
    Ok(get_config_dir()?.join(filename))
}

/// Save data to a config file as JSON.
///
/// # Returns
/// The path where the file was saved
pub fn save_config_file<T: Serialize>(filename: &str, data: &T) -> ClientResult<PathBuf> {
    let config_file = config_file_path(filename)?;
    write_json_file(&config_file, data)?;
    Ok(config_file)
}

/// Load data from a config file.
///
/// # Returns
/// * `Ok(Some(data))` if file exists and was parsed successfully
/// * `Ok(None)` if file doesn't exist
/// * `Err(...)` if file exists but couldn't be read/parsed
pub fn load_config_file<T: DeserializeOwned>(filename: &str) -> ClientResult<Option<T>> {
    read_json_file(&config_file_path(filename)?)
}

/// Write pretty JSON, creating parent directories as needed
pub fn write_json_file<T: Serialize>(path: &Path, data: &T) -> ClientResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(data)?;
    fs::write(path, json)?;
    Ok(())
}

/// Read JSON from `path`; a missing file is `Ok(None)`
pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> ClientResult<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(path)?;
    let data = serde_json::from_str(&contents)
        .map_err(|e| ClientError::Config(format!("Failed to parse {}: {}", path.display(), e)))?;

    Ok(Some(data))
}
