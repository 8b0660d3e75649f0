//! Configuration module for the device notes tool
//!
//! Supports loading configuration from a TOML file.
//! Configuration is stored in a standard location:
//! - Windows: %APPDATA%\device_notes_tool\config.toml
//! - Linux: ~/.config/device_notes_tool/config.toml
//! - macOS: ~/Library/Application Support/device_notes_tool/config.toml

use crate::core::directory::DirectoryOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Application name used for config directory
const APP_NAME: &str = "device_notes_tool";

/// Default config file name
const CONFIG_FILE_NAME: &str = "config.toml";

/// Environment variable consulted when the config file has no API token
pub const TOKEN_ENV_VAR: &str = "DEVICE_NOTES_API_TOKEN";

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: f64 = 10.0;

/// Longest accepted request timeout in seconds (one day)
pub const MAX_TIMEOUT_SECS: f64 = 86_400.0;

/// Get the standard configuration directory for the application.
pub fn get_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_NAME))
}

/// Get the standard configuration file path.
pub fn get_config_path() -> Option<PathBuf> {
    get_config_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
}

/// Ensure the configuration directory exists.
pub fn ensure_config_dir() -> Result<PathBuf, ConfigError> {
    let config_dir = get_config_dir().ok_or(ConfigError::ConfigDirNotFound)?;

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)
            .map_err(|e| ConfigError::WriteError(config_dir.clone(), e.to_string()))?;
    }

    Ok(config_dir)
}

/// Write the default config template to `path`, replacing any existing file.
pub fn write_default_config<P: AsRef<Path>>(path: P) -> Result<PathBuf, ConfigError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)
                .map_err(|e| ConfigError::WriteError(parent.to_path_buf(), e.to_string()))?;
        }
    }
    fs::write(path, Config::generate_default_config())
        .map_err(|e| ConfigError::WriteError(path.to_path_buf(), e.to_string()))?;
    Ok(path.to_path_buf())
}

/// Initialize the configuration file in the standard location if it doesn't exist.
pub fn init_config() -> Result<PathBuf, ConfigError> {
    let config_path = ensure_config_dir()?.join(CONFIG_FILE_NAME);

    if !config_path.exists() {
        write_default_config(&config_path)?;
    }

    Ok(config_path)
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// API connection settings
    pub api: ApiConfig,

    /// Device directory settings
    pub directory: DirectoryConfig,

    /// CSV input settings
    pub input: InputConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

/// API connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the API (e.g., "https://example.jamfcloud.com/api/")
    pub base_url: String,

    /// Account / network identifier used as the basic-auth user name
    pub account_id: String,

    /// API token used as the basic-auth password
    pub api_token: String,

    /// Per-request timeout in seconds
    pub timeout_secs: f64,
}

/// Device directory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// Also map locations and the devices in each location
    pub map_locations: bool,

    /// Write the JSON snapshot files
    pub write_snapshots: bool,

    /// Directory the snapshot files are written to
    pub snapshot_dir: PathBuf,
}

/// CSV input configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// CSV file with serial numbers and notes
    pub csv_file: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,

    /// Also append log lines to a file
    pub log_to_file: bool,

    /// Log file path
    pub log_file: PathBuf,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            account_id: String::new(),
            api_token: String::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            map_locations: true,
            write_snapshots: true,
            snapshot_dir: PathBuf::from("."),
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            csv_file: PathBuf::from("deviceList.csv"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_to_file: true,
            log_file: PathBuf::from("output.log"),
        }
    }
}

impl ApiConfig {
    /// Check that everything needed to talk to the API is present
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut missing = Vec::new();
        if self.base_url.trim().is_empty() {
            missing.push("api.base_url");
        }
        if self.account_id.trim().is_empty() {
            missing.push("api.account_id");
        }
        if self.api_token.is_empty() {
            missing.push("api.api_token");
        }
        if !missing.is_empty() {
            return Err(ConfigError::MissingSetting(missing.join(", ")));
        }

        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidSetting(
                "api.base_url".to_string(),
                format!("'{}' is not an http(s) URL", self.base_url),
            ));
        }

        if !(self.timeout_secs.is_finite() && self.timeout_secs > 0.0) {
            return Err(ConfigError::InvalidSetting(
                "api.timeout_secs".to_string(),
                format!("{} must be a positive number of seconds", self.timeout_secs),
            ));
        }
        if self.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(ConfigError::InvalidSetting(
                "api.timeout_secs".to_string(),
                format!(
                    "{} exceeds the maximum of {} seconds",
                    self.timeout_secs, MAX_TIMEOUT_SECS
                ),
            ));
        }

        Ok(())
    }

    /// Token with all but the last four characters masked
    pub fn masked_token(&self) -> String {
        let chars: Vec<char> = self.api_token.chars().collect();
        if chars.is_empty() {
            return "(not set)".to_string();
        }
        let visible = chars.len().min(4);
        let hidden = chars.len() - visible;
        let tail: String = chars[hidden..].iter().collect();
        format!("{}{}", "*".repeat(hidden), tail)
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(path.to_path_buf(), e.to_string()))?;

        Self::from_toml_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./config.toml (current directory)
    /// 2. ./device_notes.toml (current directory - alternative name)
    /// 3. Standard config location
    ///
    /// If no config file is found, returns default configuration.
    pub fn load_default() -> Result<Self, ConfigError> {
        for path in local_config_paths() {
            if path.exists() {
                return Self::load(&path);
            }
        }

        if let Some(config_path) = get_config_path() {
            if config_path.exists() {
                return Self::load(&config_path);
            }
        }

        Ok(Self::default())
    }

    /// Get the path where the config file is (or would be) located.
    pub fn get_active_config_path() -> PathBuf {
        for path in local_config_paths() {
            if path.exists() {
                return path;
            }
        }

        get_config_path().unwrap_or_else(|| PathBuf::from("./config.toml"))
    }

    /// Fill the API token from the environment when the file leaves it empty
    pub fn apply_env_token(&mut self, env_value: Option<String>) {
        if self.api.api_token.is_empty() {
            if let Some(token) = env_value.filter(|t| !t.is_empty()) {
                self.api.api_token = token;
            }
        }
    }

    /// Directory build options derived from the `[directory]` section
    pub fn directory_options(&self) -> DirectoryOptions {
        DirectoryOptions {
            map_locations: self.directory.map_locations,
            snapshot_dir: self
                .directory
                .write_snapshots
                .then(|| self.directory.snapshot_dir.clone()),
        }
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        fs::write(path.as_ref(), content)
            .map_err(|e| ConfigError::WriteError(path.as_ref().to_path_buf(), e.to_string()))?;

        Ok(())
    }

    /// Generate a default config file with comments
    pub fn generate_default_config() -> String {
        include_str!("../../config.example.toml").to_string()
    }
}

fn local_config_paths() -> [PathBuf; 2] {
    [
        PathBuf::from("./config.toml"),
        PathBuf::from("./device_notes.toml"),
    ]
}

/// Configuration error types
#[derive(Debug)]
pub enum ConfigError {
    /// Configuration file was not found at the specified path
    FileNotFound(PathBuf),
    /// Failed to read the configuration file
    ReadError(PathBuf, String),
    /// Failed to parse the configuration file (invalid TOML)
    ParseError(PathBuf, String),
    /// Failed to serialize configuration to TOML
    SerializeError(String),
    /// Failed to write configuration file
    WriteError(PathBuf, String),
    /// Could not determine config directory
    ConfigDirNotFound,
    /// One or more required settings are empty
    MissingSetting(String),
    /// A setting has an unusable value
    InvalidSetting(String, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => {
                write!(f, "Configuration file not found: {}", path.display())
            }
            ConfigError::ReadError(path, err) => {
                write!(
                    f,
                    "Failed to read config file '{}': {}",
                    path.display(),
                    err
                )
            }
            ConfigError::ParseError(path, err) => {
                write!(
                    f,
                    "Failed to parse config file '{}': {}",
                    path.display(),
                    err
                )
            }
            ConfigError::SerializeError(err) => {
                write!(f, "Failed to serialize configuration: {}", err)
            }
            ConfigError::WriteError(path, err) => {
                write!(
                    f,
                    "Failed to write config file '{}': {}",
                    path.display(),
                    err
                )
            }
            ConfigError::ConfigDirNotFound => {
                write!(f, "Could not determine configuration directory")
            }
            ConfigError::MissingSetting(names) => {
                write!(f, "Missing required setting(s): {}", names)
            }
            ConfigError::InvalidSetting(name, reason) => {
                write!(f, "Invalid value for {}: {}", name, reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
