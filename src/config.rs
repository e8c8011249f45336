use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use drinkwater_core::{CupSize, DEFAULT_POLL_INTERVAL};

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Path to the SQLite database
    pub database_path: ConfigValue<PathBuf>,
    /// Cup size used by `drink` when none is given
    pub default_cup: ConfigValue<CupSize>,
    /// Seconds between history refreshes in `history --watch`
    pub history_poll_secs: ConfigValue<u64>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    database_path: Option<PathBuf>,
    default_cup: Option<u32>,
    history_poll_secs: Option<u64>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let default_db_path = Self::default_data_dir().join("drinkwater.db");

        // Start with defaults
        let mut database_path = ConfigValue::new(default_db_path, ConfigSource::Default);
        let mut default_cup = ConfigValue::new(CupSize::default(), ConfigSource::Default);
        let mut history_poll_secs =
            ConfigValue::new(DEFAULT_POLL_INTERVAL.as_secs(), ConfigSource::Default);
        let mut config_file = None;

        // Try to load from config file
        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            config_file = Some(path.clone());

            if let Some(db_path) = file_config.database_path {
                // Resolve relative paths against config file's directory
                let resolved_path = if db_path.is_relative() {
                    path.parent().map(|p| p.join(&db_path)).unwrap_or(db_path)
                } else {
                    db_path
                };
                database_path = ConfigValue::new(resolved_path, ConfigSource::File);
            }
            if let Some(ml) = file_config.default_cup {
                default_cup = ConfigValue::new(parse_cup("default_cup", ml)?, ConfigSource::File);
            }
            if let Some(secs) = file_config.history_poll_secs {
                history_poll_secs =
                    ConfigValue::new(parse_poll("history_poll_secs", secs)?, ConfigSource::File);
            }
        }

        // Apply environment variable overrides
        if let Ok(db_path) = std::env::var("WATER_DATABASE_PATH") {
            database_path = ConfigValue::new(PathBuf::from(db_path), ConfigSource::Environment);
        }
        if let Ok(raw) = std::env::var("WATER_DEFAULT_CUP") {
            let ml = parse_env_number("WATER_DEFAULT_CUP", &raw)?;
            default_cup = ConfigValue::new(
                parse_cup("WATER_DEFAULT_CUP", ml)?,
                ConfigSource::Environment,
            );
        }
        if let Ok(raw) = std::env::var("WATER_HISTORY_POLL_SECS") {
            let secs = parse_env_number("WATER_HISTORY_POLL_SECS", &raw)?;
            history_poll_secs = ConfigValue::new(
                parse_poll("WATER_HISTORY_POLL_SECS", secs)?,
                ConfigSource::Environment,
            );
        }

        Ok(Self {
            database_path,
            default_cup,
            history_poll_secs,
            config_file,
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.history_poll_secs.value)
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/drinkwater/
    /// - macOS: ~/Library/Application Support/drinkwater/
    /// - Windows: %APPDATA%/drinkwater/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("drinkwater")
    }

    /// Default data directory (platform-specific):
    /// - Linux: ~/.local/share/drinkwater/
    /// - macOS: ~/Library/Application Support/drinkwater/
    /// - Windows: %APPDATA%/drinkwater/
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("drinkwater")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

fn parse_env_number<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue(name.to_string(), raw.to_string()))
}

fn parse_cup(name: &str, ml: u32) -> Result<CupSize, ConfigError> {
    CupSize::new(ml).ok_or_else(|| ConfigError::InvalidValue(name.to_string(), ml.to_string()))
}

fn parse_poll(name: &str, secs: u64) -> Result<u64, ConfigError> {
    if secs == 0 {
        return Err(ConfigError::InvalidValue(name.to_string(), secs.to_string()));
    }
    Ok(secs)
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    InvalidValue(String, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::InvalidValue(name, value) => {
                write!(f, "Invalid value for {}: '{}'", name, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
