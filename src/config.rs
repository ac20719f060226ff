//! Configuration management for game-session.
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file (JSON)
//! 4. Default values

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cli::Args;
use crate::session::{
    CoordinatorConfig, NetworkMode, SessionName, DEFAULT_LOBBY_MAP, DEFAULT_MAIN_MENU_MAP,
    DEFAULT_MAX_SEARCH_RESULTS, DEFAULT_PUBLIC_CONNECTIONS, SERVER_NAME_SETTINGS_KEY,
};

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Named session settings.
    pub session: SessionSection,
    /// LAN/online selection.
    pub network: NetworkSection,
    /// Server search settings.
    pub search: SearchSection,
    /// Travel targets.
    pub travel: TravelSection,
    /// Request deadlines.
    pub timeouts: TimeoutSection,
    /// Logging configuration.
    pub logging: LoggingSection,
}

/// Named session configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    /// Name of the single session this client manages.
    pub name: String,
    /// Settings key carrying the server display name.
    pub server_name_key: String,
    /// Public slots on a hosted session.
    pub num_public_connections: u32,
    /// Local player index used for backend requests.
    pub user_index: u32,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            name: SessionName::DEFAULT.to_string(),
            server_name_key: SERVER_NAME_SETTINGS_KEY.to_string(),
            num_public_connections: DEFAULT_PUBLIC_CONNECTIONS,
            user_index: 0,
        }
    }
}

/// Network configuration section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSection {
    /// auto, lan or online.
    pub mode: NetworkMode,
}

/// Search configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSection {
    /// Maximum results per search.
    pub max_results: u32,
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            max_results: DEFAULT_MAX_SEARCH_RESULTS,
        }
    }
}

/// Travel configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TravelSection {
    /// Map the host opens as a listen server.
    pub lobby_map: String,
    /// Map for returns to the main menu.
    pub main_menu_map: String,
}

impl Default for TravelSection {
    fn default() -> Self {
        Self {
            lobby_map: DEFAULT_LOBBY_MAP.to_string(),
            main_menu_map: DEFAULT_MAIN_MENU_MAP.to_string(),
        }
    }
}

/// Timeout configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutSection {
    /// Seconds an operation may stay outstanding; 0 disables.
    pub operation_secs: u64,
}

impl Default for TimeoutSection {
    fn default() -> Self {
        Self { operation_secs: 30 }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level (error, warn, info, debug, trace).
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_json::from_str(&content).map_err(ConfigError::Json)
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(name) = std::env::var("GAME_SESSION_NAME") {
            if !name.is_empty() {
                self.session.name = name;
            }
        }

        if let Ok(mode) = std::env::var("GAME_SESSION_NETWORK_MODE") {
            self.network.mode = mode
                .parse()
                .map_err(|_| ConfigError::InvalidValue("GAME_SESSION_NETWORK_MODE", mode))?;
        }

        if let Ok(max) = std::env::var("GAME_SESSION_MAX_RESULTS") {
            if let Ok(max) = max.parse() {
                self.search.max_results = max;
            }
        }

        if let Ok(level) = std::env::var("GAME_SESSION_LOG_LEVEL") {
            self.logging.level = level;
        } else if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.level = level;
        }

        Ok(())
    }

    /// Apply CLI argument overrides.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(mode) = args.network_mode {
            self.network.mode = mode;
        }

        if let Some(ref level) = args.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Load configuration with full priority chain.
    ///
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(ref path) = args.config {
            config = Config::from_file(path)?;
        }

        config.apply_env()?;
        config.apply_args(args);
        config.validate()?;

        Ok(config)
    }

    /// Reject values the coordinator cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session.name.trim().is_empty() {
            return Err(ConfigError::InvalidValue("session.name", self.session.name.clone()));
        }
        if self.session.server_name_key.is_empty() {
            return Err(ConfigError::InvalidValue(
                "session.server_name_key",
                String::new(),
            ));
        }
        if self.search.max_results == 0 {
            return Err(ConfigError::InvalidValue("search.max_results", "0".into()));
        }
        Ok(())
    }

    /// Convert to the settings a coordinator is built from.
    pub fn coordinator_config(&self) -> CoordinatorConfig {
        let operation_timeout = match self.timeouts.operation_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        CoordinatorConfig {
            session_name: SessionName::new(self.session.name.clone()),
            server_name_key: self.session.server_name_key.clone(),
            user_index: self.session.user_index,
            num_public_connections: self.session.num_public_connections,
            network_mode: self.network.mode,
            max_search_results: self.search.max_results,
            lobby_map: self.travel.lobby_map.clone(),
            main_menu_map: self.travel.main_menu_map.clone(),
            operation_timeout,
        }
    }

    /// Get the log level filter string.
    pub fn log_filter(&self) -> &str {
        &self.logging.level
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    Io(std::io::Error),
    /// JSON parsing error.
    Json(serde_json::Error),
    /// A setting has an unusable value.
    InvalidValue(&'static str, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read config file: {}", e),
            Self::Json(e) => write!(f, "failed to parse config file: {}", e),
            Self::InvalidValue(name, value) => write!(f, "invalid value for {}: '{}'", name, value),
        }
    }
}

impl std::error::Error for ConfigError {}
