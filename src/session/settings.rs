//! Session creation settings and search configuration.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Settings key under which the host's display name is advertised.
pub const SERVER_NAME_SETTINGS_KEY: &str = "ServerName";

/// Default number of public slots on a hosted session.
pub const DEFAULT_PUBLIC_CONNECTIONS: u32 = 5;

/// Default cap on results returned by one search.
pub const DEFAULT_MAX_SEARCH_RESULTS: u32 = 100;

/// Settings advertised with a created session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSettings {
    pub is_lan_match: bool,
    pub num_public_connections: u32,
    pub should_advertise: bool,
    pub allow_invites: bool,
    pub uses_presence: bool,
    pub use_lobbies_if_available: bool,
    /// Custom advertised key/value pairs.
    #[serde(default)]
    pub custom: BTreeMap<String, String>,
}

impl SessionSettings {
    /// Settings for a publicly advertised, presence-based host session.
    pub fn hosted(is_lan_match: bool, num_public_connections: u32) -> Self {
        Self {
            is_lan_match,
            num_public_connections,
            should_advertise: true,
            allow_invites: true,
            uses_presence: true,
            use_lobbies_if_available: true,
            custom: BTreeMap::new(),
        }
    }

    /// Set a custom advertised value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.custom.insert(key.into(), value.into());
    }

    /// Builder form of [`SessionSettings::set`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Get a custom advertised value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.custom.get(key).map(|s| s.as_str())
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::hosted(false, DEFAULT_PUBLIC_CONNECTIONS)
    }
}

/// Whether sessions are hosted and searched on the LAN or online.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkMode {
    /// LAN when the backend is the null subsystem, online otherwise.
    #[default]
    Auto,
    Lan,
    Online,
}

impl NetworkMode {
    /// Resolve against the backend's subsystem name.
    pub fn is_lan(&self, subsystem_name: &str) -> bool {
        match self {
            NetworkMode::Auto => subsystem_name == crate::backend::NULL_SUBSYSTEM,
            NetworkMode::Lan => true,
            NetworkMode::Online => false,
        }
    }
}

impl FromStr for NetworkMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(NetworkMode::Auto),
            "lan" => Ok(NetworkMode::Lan),
            "online" => Ok(NetworkMode::Online),
            _ => Err(s.to_string()),
        }
    }
}

/// How sessions are discovered.
///
/// LAN queries and presence filtering are mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Broadcast query on the local network.
    Lan,
    /// Online query restricted to presence sessions.
    Presence,
}

/// Parameters of a FindSessions request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    pub max_results: u32,
    pub mode: SearchMode,
}

impl SearchConfig {
    pub fn new(max_results: u32, mode: SearchMode) -> Self {
        Self { max_results, mode }
    }

    /// Whether the query is restricted to the local network.
    pub fn is_lan_query(&self) -> bool {
        self.mode == SearchMode::Lan
    }

    /// Whether the query filters on presence sessions.
    pub fn presence_filter(&self) -> bool {
        self.mode == SearchMode::Presence
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SEARCH_RESULTS, SearchMode::Presence)
    }
}

/// What the player asked for when hosting.
///
/// Retained after use so a destroy completion can recreate the session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionIntent {
    /// Display name; empty means unnamed.
    pub desired_server_name: String,
}

impl SessionIntent {
    pub fn new(desired_server_name: impl Into<String>) -> Self {
        Self {
            desired_server_name: desired_server_name.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hosted_settings() {
        let settings = SessionSettings::hosted(true, 8);
        assert!(settings.is_lan_match);
        assert_eq!(settings.num_public_connections, 8);
        assert!(settings.should_advertise);
        assert!(settings.allow_invites);
        assert!(settings.uses_presence);
        assert!(settings.use_lobbies_if_available);
        assert!(settings.custom.is_empty());
    }

    #[test]
    fn test_custom_values() {
        let mut settings = SessionSettings::default();
        assert_eq!(settings.get(SERVER_NAME_SETTINGS_KEY), None);

        settings.set(SERVER_NAME_SETTINGS_KEY, "Alice's Game");
        assert_eq!(settings.get(SERVER_NAME_SETTINGS_KEY), Some("Alice's Game"));

        let settings = settings.with(SERVER_NAME_SETTINGS_KEY, "Renamed");
        assert_eq!(settings.get(SERVER_NAME_SETTINGS_KEY), Some("Renamed"));
    }

    #[test]
    fn test_search_modes_are_exclusive() {
        let lan = SearchConfig::new(10, SearchMode::Lan);
        assert!(lan.is_lan_query());
        assert!(!lan.presence_filter());

        let online = SearchConfig::default();
        assert!(!online.is_lan_query());
        assert!(online.presence_filter());
        assert_eq!(online.max_results, 100);
    }

    #[test]
    fn test_network_mode_resolution() {
        assert!(NetworkMode::Auto.is_lan("NULL"));
        assert!(!NetworkMode::Auto.is_lan("Steam"));
        assert!(NetworkMode::Lan.is_lan("Steam"));
        assert!(!NetworkMode::Online.is_lan("NULL"));
    }

    #[test]
    fn test_network_mode_parse() {
        assert_eq!("LAN".parse::<NetworkMode>(), Ok(NetworkMode::Lan));
        assert_eq!("online".parse::<NetworkMode>(), Ok(NetworkMode::Online));
        assert!("wan".parse::<NetworkMode>().is_err());
    }

    #[test]
    fn test_search_mode_serde() {
        let mode: SearchMode = serde_json::from_str("\"lan\"").unwrap();
        assert_eq!(mode, SearchMode::Lan);
    }
}
