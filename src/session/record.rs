//! Discovered sessions and their server list projection.

use serde::{Deserialize, Serialize};

use super::{SearchId, SessionSettings};

/// Display name used when a result does not advertise one.
pub const SERVER_NAME_NOT_FOUND: &str = "Could not find ServerName.";

/// One session as reported by the backend's search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSearchResult {
    /// Backend-assigned session id.
    pub session_id: String,
    /// Account name of the hosting player.
    pub owning_user_name: String,
    /// Slots still free.
    pub num_open_public_connections: u32,
    /// Settings the host advertised.
    pub settings: SessionSettings,
}

/// Server list entry shown to the player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerRecord {
    pub name: String,
    pub host_username: String,
    pub max_players: u32,
    pub current_players: u32,
}

impl ServerRecord {
    /// Map a raw search result, reading the display name from `name_key`.
    pub fn from_search_result(result: &RawSearchResult, name_key: &str) -> Self {
        let max_players = result.settings.num_public_connections;
        let name = result
            .settings
            .get(name_key)
            .unwrap_or(SERVER_NAME_NOT_FOUND)
            .to_string();

        Self {
            name,
            host_username: result.owning_user_name.clone(),
            max_players,
            current_players: max_players.saturating_sub(result.num_open_public_connections),
        }
    }

    pub fn is_full(&self) -> bool {
        self.current_players >= self.max_players
    }
}

/// Results of the most recent completed search.
///
/// Join-by-index addresses `results`, so a set is never mutated once
/// built; a newer search replaces it wholesale.
#[derive(Debug, Clone)]
pub struct SearchResultSet {
    search: SearchId,
    results: Vec<RawSearchResult>,
    records: Vec<ServerRecord>,
}

impl SearchResultSet {
    /// Build the set, keeping backend order.
    pub fn new(search: SearchId, results: Vec<RawSearchResult>, name_key: &str) -> Self {
        let records = results
            .iter()
            .map(|r| ServerRecord::from_search_result(r, name_key))
            .collect();
        Self {
            search,
            results,
            records,
        }
    }

    pub fn search(&self) -> SearchId {
        self.search
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Raw result at `index`, as handed back to the backend on join.
    pub fn get(&self, index: usize) -> Option<&RawSearchResult> {
        self.results.get(index)
    }

    /// Read-only projection for the menu.
    pub fn records(&self) -> &[ServerRecord] {
        &self.records
    }
}
