//! Collaborators the coordinator drives: the menu UI and level travel.
//!
//! Both are owned by the game; the coordinator only calls into them and
//! never inspects their internals.

use tracing::{info, warn};

use crate::error::SessionError;
use crate::session::ServerRecord;

/// Query option that opens a listen server on the travelled-to map.
pub const LISTEN_OPTION: &str = "listen";

/// Menu widget callback surface.
pub trait MenuGateway: Send + Sync {
    /// Replace the displayed server list.
    fn set_server_list(&self, servers: &[ServerRecord]);

    /// The client is about to leave the menu; tear it down.
    fn notify_leaving_menu(&self);

    /// A session operation failed; the menu may offer a retry.
    fn show_error(&self, _error: &SessionError) {}
}

/// Level travel surface of the engine.
pub trait TravelDispatcher: Send + Sync {
    /// Move the server (and all connected clients) to `map`.
    fn server_travel(&self, map: &str, listen: bool);

    /// Move the local client to `address`.
    fn client_travel(&self, address: &str, absolute: bool);
}

/// Travel URL for `map`, with the listen option appended when hosting.
pub fn travel_url(map: &str, listen: bool) -> String {
    if listen {
        format!("{}?{}", map, LISTEN_OPTION)
    } else {
        map.to_string()
    }
}

/// Menu that reports through tracing, for headless runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMenu;

impl MenuGateway for TracingMenu {
    fn set_server_list(&self, servers: &[ServerRecord]) {
        info!(count = servers.len(), "server list updated");
        for (index, server) in servers.iter().enumerate() {
            info!(
                "  [{}] {} (host: {}) {}/{}",
                index, server.name, server.host_username, server.current_players, server.max_players
            );
        }
    }

    fn notify_leaving_menu(&self) {
        info!("leaving menu");
    }

    fn show_error(&self, error: &SessionError) {
        warn!("session error: {}", error);
    }
}

/// Travel dispatcher that only logs the requested travel.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingTravel;

impl TravelDispatcher for TracingTravel {
    fn server_travel(&self, map: &str, listen: bool) {
        info!("server travel to {}", travel_url(map, listen));
    }

    fn client_travel(&self, address: &str, absolute: bool) {
        info!(absolute, "client travel to {}", address);
    }
}
