//! Session management module.
//!
//! This module provides the session lifecycle state machine and the value
//! types it works with: session and search identifiers, creation settings,
//! discovered servers, and the async driver that feeds it events.

mod coordinator;
mod driver;
mod id;
mod record;
mod settings;
mod state;

pub use coordinator::{
    CoordinatorConfig, SessionCoordinator, DEFAULT_LOBBY_MAP, DEFAULT_MAIN_MENU_MAP,
    DEFAULT_OPERATION_TIMEOUT,
};
pub use driver::{CoordinatorHandle, SessionCommand, SessionDriver};
pub use id::{SearchId, SessionName};
pub use record::{RawSearchResult, SearchResultSet, ServerRecord, SERVER_NAME_NOT_FOUND};
pub use settings::{
    NetworkMode, SearchConfig, SearchMode, SessionIntent, SessionSettings,
    DEFAULT_MAX_SEARCH_RESULTS, DEFAULT_PUBLIC_CONNECTIONS, SERVER_NAME_SETTINGS_KEY,
};
pub use state::CoordinatorState;
