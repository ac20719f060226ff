//! Online session backend contract.
//!
//! The backend is an opaque asynchronous provider of session primitives.
//! Requests return immediately; each one completes later by posting a
//! [`SessionEvent`] on the channel the backend was constructed with. The
//! coordinator subscribes to that channel once and dispatches by event kind.

mod memory;

use std::fmt;

use tokio::sync::mpsc;

use crate::session::{RawSearchResult, SearchConfig, SearchId, SessionName, SessionSettings};
use crate::Result;

pub use memory::{BackendRequest, InMemoryBackend};

/// Subsystem name of the LAN-only null backend.
pub const NULL_SUBSYSTEM: &str = "NULL";

/// Sender half of the event channel backends and the network layer post to.
pub type EventSender = mpsc::UnboundedSender<SessionEvent>;

/// Receiver half of the event channel, consumed by the driver.
pub type EventReceiver = mpsc::UnboundedReceiver<SessionEvent>;

/// Create a session event channel.
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Handle to a session registered with the backend under a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandle {
    pub name: SessionName,
    pub settings: SessionSettings,
    /// Whether StartSession has been called on it.
    pub started: bool,
}

/// Outcome of a JoinSession request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinResult {
    Success,
    SessionIsFull,
    SessionDoesNotExist,
    CouldNotRetrieveAddress,
    AlreadyInSession,
    UnknownError,
}

impl JoinResult {
    pub fn is_success(&self) -> bool {
        matches!(self, JoinResult::Success)
    }
}

impl fmt::Display for JoinResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            JoinResult::Success => "success",
            JoinResult::SessionIsFull => "session is full",
            JoinResult::SessionDoesNotExist => "session does not exist",
            JoinResult::CouldNotRetrieveAddress => "could not retrieve address",
            JoinResult::AlreadyInSession => "already in session",
            JoinResult::UnknownError => "unknown error",
        };
        f.write_str(text)
    }
}

/// Kind of network fault reported by the engine's net driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkFailureKind {
    NetDriverCreateFailure,
    NetDriverListenFailure,
    ConnectionLost,
    ConnectionTimeout,
    FailureReceived,
    OutdatedClient,
    OutdatedServer,
    PendingConnectionFailure,
}

/// Out-of-band network fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkFailure {
    pub kind: NetworkFailureKind,
    pub message: String,
}

impl NetworkFailure {
    pub fn new(kind: NetworkFailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Completion events delivered to the coordinator.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    CreateSessionComplete {
        session: SessionName,
        success: bool,
    },
    DestroySessionComplete {
        session: SessionName,
        success: bool,
    },
    FindSessionsComplete {
        search: SearchId,
        success: bool,
        results: Vec<RawSearchResult>,
    },
    JoinSessionComplete {
        session: SessionName,
        result: JoinResult,
    },
    StartSessionComplete {
        session: SessionName,
        success: bool,
    },
    NetworkFailure(NetworkFailure),
}

/// Asynchronous provider of session primitives.
///
/// Request methods only report failure to *dispatch* the request; the
/// operation's own outcome arrives later as a [`SessionEvent`].
pub trait SessionBackend: Send + Sync {
    /// Name of the online subsystem, `"NULL"` for LAN-only.
    fn subsystem_name(&self) -> &str;

    fn create_session(
        &self,
        user_index: u32,
        session: &SessionName,
        settings: &SessionSettings,
    ) -> Result<()>;

    fn destroy_session(&self, session: &SessionName) -> Result<()>;

    fn find_sessions(&self, user_index: u32, search: SearchId, config: &SearchConfig)
        -> Result<()>;

    fn join_session(
        &self,
        user_index: u32,
        session: &SessionName,
        result: &RawSearchResult,
    ) -> Result<()>;

    fn start_session(&self, session: &SessionName) -> Result<()>;

    /// Connect address for a joined session, if the backend can resolve one.
    fn resolved_connect_string(&self, session: &SessionName) -> Option<String>;

    /// The session registered under `session`, if any.
    fn named_session(&self, session: &SessionName) -> Option<SessionHandle>;
}
