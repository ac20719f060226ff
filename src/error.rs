//! Error types for game-session.

use std::fmt;

use thiserror::Error;

use crate::backend::JoinResult;
use crate::session::{CoordinatorState, SessionName};

/// Asynchronous backend operation a failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Destroy,
    Find,
    Join,
    Start,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Create => "create session",
            Operation::Destroy => "destroy session",
            Operation::Find => "find sessions",
            Operation::Join => "join session",
            Operation::Start => "start session",
        };
        f.write_str(name)
    }
}

/// Main error type for session coordination.
#[derive(Error, Debug)]
pub enum SessionError {
    /// No session provider was found; the coordinator runs as a no-op.
    #[error("online session backend unavailable")]
    BackendUnavailable,

    /// A create/destroy/find/start request failed at the backend.
    #[error("{0} failed")]
    OperationFailed(Operation),

    /// Joined the session but no connect address could be resolved.
    #[error("could not resolve connect string for session {0}")]
    ResolutionFailed(SessionName),

    /// The backend rejected the join request.
    #[error("join session failed: {0}")]
    JoinFailed(JoinResult),

    /// Join index outside the current search result set.
    #[error("invalid server index {index} (search returned {len} results)")]
    InvalidIndex { index: usize, len: usize },

    /// Join attempted before any search completed.
    #[error("no completed server search to join from")]
    NoSearchResults,

    /// The same kind of operation is already outstanding.
    #[error("{0} already in flight")]
    OperationInFlight(Operation),

    /// Invalid state transition attempted.
    #[error("invalid state transition from {from:?} to {to:?}")]
    InvalidStateTransition {
        from: CoordinatorState,
        to: CoordinatorState,
    },

    /// An outstanding operation never completed.
    #[error("{0} timed out")]
    Timeout(Operation),

    /// The coordinator task is gone.
    #[error("coordinator channel closed")]
    ChannelClosed,

    /// Internal lock was poisoned.
    #[error("internal lock poisoned")]
    LockPoisoned,
}

/// Convenience Result type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;
