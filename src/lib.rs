//! # game-session
//!
//! Online session lifecycle coordinator for multiplayer game clients.
//!
//! This crate creates, searches for, joins and tears down online game
//! sessions against an asynchronous session backend, and turns the
//! backend's completion events into menu and level travel actions.
//!
//! ## Features
//!
//! - **Session state machine**: host, re-host (destroy then recreate),
//!   refresh server list, join by index
//! - **Async driver**: one tokio task owns the coordinator and serializes
//!   commands, backend completions and timeout ticks
//! - **Hardened failures**: every operation returns a typed error; stale
//!   completions and network failures are handled without panics
//! - **In-memory backend**: an in-process session provider for local play
//!   and tests
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use game_session::backend::{event_channel, InMemoryBackend, SessionBackend};
//! use game_session::gateway::{TracingMenu, TracingTravel};
//! use game_session::{CoordinatorConfig, SessionCoordinator, SessionDriver};
//!
//! #[tokio::main]
//! async fn main() -> game_session::Result<()> {
//!     game_session::logging::try_init(None).ok();
//!
//!     let (events_tx, events_rx) = event_channel();
//!     let backend: Arc<dyn SessionBackend> =
//!         Arc::new(InMemoryBackend::new("NULL", events_tx));
//!
//!     let mut coordinator = SessionCoordinator::new(
//!         CoordinatorConfig::default(),
//!         Some(backend),
//!         Arc::new(TracingTravel),
//!     );
//!     coordinator.attach_menu(Arc::new(TracingMenu));
//!
//!     let (driver, handle) = SessionDriver::new(coordinator, events_rx);
//!     let task = tokio::spawn(driver.run());
//!
//!     handle.host("Alice's Game").await?;
//!     handle.shutdown().await?;
//!     task.await.ok();
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod cli;
pub mod config;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod session;

// Re-export commonly used types
pub use backend::{JoinResult, SessionBackend, SessionEvent};
pub use error::{Operation, Result, SessionError};
pub use gateway::{MenuGateway, TravelDispatcher};
pub use session::{
    CoordinatorConfig, CoordinatorHandle, CoordinatorState, SearchResultSet, ServerRecord,
    SessionCoordinator, SessionDriver, SessionName,
};
