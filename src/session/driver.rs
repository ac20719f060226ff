//! Async driver for the session coordinator.
//!
//! The coordinator is not shared: one task owns it and serializes UI
//! commands, backend completions and timeout ticks, so no locking is
//! needed. Callers talk to that task through a [`CoordinatorHandle`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::{CoordinatorState, ServerRecord, SessionCoordinator};
use crate::backend::EventReceiver;
use crate::error::SessionError;
use crate::gateway::MenuGateway;
use crate::Result;

/// How often outstanding requests are checked against their deadlines.
pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

/// Shortest accepted deadline check interval.
pub const MIN_TICK: Duration = Duration::from_millis(1);

const COMMAND_BUFFER: usize = 32;

/// Request sent from a [`CoordinatorHandle`] to the driver task.
pub enum SessionCommand {
    Host {
        server_name: String,
        reply: oneshot::Sender<Result<()>>,
    },
    RefreshServerList {
        reply: oneshot::Sender<Result<()>>,
    },
    Join {
        index: usize,
        reply: oneshot::Sender<Result<()>>,
    },
    StartSession {
        reply: oneshot::Sender<Result<()>>,
    },
    LoadMainMenu,
    AttachMenu(Arc<dyn MenuGateway>),
    DetachMenu,
    State {
        reply: oneshot::Sender<CoordinatorState>,
    },
    ServerList {
        reply: oneshot::Sender<Vec<ServerRecord>>,
    },
    Shutdown,
}

/// Owns a [`SessionCoordinator`] and runs its event loop.
pub struct SessionDriver {
    coordinator: SessionCoordinator,
    commands: mpsc::Receiver<SessionCommand>,
    events: EventReceiver,
    tick: Duration,
}

impl SessionDriver {
    /// Create a driver fed by `events`, plus the handle that commands it.
    pub fn new(coordinator: SessionCoordinator, events: EventReceiver) -> (Self, CoordinatorHandle) {
        let (tx, commands) = mpsc::channel(COMMAND_BUFFER);
        let driver = Self {
            coordinator,
            commands,
            events,
            tick: DEFAULT_TICK,
        };
        (driver, CoordinatorHandle { tx })
    }

    /// Change the deadline check interval, clamped to at least [`MIN_TICK`].
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick.max(MIN_TICK);
        self
    }

    /// Run until shut down or every handle is dropped.
    ///
    /// Returns the coordinator so its final state can be inspected.
    pub async fn run(mut self) -> SessionCoordinator {
        let mut ticker = tokio::time::interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            // Completions first: anything a command triggered is applied
            // before the next command is looked at.
            tokio::select! {
                biased;

                Some(event) = self.events.recv() => {
                    if let Err(e) = self.coordinator.handle_event(event) {
                        debug!("session event handled with error: {}", e);
                    }
                }
                command = self.commands.recv() => match command {
                    Some(SessionCommand::Shutdown) | None => break,
                    Some(command) => self.handle_command(command),
                },
                _ = ticker.tick() => {
                    if let Err(e) = self.coordinator.expire(Instant::now()) {
                        debug!("expired session request: {}", e);
                    }
                }
            }
        }

        info!("session driver stopped");
        self.coordinator
    }

    fn handle_command(&mut self, command: SessionCommand) {
        // A dropped reply receiver just means the caller stopped waiting.
        match command {
            SessionCommand::Host { server_name, reply } => {
                let _ = reply.send(self.coordinator.host(server_name));
            }
            SessionCommand::RefreshServerList { reply } => {
                let _ = reply.send(self.coordinator.refresh_server_list());
            }
            SessionCommand::Join { index, reply } => {
                let _ = reply.send(self.coordinator.join(index));
            }
            SessionCommand::StartSession { reply } => {
                let _ = reply.send(self.coordinator.start_session());
            }
            SessionCommand::LoadMainMenu => self.coordinator.load_main_menu(),
            SessionCommand::AttachMenu(menu) => self.coordinator.attach_menu(menu),
            SessionCommand::DetachMenu => {
                self.coordinator.detach_menu();
            }
            SessionCommand::State { reply } => {
                let _ = reply.send(self.coordinator.state());
            }
            SessionCommand::ServerList { reply } => {
                let _ = reply.send(self.coordinator.server_records().to_vec());
            }
            SessionCommand::Shutdown => {}
        }
    }
}

/// Cloneable handle for issuing commands to a running [`SessionDriver`].
#[derive(Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::Sender<SessionCommand>,
}

impl CoordinatorHandle {
    pub async fn host(&self, server_name: impl Into<String>) -> Result<()> {
        let server_name = server_name.into();
        self.request(|reply| SessionCommand::Host { server_name, reply })
            .await?
    }

    pub async fn refresh_server_list(&self) -> Result<()> {
        self.request(|reply| SessionCommand::RefreshServerList { reply })
            .await?
    }

    pub async fn join(&self, index: usize) -> Result<()> {
        self.request(|reply| SessionCommand::Join { index, reply })
            .await?
    }

    pub async fn start_session(&self) -> Result<()> {
        self.request(|reply| SessionCommand::StartSession { reply })
            .await?
    }

    pub async fn load_main_menu(&self) -> Result<()> {
        self.send(SessionCommand::LoadMainMenu).await
    }

    pub async fn attach_menu(&self, menu: Arc<dyn MenuGateway>) -> Result<()> {
        self.send(SessionCommand::AttachMenu(menu)).await
    }

    pub async fn detach_menu(&self) -> Result<()> {
        self.send(SessionCommand::DetachMenu).await
    }

    pub async fn state(&self) -> Result<CoordinatorState> {
        self.request(|reply| SessionCommand::State { reply }).await
    }

    pub async fn server_list(&self) -> Result<Vec<ServerRecord>> {
        self.request(|reply| SessionCommand::ServerList { reply })
            .await
    }

    /// Stop the driver loop.
    pub async fn shutdown(&self) -> Result<()> {
        self.send(SessionCommand::Shutdown).await
    }

    async fn send(&self, command: SessionCommand) -> Result<()> {
        self.tx
            .send(command)
            .await
            .map_err(|_| SessionError::ChannelClosed)
    }

    async fn request<T, F>(&self, make: F) -> Result<T>
    where
        F: FnOnce(oneshot::Sender<T>) -> SessionCommand,
    {
        let (reply, rx) = oneshot::channel();
        self.send(make(reply)).await?;
        rx.await.map_err(|_| SessionError::ChannelClosed)
    }
}
