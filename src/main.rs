//! game-session binary entry point.
//!
//! Runs the coordinator against the in-memory backend, seeded with a few
//! advertised sessions, and reports menu and travel actions through logs.

use std::process::ExitCode;
use std::sync::Arc;

use game_session::backend::{event_channel, InMemoryBackend, SessionBackend};
use game_session::cli::{self, Action};
use game_session::config::Config;
use game_session::gateway::{TracingMenu, TracingTravel};
use game_session::session::{RawSearchResult, SessionSettings, SERVER_NAME_SETTINGS_KEY};
use game_session::{logging, CoordinatorHandle, SessionCoordinator, SessionDriver};
use tracing::{error, info};

fn seed(backend: &InMemoryBackend, lan: bool) -> game_session::Result<()> {
    let listings = [
        ("0001", "alice", "Alice's Game", 5, 2),
        ("0002", "bob", "Bob's Puzzle Den", 4, 0),
        ("0003", "carol", "Late Night Platforms", 2, 1),
    ];
    for (id, owner, name, max, open) in listings {
        let settings = SessionSettings::hosted(lan, max).with(SERVER_NAME_SETTINGS_KEY, name);
        backend.advertise(
            RawSearchResult {
                session_id: id.to_string(),
                owning_user_name: owner.to_string(),
                num_open_public_connections: open,
                settings,
            },
            format!("192.168.0.{}:7777", id.trim_start_matches('0')),
        )?;
    }
    Ok(())
}

async fn run_action(handle: &CoordinatorHandle, action: &Action) -> game_session::Result<()> {
    match action {
        Action::List => handle.refresh_server_list().await,
        Action::Host(name) => handle.host(name.clone()).await,
        Action::Join(index) => {
            // The driver applies the search completion before it looks at
            // the join command, so the result set is in place.
            handle.refresh_server_list().await?;
            handle.join(*index).await
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if args.help {
        cli::print_help();
        return ExitCode::SUCCESS;
    }
    if args.version {
        cli::print_version();
        return ExitCode::SUCCESS;
    }

    let config = match Config::load(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    logging::init(Some(config.log_filter()));
    info!("game-session v{}", env!("CARGO_PKG_VERSION"));

    let (events_tx, events_rx) = event_channel();
    let backend = Arc::new(InMemoryBackend::new("NULL", events_tx));
    let coordinator_config = config.coordinator_config();
    let lan = coordinator_config
        .network_mode
        .is_lan(backend.subsystem_name());
    if let Err(e) = seed(&backend, lan) {
        error!("failed to seed sessions: {}", e);
        return ExitCode::FAILURE;
    }

    let mut coordinator = SessionCoordinator::new(
        coordinator_config,
        Some(backend as Arc<dyn SessionBackend>),
        Arc::new(TracingTravel),
    );
    coordinator.attach_menu(Arc::new(TracingMenu));

    let (driver, handle) = SessionDriver::new(coordinator, events_rx);
    let task = tokio::spawn(driver.run());

    let outcome = run_action(&handle, &args.action).await;

    // Let the completions triggered by the action land before stopping.
    let _ = handle.state().await;
    let _ = handle.shutdown().await;
    let coordinator = match task.await {
        Ok(coordinator) => coordinator,
        Err(e) => {
            error!("session driver panicked: {}", e);
            return ExitCode::FAILURE;
        }
    };
    info!(state = ?coordinator.state(), "done");

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
