//! Coordinator integration tests.
//!
//! These tests run the driver on a tokio task against the in-memory
//! backend and observe the menu and travel calls it produces.

use std::sync::{Arc, Mutex};

use game_session::backend::{
    event_channel, EventSender, InMemoryBackend, NetworkFailure, NetworkFailureKind,
    SessionBackend,
};
use game_session::session::{
    RawSearchResult, SessionSettings, DEFAULT_LOBBY_MAP, DEFAULT_MAIN_MENU_MAP,
    SERVER_NAME_SETTINGS_KEY,
};
use game_session::{
    CoordinatorConfig, CoordinatorHandle, CoordinatorState, MenuGateway, Operation,
    ServerRecord, SessionCoordinator, SessionDriver, SessionError, SessionEvent, SessionName,
    TravelDispatcher,
};

#[derive(Debug, Clone, PartialEq)]
enum Call {
    ServerList(Vec<ServerRecord>),
    LeavingMenu,
    Error(String),
    ServerTravel(String, bool),
    ClientTravel(String, bool),
}

/// Records every menu and travel call in order.
#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<Call>>,
}

impl Recorder {
    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn server_lists(&self) -> Vec<Vec<ServerRecord>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::ServerList(list) => Some(list),
                _ => None,
            })
            .collect()
    }

    fn push(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl MenuGateway for Recorder {
    fn set_server_list(&self, servers: &[ServerRecord]) {
        self.push(Call::ServerList(servers.to_vec()));
    }

    fn notify_leaving_menu(&self) {
        self.push(Call::LeavingMenu);
    }

    fn show_error(&self, error: &SessionError) {
        self.push(Call::Error(error.to_string()));
    }
}

impl TravelDispatcher for Recorder {
    fn server_travel(&self, map: &str, listen: bool) {
        self.push(Call::ServerTravel(map.to_string(), listen));
    }

    fn client_travel(&self, address: &str, absolute: bool) {
        self.push(Call::ClientTravel(address.to_string(), absolute));
    }
}

struct Harness {
    handle: CoordinatorHandle,
    backend: Arc<InMemoryBackend>,
    events: EventSender,
    recorder: Arc<Recorder>,
    task: tokio::task::JoinHandle<SessionCoordinator>,
}

impl Harness {
    fn start(subsystem: &str) -> Self {
        let (events, rx) = event_channel();
        let backend = Arc::new(InMemoryBackend::new(subsystem, events.clone()));
        let recorder = Arc::new(Recorder::default());

        let mut coordinator = SessionCoordinator::new(
            CoordinatorConfig::default(),
            Some(backend.clone() as Arc<dyn SessionBackend>),
            recorder.clone(),
        );
        coordinator.attach_menu(recorder.clone());

        let (driver, handle) = SessionDriver::new(coordinator, rx);
        let task = tokio::spawn(driver.run());

        Self {
            handle,
            backend,
            events,
            recorder,
            task,
        }
    }

    fn advertise(&self, id: &str, name: &str, max: u32, open: u32) {
        let result = RawSearchResult {
            session_id: id.to_string(),
            owning_user_name: format!("{}-host", id),
            num_open_public_connections: open,
            settings: SessionSettings::hosted(false, max).with(SERVER_NAME_SETTINGS_KEY, name),
        };
        self.backend
            .advertise(result, format!("10.1.0.{}:7777", id))
            .unwrap();
    }

    /// Wait until every queued completion has been applied.
    async fn settle(&self) -> CoordinatorState {
        self.handle.state().await.unwrap()
    }

    async fn stop(self) -> SessionCoordinator {
        self.handle.shutdown().await.unwrap();
        self.task.await.unwrap()
    }
}

// ============================================================================
// Hosting
// ============================================================================

#[tokio::test]
async fn test_host_tears_down_menu_and_travels_to_lobby() {
    let h = Harness::start("Steam");

    h.handle.host("Alice's Game").await.unwrap();

    assert_eq!(h.settle().await, CoordinatorState::InSession);
    assert_eq!(
        h.recorder.calls(),
        vec![
            Call::LeavingMenu,
            Call::ServerTravel(DEFAULT_LOBBY_MAP.to_string(), true),
        ]
    );

    let handle = h.backend.named_session(&SessionName::default()).unwrap();
    assert_eq!(handle.settings.get(SERVER_NAME_SETTINGS_KEY), Some("Alice's Game"));
    h.stop().await;
}

#[tokio::test]
async fn test_rehost_issues_destroy_then_single_create() {
    let h = Harness::start("Steam");

    h.handle.host("first").await.unwrap();
    h.settle().await;
    h.handle.host("second").await.unwrap();

    assert_eq!(h.settle().await, CoordinatorState::InSession);
    assert_eq!(h.backend.request_count(Operation::Destroy), 1);
    assert_eq!(h.backend.request_count(Operation::Create), 2);
    h.stop().await;
}

#[tokio::test]
async fn test_failed_destroy_does_not_loop() {
    let h = Harness::start("Steam");

    h.handle.host("first").await.unwrap();
    h.settle().await;

    h.backend.set_failing(Operation::Destroy, true).unwrap();
    h.handle.host("second").await.unwrap();
    assert_eq!(h.settle().await, CoordinatorState::Idle);

    h.handle.host("third").await.unwrap();
    assert_eq!(h.settle().await, CoordinatorState::Idle);

    assert_eq!(h.backend.request_count(Operation::Destroy), 2);
    assert_eq!(h.backend.request_count(Operation::Create), 1);
    h.stop().await;
}

#[tokio::test]
async fn test_lan_host_on_null_subsystem() {
    let h = Harness::start("NULL");

    h.handle.host("").await.unwrap();
    h.settle().await;

    let handle = h.backend.named_session(&SessionName::default()).unwrap();
    assert!(handle.settings.is_lan_match);
    assert_eq!(handle.settings.get(SERVER_NAME_SETTINGS_KEY), Some(""));
    h.stop().await;
}

// ============================================================================
// Server list
// ============================================================================

#[tokio::test]
async fn test_refresh_delivers_records_in_backend_order() {
    let h = Harness::start("Steam");
    h.advertise("1", "Alpha", 5, 2);
    h.advertise("2", "Beta", 3, 3);

    h.handle.refresh_server_list().await.unwrap();
    assert_eq!(h.settle().await, CoordinatorState::Idle);

    let lists = h.recorder.server_lists();
    assert_eq!(lists.len(), 1);
    assert_eq!(
        lists[0],
        vec![
            ServerRecord {
                name: "Alpha".into(),
                host_username: "1-host".into(),
                max_players: 5,
                current_players: 3,
            },
            ServerRecord {
                name: "Beta".into(),
                host_username: "2-host".into(),
                max_players: 3,
                current_players: 0,
            },
        ]
    );
    h.stop().await;
}

#[tokio::test]
async fn test_failed_refresh_keeps_stale_list() {
    let h = Harness::start("Steam");
    h.advertise("1", "Alpha", 5, 2);

    h.handle.refresh_server_list().await.unwrap();
    h.settle().await;

    h.backend.set_failing(Operation::Find, true).unwrap();
    h.handle.refresh_server_list().await.unwrap();
    h.settle().await;

    assert_eq!(h.recorder.server_lists().len(), 1);
    let servers = h.handle.server_list().await.unwrap();
    assert_eq!(servers.len(), 1);
    assert_eq!(servers[0].name, "Alpha");
    assert!(h
        .recorder
        .calls()
        .contains(&Call::Error("find sessions failed".to_string())));
    h.stop().await;
}

// ============================================================================
// Joining
// ============================================================================

#[tokio::test]
async fn test_join_travels_to_resolved_address() {
    let h = Harness::start("Steam");
    h.advertise("1", "Alpha", 5, 2);
    h.advertise("2", "Beta", 5, 2);

    h.handle.refresh_server_list().await.unwrap();
    h.handle.join(1).await.unwrap();
    assert_eq!(h.settle().await, CoordinatorState::AwaitingJoin);

    let calls = h.recorder.calls();
    assert_eq!(calls.len(), 3);
    assert!(matches!(calls[0], Call::ServerList(_)));
    assert_eq!(calls[1], Call::LeavingMenu);
    assert_eq!(calls[2], Call::ClientTravel("10.1.0.2:7777".to_string(), true));
    h.stop().await;
}

#[tokio::test]
async fn test_join_out_of_range_is_rejected() {
    let h = Harness::start("Steam");
    h.advertise("1", "Alpha", 5, 2);
    h.advertise("2", "Beta", 5, 2);

    h.handle.refresh_server_list().await.unwrap();
    let err = h.handle.join(2).await.unwrap_err();

    assert!(matches!(err, SessionError::InvalidIndex { index: 2, len: 2 }));
    assert_eq!(h.backend.request_count(Operation::Join), 0);
    assert!(!h.recorder.calls().contains(&Call::LeavingMenu));
    h.stop().await;
}

#[tokio::test]
async fn test_join_without_search_is_rejected() {
    let h = Harness::start("Steam");

    let err = h.handle.join(0).await.unwrap_err();
    assert!(matches!(err, SessionError::NoSearchResults));
    assert_eq!(h.backend.request_count(Operation::Join), 0);
    h.stop().await;
}

// ============================================================================
// Network failure
// ============================================================================

#[tokio::test]
async fn test_network_failure_returns_to_main_menu_from_session() {
    let h = Harness::start("Steam");

    h.handle.host("x").await.unwrap();
    assert_eq!(h.settle().await, CoordinatorState::InSession);

    h.events
        .send(SessionEvent::NetworkFailure(NetworkFailure::new(
            NetworkFailureKind::ConnectionLost,
            "host went away",
        )))
        .unwrap();

    assert_eq!(h.settle().await, CoordinatorState::Idle);
    assert_eq!(
        h.recorder.calls().last(),
        Some(&Call::ClientTravel(DEFAULT_MAIN_MENU_MAP.to_string(), true))
    );
    h.stop().await;
}

#[tokio::test]
async fn test_network_failure_while_joining_ignores_late_completion() {
    let h = Harness::start("Steam");
    h.advertise("1", "Alpha", 5, 2);

    h.handle.refresh_server_list().await.unwrap();
    h.settle().await;

    h.backend.set_hold(true).unwrap();
    h.handle.join(0).await.unwrap();
    assert_eq!(h.settle().await, CoordinatorState::AwaitingJoin);

    h.events
        .send(SessionEvent::NetworkFailure(NetworkFailure::new(
            NetworkFailureKind::PendingConnectionFailure,
            "refused",
        )))
        .unwrap();
    h.settle().await;

    h.backend.release().unwrap();
    assert_eq!(h.settle().await, CoordinatorState::Idle);

    let travels: Vec<Call> = h
        .recorder
        .calls()
        .into_iter()
        .filter(|c| matches!(c, Call::ClientTravel(..)))
        .collect();
    assert_eq!(
        travels,
        vec![Call::ClientTravel(DEFAULT_MAIN_MENU_MAP.to_string(), true)]
    );
    h.stop().await;
}

// ============================================================================
// Degraded mode
// ============================================================================

#[tokio::test]
async fn test_no_backend_runs_as_noop() {
    let (_events, rx) = event_channel();
    let recorder = Arc::new(Recorder::default());
    let coordinator = SessionCoordinator::new(CoordinatorConfig::default(), None, recorder.clone());
    let (driver, handle) = SessionDriver::new(coordinator, rx);
    let task = tokio::spawn(driver.run());

    assert!(matches!(
        handle.host("x").await,
        Err(SessionError::BackendUnavailable)
    ));
    assert!(matches!(
        handle.refresh_server_list().await,
        Err(SessionError::BackendUnavailable)
    ));
    assert_eq!(handle.state().await.unwrap(), CoordinatorState::Idle);

    handle.load_main_menu().await.unwrap();
    handle.shutdown().await.unwrap();
    task.await.unwrap();

    assert_eq!(
        recorder.calls(),
        vec![Call::ClientTravel(DEFAULT_MAIN_MENU_MAP.to_string(), true)]
    );
}
