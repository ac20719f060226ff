//! Session lifecycle coordinator.
//!
//! Sequences create/destroy/find/join requests against the backend and
//! turns their completions into menu and travel actions. All methods run
//! on one logical thread; the driver feeds completions in as they arrive.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::{
    CoordinatorState, NetworkMode, RawSearchResult, SearchConfig, SearchId, SearchMode,
    SearchResultSet, ServerRecord, SessionIntent, SessionName, SessionSettings,
    DEFAULT_MAX_SEARCH_RESULTS, DEFAULT_PUBLIC_CONNECTIONS, SERVER_NAME_SETTINGS_KEY,
};
use crate::backend::{JoinResult, NetworkFailure, SessionBackend, SessionEvent};
use crate::error::{Operation, SessionError};
use crate::gateway::{MenuGateway, TravelDispatcher};
use crate::Result;

/// Default map the host travels to once its session exists.
pub const DEFAULT_LOBBY_MAP: &str = "/Game/PuzzlePlatforms/Maps/Lobby";

/// Default map for forced returns to the main menu.
pub const DEFAULT_MAIN_MENU_MAP: &str = "/Game/MenuSystem/MainMenu";

/// Default deadline for an outstanding backend request.
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings owned by one coordinator.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Name of the single session this client manages.
    pub session_name: SessionName,
    /// Advertised settings key carrying the server display name.
    pub server_name_key: String,
    pub user_index: u32,
    pub num_public_connections: u32,
    pub network_mode: NetworkMode,
    pub max_search_results: u32,
    pub lobby_map: String,
    pub main_menu_map: String,
    /// `None` waits forever.
    pub operation_timeout: Option<Duration>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            session_name: SessionName::default(),
            server_name_key: SERVER_NAME_SETTINGS_KEY.to_string(),
            user_index: 0,
            num_public_connections: DEFAULT_PUBLIC_CONNECTIONS,
            network_mode: NetworkMode::Auto,
            max_search_results: DEFAULT_MAX_SEARCH_RESULTS,
            lobby_map: DEFAULT_LOBBY_MAP.to_string(),
            main_menu_map: DEFAULT_MAIN_MENU_MAP.to_string(),
            operation_timeout: Some(DEFAULT_OPERATION_TIMEOUT),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    operation: Operation,
    deadline: Option<Instant>,
}

#[derive(Debug, Clone, Copy)]
struct PendingSearch {
    id: SearchId,
    deadline: Option<Instant>,
}

/// The session lifecycle state machine.
pub struct SessionCoordinator {
    config: CoordinatorConfig,
    backend: Option<Arc<dyn SessionBackend>>,
    menu: Option<Arc<dyn MenuGateway>>,
    travel: Arc<dyn TravelDispatcher>,
    state: CoordinatorState,
    intent: Option<SessionIntent>,
    pending: Option<Pending>,
    search: Option<PendingSearch>,
    next_search: SearchId,
    results: Option<SearchResultSet>,
}

impl SessionCoordinator {
    /// Create a coordinator.
    ///
    /// Without a backend every session operation returns
    /// [`SessionError::BackendUnavailable`] and does nothing else.
    pub fn new(
        config: CoordinatorConfig,
        backend: Option<Arc<dyn SessionBackend>>,
        travel: Arc<dyn TravelDispatcher>,
    ) -> Self {
        match &backend {
            Some(backend) => info!("found subsystem {}", backend.subsystem_name()),
            None => warn!("found no session backend; online sessions disabled"),
        }

        Self {
            config,
            backend,
            menu: None,
            travel,
            state: CoordinatorState::Idle,
            intent: None,
            pending: None,
            search: None,
            next_search: SearchId::from_raw(1),
            results: None,
        }
    }

    /// Hand UI callbacks to a freshly loaded menu.
    pub fn attach_menu(&mut self, menu: Arc<dyn MenuGateway>) {
        self.menu = Some(menu);
    }

    /// Forget the menu, e.g. when it is removed from the world.
    pub fn detach_menu(&mut self) -> Option<Arc<dyn MenuGateway>> {
        self.menu.take()
    }

    pub fn has_menu(&self) -> bool {
        self.menu.is_some()
    }

    pub fn is_backend_available(&self) -> bool {
        self.backend.is_some()
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// The last host request, retained for recreate-after-destroy.
    pub fn intent(&self) -> Option<&SessionIntent> {
        self.intent.as_ref()
    }

    /// The lifecycle request currently awaiting completion.
    pub fn pending_operation(&self) -> Option<Operation> {
        self.pending.map(|p| p.operation)
    }

    /// Id of the search whose results will be accepted next.
    pub fn search_in_flight(&self) -> Option<SearchId> {
        self.search.map(|s| s.id)
    }

    /// Results of the most recent successful search.
    pub fn search_results(&self) -> Option<&SearchResultSet> {
        self.results.as_ref()
    }

    /// Server list projection of [`search_results`](Self::search_results).
    pub fn server_records(&self) -> &[ServerRecord] {
        self.results
            .as_ref()
            .map(|set| set.records())
            .unwrap_or_default()
    }

    /// Host a session named `server_name`, replacing any existing one.
    pub fn host(&mut self, server_name: impl Into<String>) -> Result<()> {
        let backend = self.backend()?;

        if self.state == CoordinatorState::AwaitingCreate {
            return Err(SessionError::OperationInFlight(Operation::Create));
        }

        self.intent = Some(SessionIntent::new(server_name));

        if self.state == CoordinatorState::AwaitingDestroy {
            debug!("destroy already in flight; recreating with the new name");
            return Ok(());
        }

        let name = self.config.session_name.clone();
        if backend.named_session(&name).is_some() {
            info!(session = %name, "destroying existing session before hosting");
            self.state.transition_to(CoordinatorState::AwaitingDestroy)?;
            self.begin(Operation::Destroy);
            if let Err(err) = backend.destroy_session(&name) {
                return Err(self.abort(err));
            }
            Ok(())
        } else {
            self.create_session()
        }
    }

    /// Search for joinable sessions. A newer search supersedes older ones.
    pub fn refresh_server_list(&mut self) -> Result<()> {
        let backend = self.backend()?;

        let id = self.next_search;
        self.next_search = id.next();

        let mode = if self.is_lan(backend.as_ref()) {
            SearchMode::Lan
        } else {
            SearchMode::Presence
        };
        let config = SearchConfig::new(self.config.max_search_results, mode);

        let deadline = self.deadline();
        let superseded = self.search.replace(PendingSearch { id, deadline });
        if let Some(previous) = superseded {
            debug!(previous = %previous.id, search = %id, "superseding search in flight");
        }
        if self.state == CoordinatorState::Idle {
            self.state.transition_to(CoordinatorState::AwaitingFind)?;
        }

        info!(search = %id, ?mode, "starting to find sessions");
        if let Err(err) = backend.find_sessions(self.config.user_index, id, &config) {
            self.finish_search();
            return Err(self.report(err));
        }
        Ok(())
    }

    /// Join the session at `index` of the most recent search results.
    pub fn join(&mut self, index: usize) -> Result<()> {
        let backend = self.backend()?;

        // A join whose travel was already dispatched leaves nothing pending.
        if let Some(operation) = self.pending_operation() {
            return Err(SessionError::OperationInFlight(operation));
        }

        let results = self
            .results
            .as_ref()
            .ok_or(SessionError::NoSearchResults)?;
        let result = results
            .get(index)
            .cloned()
            .ok_or(SessionError::InvalidIndex {
                index,
                len: results.len(),
            })?;

        if let Some(menu) = self.menu.take() {
            menu.notify_leaving_menu();
        }

        self.state.transition_to(CoordinatorState::AwaitingJoin)?;
        self.begin(Operation::Join);

        let name = self.config.session_name.clone();
        info!(session = %name, index, host = %result.owning_user_name, "joining session");
        if let Err(err) = backend.join_session(self.config.user_index, &name, &result) {
            return Err(self.abort(err));
        }
        Ok(())
    }

    /// Mark the hosted session as started (match in progress).
    pub fn start_session(&mut self) -> Result<()> {
        let backend = self.backend()?;
        let name = &self.config.session_name;
        info!(session = %name, "starting session");
        backend.start_session(name).map_err(|err| self.report(err))
    }

    /// Send the local client back to the main menu map.
    pub fn load_main_menu(&self) {
        self.travel.client_travel(&self.config.main_menu_map, true);
    }

    /// Dispatch one completion or network event.
    pub fn handle_event(&mut self, event: SessionEvent) -> Result<()> {
        match event {
            SessionEvent::CreateSessionComplete { session, success } => {
                self.on_create_session_complete(&session, success)
            }
            SessionEvent::DestroySessionComplete { session, success } => {
                self.on_destroy_session_complete(&session, success)
            }
            SessionEvent::FindSessionsComplete {
                search,
                success,
                results,
            } => self.on_find_sessions_complete(search, success, results),
            SessionEvent::JoinSessionComplete { session, result } => {
                self.on_join_session_complete(&session, result)
            }
            SessionEvent::StartSessionComplete { session, success } => {
                self.on_start_session_complete(&session, success)
            }
            SessionEvent::NetworkFailure(failure) => {
                self.on_network_failure(&failure);
                Ok(())
            }
        }
    }

    pub fn on_create_session_complete(&mut self, session: &SessionName, success: bool) -> Result<()> {
        if !self.expects(session, CoordinatorState::AwaitingCreate, Operation::Create) {
            return Ok(());
        }
        self.pending = None;

        if !success {
            warn!(session = %session, "could not create session");
            return Err(self.abort(SessionError::OperationFailed(Operation::Create)));
        }

        if let Some(menu) = self.menu.take() {
            menu.notify_leaving_menu();
        }
        self.state.transition_to(CoordinatorState::InSession)?;

        info!(session = %session, "hosting");
        self.travel.server_travel(&self.config.lobby_map, true);
        Ok(())
    }

    pub fn on_destroy_session_complete(&mut self, session: &SessionName, success: bool) -> Result<()> {
        if !self.expects(session, CoordinatorState::AwaitingDestroy, Operation::Destroy) {
            return Ok(());
        }
        self.pending = None;

        if !success {
            // No recreate: a backend refusing destroys would loop forever.
            warn!(session = %session, "could not destroy session");
            return Err(self.abort(SessionError::OperationFailed(Operation::Destroy)));
        }

        self.create_session()
    }

    pub fn on_find_sessions_complete(
        &mut self,
        search: SearchId,
        success: bool,
        results: Vec<RawSearchResult>,
    ) -> Result<()> {
        if self.search_in_flight() != Some(search) {
            debug!(search = %search, "ignoring results of superseded search");
            return Ok(());
        }
        self.finish_search();

        if !success {
            return Err(self.report(SessionError::OperationFailed(Operation::Find)));
        }

        info!(search = %search, found = results.len(), "finished finding sessions");
        let set = SearchResultSet::new(search, results, &self.config.server_name_key);
        for record in set.records() {
            debug!(name = %record.name, host = %record.host_username, "found session");
        }

        if let Some(menu) = &self.menu {
            menu.set_server_list(set.records());
        }
        self.results = Some(set);
        Ok(())
    }

    pub fn on_join_session_complete(&mut self, session: &SessionName, result: JoinResult) -> Result<()> {
        if !self.expects(session, CoordinatorState::AwaitingJoin, Operation::Join) {
            return Ok(());
        }
        self.pending = None;

        if !result.is_success() {
            return Err(self.abort(SessionError::JoinFailed(result)));
        }

        let backend = self.backend()?;
        let Some(address) = backend.resolved_connect_string(session) else {
            warn!(session = %session, "could not get connect string");
            return Err(self.report(SessionError::ResolutionFailed(session.clone())));
        };

        info!(session = %session, "joining {}", address);
        self.travel.client_travel(&address, true);
        Ok(())
    }

    pub fn on_start_session_complete(&mut self, session: &SessionName, success: bool) -> Result<()> {
        if session != &self.config.session_name {
            return Ok(());
        }
        if success {
            info!(session = %session, "session started");
            Ok(())
        } else {
            Err(self.report(SessionError::OperationFailed(Operation::Start)))
        }
    }

    /// Forced recovery: whatever was in flight, go back to the main menu.
    ///
    /// Outstanding requests are not cancelled; their completions arrive
    /// later and are ignored because nothing expects them any more.
    pub fn on_network_failure(&mut self, failure: &NetworkFailure) {
        warn!(kind = ?failure.kind, state = ?self.state, "network failure: {}", failure.message);
        self.state = CoordinatorState::Idle;
        self.pending = None;
        self.search = None;
        self.load_main_menu();
    }

    /// Fail every request whose deadline is at or before `now`.
    pub fn expire(&mut self, now: Instant) -> Result<()> {
        let mut first = None;

        if let Some(pending) = self.pending {
            if pending.deadline.is_some_and(|d| now >= d) {
                let err = self.abort(SessionError::Timeout(pending.operation));
                first.get_or_insert(err);
            }
        }

        if let Some(search) = self.search {
            if search.deadline.is_some_and(|d| now >= d) {
                self.finish_search();
                let err = self.report(SessionError::Timeout(Operation::Find));
                first.get_or_insert(err);
            }
        }

        match first {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn create_session(&mut self) -> Result<()> {
        let backend = self.backend()?;
        let intent = self.intent.clone().unwrap_or_default();

        let mut settings = SessionSettings::hosted(
            self.is_lan(backend.as_ref()),
            self.config.num_public_connections,
        );
        settings.set(&self.config.server_name_key, intent.desired_server_name);

        self.state.transition_to(CoordinatorState::AwaitingCreate)?;
        self.begin(Operation::Create);

        let name = &self.config.session_name;
        info!(session = %name, lan = settings.is_lan_match, "creating session");
        if let Err(err) = backend.create_session(self.config.user_index, name, &settings) {
            return Err(self.abort(err));
        }
        Ok(())
    }

    fn backend(&self) -> Result<Arc<dyn SessionBackend>> {
        self.backend
            .clone()
            .ok_or(SessionError::BackendUnavailable)
    }

    fn is_lan(&self, backend: &dyn SessionBackend) -> bool {
        self.config.network_mode.is_lan(backend.subsystem_name())
    }

    /// `None` when timeouts are disabled or the deadline is not representable.
    fn deadline(&self) -> Option<Instant> {
        self.config
            .operation_timeout
            .and_then(|t| Instant::now().checked_add(t))
    }

    fn begin(&mut self, operation: Operation) {
        debug!(%operation, state = ?self.state, "awaiting completion");
        self.pending = Some(Pending {
            operation,
            deadline: self.deadline(),
        });
    }

    /// Whether a completion for `operation` on `session` is the one we wait for.
    fn expects(&self, session: &SessionName, state: CoordinatorState, operation: Operation) -> bool {
        let expected = session == &self.config.session_name
            && self.state == state
            && self.pending_operation() == Some(operation);
        if !expected {
            debug!(%operation, session = %session, state = ?self.state, "ignoring unexpected completion");
        }
        expected
    }

    fn finish_search(&mut self) {
        self.search = None;
        if self.state == CoordinatorState::AwaitingFind {
            self.state = CoordinatorState::Idle;
        }
    }

    /// Drop the in-flight lifecycle request and return to Idle.
    fn abort(&mut self, err: SessionError) -> SessionError {
        self.pending = None;
        self.state = CoordinatorState::Idle;
        self.report(err)
    }

    /// Log a failure and surface it to the menu, if one is attached.
    fn report(&self, err: SessionError) -> SessionError {
        warn!("{}", err);
        if let Some(menu) = &self.menu {
            menu.show_error(&err);
        }
        err
    }
}
