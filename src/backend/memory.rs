//! In-process session backend.
//!
//! Keeps sessions in memory and answers every request by posting its
//! completion on the event channel. Used for local play, the demo binary
//! and tests; failures and delayed completions can be scripted.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use tracing::{debug, trace};

use super::{EventSender, JoinResult, SessionBackend, SessionEvent, SessionHandle};
use crate::error::{Operation, SessionError};
use crate::session::{RawSearchResult, SearchConfig, SearchId, SessionName, SessionSettings};
use crate::Result;

/// A request as received by [`InMemoryBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendRequest {
    Create {
        session: SessionName,
        settings: SessionSettings,
    },
    Destroy {
        session: SessionName,
    },
    Find {
        search: SearchId,
        config: SearchConfig,
    },
    Join {
        session: SessionName,
        session_id: String,
    },
    Start {
        session: SessionName,
    },
}

impl BackendRequest {
    pub fn operation(&self) -> Operation {
        match self {
            BackendRequest::Create { .. } => Operation::Create,
            BackendRequest::Destroy { .. } => Operation::Destroy,
            BackendRequest::Find { .. } => Operation::Find,
            BackendRequest::Join { .. } => Operation::Join,
            BackendRequest::Start { .. } => Operation::Start,
        }
    }
}

/// A session other players advertise, visible to searches.
#[derive(Debug, Clone)]
struct Listing {
    result: RawSearchResult,
    address: Option<String>,
}

#[derive(Debug, Default)]
struct Inner {
    sessions: HashMap<SessionName, SessionHandle>,
    listings: Vec<Listing>,
    connect_strings: HashMap<SessionName, String>,
    failing: HashSet<Operation>,
    requests: Vec<BackendRequest>,
    hold: bool,
    held: Vec<SessionEvent>,
}

/// Thread-safe in-memory session backend.
pub struct InMemoryBackend {
    subsystem: String,
    events: EventSender,
    inner: RwLock<Inner>,
}

impl InMemoryBackend {
    /// Create a backend reporting `subsystem` and posting to `events`.
    pub fn new(subsystem: impl Into<String>, events: EventSender) -> Self {
        Self {
            subsystem: subsystem.into(),
            events,
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Advertise a remote session reachable at `address`.
    pub fn advertise(&self, result: RawSearchResult, address: impl Into<String>) -> Result<()> {
        self.with_inner(|inner| {
            inner.listings.push(Listing {
                result,
                address: Some(address.into()),
            })
        })
    }

    /// Advertise a remote session whose address cannot be resolved.
    pub fn advertise_unreachable(&self, result: RawSearchResult) -> Result<()> {
        self.with_inner(|inner| {
            inner.listings.push(Listing {
                result,
                address: None,
            })
        })
    }

    /// Make every subsequent request of `operation` fail (or succeed again).
    pub fn set_failing(&self, operation: Operation, failing: bool) -> Result<()> {
        self.with_inner(|inner| {
            if failing {
                inner.failing.insert(operation);
            } else {
                inner.failing.remove(&operation);
            }
        })
    }

    /// Queue completions instead of posting them until [`release`](Self::release).
    pub fn set_hold(&self, hold: bool) -> Result<()> {
        self.with_inner(|inner| inner.hold = hold)
    }

    /// Post every held completion, oldest first. Returns how many were sent.
    pub fn release(&self) -> Result<usize> {
        let held = self.with_inner(|inner| std::mem::take(&mut inner.held))?;
        let count = held.len();
        for event in held {
            self.send(event)?;
        }
        Ok(count)
    }

    /// Post only the held completions matching `predicate`.
    pub fn release_matching<F>(&self, predicate: F) -> Result<usize>
    where
        F: Fn(&SessionEvent) -> bool,
    {
        let released = self.with_inner(|inner| {
            let (matching, rest) = std::mem::take(&mut inner.held)
                .into_iter()
                .partition::<Vec<_>, _>(|event| predicate(event));
            inner.held = rest;
            matching
        })?;
        let count = released.len();
        for event in released {
            self.send(event)?;
        }
        Ok(count)
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<BackendRequest> {
        self.inner
            .read()
            .map(|inner| inner.requests.clone())
            .unwrap_or_default()
    }

    /// Number of requests of `operation` received so far.
    pub fn request_count(&self, operation: Operation) -> usize {
        self.inner
            .read()
            .map(|inner| {
                inner
                    .requests
                    .iter()
                    .filter(|r| r.operation() == operation)
                    .count()
            })
            .unwrap_or(0)
    }

    fn with_inner<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Inner) -> T,
    {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| SessionError::LockPoisoned)?;
        Ok(f(&mut inner))
    }

    fn send(&self, event: SessionEvent) -> Result<()> {
        trace!(?event, "posting backend completion");
        self.events
            .send(event)
            .map_err(|_| SessionError::ChannelClosed)
    }

    /// Record the request, compute its completion, and post or hold it.
    fn complete<F>(&self, request: BackendRequest, f: F) -> Result<()>
    where
        F: FnOnce(&mut Inner, bool) -> SessionEvent,
    {
        let (event, hold) = self.with_inner(|inner| {
            let failing = inner.failing.contains(&request.operation());
            inner.requests.push(request);
            (f(inner, failing), inner.hold)
        })?;

        if hold {
            self.with_inner(|inner| inner.held.push(event))
        } else {
            self.send(event)
        }
    }
}

impl SessionBackend for InMemoryBackend {
    fn subsystem_name(&self) -> &str {
        &self.subsystem
    }

    fn create_session(
        &self,
        _user_index: u32,
        session: &SessionName,
        settings: &SessionSettings,
    ) -> Result<()> {
        let request = BackendRequest::Create {
            session: session.clone(),
            settings: settings.clone(),
        };
        self.complete(request, |inner, failing| {
            // Names are unique: an active session blocks a second create.
            let success = !failing && !inner.sessions.contains_key(session);
            if success {
                inner.sessions.insert(
                    session.clone(),
                    SessionHandle {
                        name: session.clone(),
                        settings: settings.clone(),
                        started: false,
                    },
                );
            }
            debug!(%session, success, "create session");
            SessionEvent::CreateSessionComplete {
                session: session.clone(),
                success,
            }
        })
    }

    fn destroy_session(&self, session: &SessionName) -> Result<()> {
        let request = BackendRequest::Destroy {
            session: session.clone(),
        };
        self.complete(request, |inner, failing| {
            let success = !failing && inner.sessions.remove(session).is_some();
            if success {
                inner.connect_strings.remove(session);
            }
            debug!(%session, success, "destroy session");
            SessionEvent::DestroySessionComplete {
                session: session.clone(),
                success,
            }
        })
    }

    fn find_sessions(
        &self,
        _user_index: u32,
        search: SearchId,
        config: &SearchConfig,
    ) -> Result<()> {
        let request = BackendRequest::Find {
            search,
            config: *config,
        };
        self.complete(request, |inner, failing| {
            let results: Vec<RawSearchResult> = if failing {
                Vec::new()
            } else {
                inner
                    .listings
                    .iter()
                    .filter(|l| l.result.settings.is_lan_match == config.is_lan_query())
                    .filter(|l| !config.presence_filter() || l.result.settings.uses_presence)
                    .take(config.max_results as usize)
                    .map(|l| l.result.clone())
                    .collect()
            };
            debug!(%search, success = !failing, found = results.len(), "find sessions");
            SessionEvent::FindSessionsComplete {
                search,
                success: !failing,
                results,
            }
        })
    }

    fn join_session(
        &self,
        _user_index: u32,
        session: &SessionName,
        result: &RawSearchResult,
    ) -> Result<()> {
        let request = BackendRequest::Join {
            session: session.clone(),
            session_id: result.session_id.clone(),
        };
        self.complete(request, |inner, failing| {
            let listing = inner
                .listings
                .iter()
                .find(|l| l.result.session_id == result.session_id)
                .cloned();

            let outcome = if failing {
                JoinResult::UnknownError
            } else if inner.sessions.contains_key(session) {
                JoinResult::AlreadyInSession
            } else {
                match listing {
                    None => JoinResult::SessionDoesNotExist,
                    Some(l) if l.result.num_open_public_connections == 0 => {
                        JoinResult::SessionIsFull
                    }
                    Some(l) => {
                        inner.sessions.insert(
                            session.clone(),
                            SessionHandle {
                                name: session.clone(),
                                settings: l.result.settings.clone(),
                                started: false,
                            },
                        );
                        if let Some(address) = l.address {
                            inner.connect_strings.insert(session.clone(), address);
                        }
                        JoinResult::Success
                    }
                }
            };
            debug!(%session, result = %outcome, "join session");
            SessionEvent::JoinSessionComplete {
                session: session.clone(),
                result: outcome,
            }
        })
    }

    fn start_session(&self, session: &SessionName) -> Result<()> {
        let request = BackendRequest::Start {
            session: session.clone(),
        };
        self.complete(request, |inner, failing| {
            let success = !failing
                && match inner.sessions.get_mut(session) {
                    Some(handle) => {
                        handle.started = true;
                        true
                    }
                    None => false,
                };
            SessionEvent::StartSessionComplete {
                session: session.clone(),
                success,
            }
        })
    }

    fn resolved_connect_string(&self, session: &SessionName) -> Option<String> {
        let inner = self.inner.read().ok()?;
        inner.connect_strings.get(session).cloned()
    }

    fn named_session(&self, session: &SessionName) -> Option<SessionHandle> {
        let inner = self.inner.read().ok()?;
        inner.sessions.get(session).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::event_channel;
    use crate::session::{SearchMode, SERVER_NAME_SETTINGS_KEY};

    fn listing(id: &str, lan: bool, open: u32) -> RawSearchResult {
        RawSearchResult {
            session_id: id.into(),
            owning_user_name: format!("owner-{}", id),
            num_open_public_connections: open,
            settings: SessionSettings::hosted(lan, 5).with(SERVER_NAME_SETTINGS_KEY, id),
        }
    }

    #[test]
    fn test_create_then_duplicate_create_fails() {
        let (tx, mut rx) = event_channel();
        let backend = InMemoryBackend::new("Steam", tx);
        let name = SessionName::default();

        backend
            .create_session(0, &name, &SessionSettings::default())
            .unwrap();
        backend
            .create_session(0, &name, &SessionSettings::default())
            .unwrap();

        assert!(matches!(
            rx.try_recv().unwrap(),
            SessionEvent::CreateSessionComplete { success: true, .. }
        ));
        assert!(matches!(
            rx.try_recv().unwrap(),
            SessionEvent::CreateSessionComplete { success: false, .. }
        ));
        assert!(backend.named_session(&name).is_some());
        assert_eq!(backend.request_count(Operation::Create), 2);
    }

    #[test]
    fn test_destroy_removes_session() {
        let (tx, mut rx) = event_channel();
        let backend = InMemoryBackend::new("Steam", tx);
        let name = SessionName::default();

        backend
            .create_session(0, &name, &SessionSettings::default())
            .unwrap();
        backend.destroy_session(&name).unwrap();
        backend.destroy_session(&name).unwrap();

        let _ = rx.try_recv().unwrap();
        assert!(matches!(
            rx.try_recv().unwrap(),
            SessionEvent::DestroySessionComplete { success: true, .. }
        ));
        assert!(matches!(
            rx.try_recv().unwrap(),
            SessionEvent::DestroySessionComplete { success: false, .. }
        ));
        assert!(backend.named_session(&name).is_none());
    }

    #[test]
    fn test_find_filters_by_mode_and_caps_results() {
        let (tx, mut rx) = event_channel();
        let backend = InMemoryBackend::new("Steam", tx);
        backend.advertise(listing("a", false, 2), "10.0.0.1:7777").unwrap();
        backend.advertise(listing("b", true, 2), "10.0.0.2:7777").unwrap();
        backend.advertise(listing("c", false, 2), "10.0.0.3:7777").unwrap();

        backend
            .find_sessions(0, SearchId::from_raw(1), &SearchConfig::new(1, SearchMode::Presence))
            .unwrap();
        backend
            .find_sessions(0, SearchId::from_raw(2), &SearchConfig::new(10, SearchMode::Lan))
            .unwrap();

        match rx.try_recv().unwrap() {
            SessionEvent::FindSessionsComplete { results, .. } => {
                assert_eq!(results.len(), 1);
                assert_eq!(results[0].session_id, "a");
            }
            other => panic!("unexpected event {:?}", other),
        }
        match rx.try_recv().unwrap() {
            SessionEvent::FindSessionsComplete { search, results, .. } => {
                assert_eq!(search, SearchId::from_raw(2));
                assert_eq!(results.len(), 1);
                assert_eq!(results[0].session_id, "b");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_join_outcomes() {
        let (tx, mut rx) = event_channel();
        let backend = InMemoryBackend::new("Steam", tx);
        let name = SessionName::default();
        let full = listing("full", false, 0);
        let open = listing("open", false, 3);
        backend.advertise(full.clone(), "10.0.0.1:7777").unwrap();
        backend.advertise(open.clone(), "10.0.0.2:7777").unwrap();

        backend.join_session(0, &name, &full).unwrap();
        backend.join_session(0, &name, &listing("gone", false, 3)).unwrap();
        backend.join_session(0, &name, &open).unwrap();
        backend.join_session(0, &name, &open).unwrap();

        let results: Vec<JoinResult> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|e| match e {
                SessionEvent::JoinSessionComplete { result, .. } => result,
                other => panic!("unexpected event {:?}", other),
            })
            .collect();
        assert_eq!(
            results,
            vec![
                JoinResult::SessionIsFull,
                JoinResult::SessionDoesNotExist,
                JoinResult::Success,
                JoinResult::AlreadyInSession,
            ]
        );
        assert_eq!(
            backend.resolved_connect_string(&name),
            Some("10.0.0.2:7777".to_string())
        );
    }

    #[test]
    fn test_unreachable_listing_has_no_connect_string() {
        let (tx, _rx) = event_channel();
        let backend = InMemoryBackend::new("Steam", tx);
        let name = SessionName::default();
        let result = listing("nat", false, 1);
        backend.advertise_unreachable(result.clone()).unwrap();

        backend.join_session(0, &name, &result).unwrap();
        assert!(backend.named_session(&name).is_some());
        assert_eq!(backend.resolved_connect_string(&name), None);
    }

    #[test]
    fn test_failure_injection() {
        let (tx, mut rx) = event_channel();
        let backend = InMemoryBackend::new("Steam", tx);
        backend.set_failing(Operation::Find, true).unwrap();

        backend
            .find_sessions(0, SearchId::from_raw(1), &SearchConfig::default())
            .unwrap();
        assert!(matches!(
            rx.try_recv().unwrap(),
            SessionEvent::FindSessionsComplete { success: false, .. }
        ));

        backend.set_failing(Operation::Find, false).unwrap();
        backend
            .find_sessions(0, SearchId::from_raw(2), &SearchConfig::default())
            .unwrap();
        assert!(matches!(
            rx.try_recv().unwrap(),
            SessionEvent::FindSessionsComplete { success: true, .. }
        ));
    }

    #[test]
    fn test_hold_and_release() {
        let (tx, mut rx) = event_channel();
        let backend = InMemoryBackend::new("Steam", tx);
        backend.set_hold(true).unwrap();

        backend
            .find_sessions(0, SearchId::from_raw(1), &SearchConfig::default())
            .unwrap();
        backend
            .find_sessions(0, SearchId::from_raw(2), &SearchConfig::default())
            .unwrap();
        assert!(rx.try_recv().is_err());

        let released = backend
            .release_matching(|e| {
                matches!(e, SessionEvent::FindSessionsComplete { search, .. } if search.as_u64() == 2)
            })
            .unwrap();
        assert_eq!(released, 1);
        assert!(matches!(
            rx.try_recv().unwrap(),
            SessionEvent::FindSessionsComplete { search, .. } if search.as_u64() == 2
        ));

        assert_eq!(backend.release().unwrap(), 1);
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn test_start_marks_session_started() {
        let (tx, _rx) = event_channel();
        let backend = InMemoryBackend::new("NULL", tx);
        let name = SessionName::default();

        backend
            .create_session(0, &name, &SessionSettings::default())
            .unwrap();
        backend.start_session(&name).unwrap();
        assert!(backend.named_session(&name).unwrap().started);
        assert_eq!(backend.subsystem_name(), "NULL");
    }

    #[test]
    fn test_closed_channel_reports_error() {
        let (tx, rx) = event_channel();
        drop(rx);
        let backend = InMemoryBackend::new("Steam", tx);
        let err = backend.destroy_session(&SessionName::default()).unwrap_err();
        assert!(matches!(err, SessionError::ChannelClosed));
    }
}
