//! Coordinator state machine.

/// Lifecycle state of the session coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoordinatorState {
    /// No session operation outstanding.
    #[default]
    Idle,
    /// Tearing down an existing session before recreating it.
    AwaitingDestroy,
    /// CreateSession issued.
    AwaitingCreate,
    /// FindSessions issued from Idle.
    AwaitingFind,
    /// JoinSession issued, or client travel to the joined host started.
    AwaitingJoin,
    /// Hosting a session.
    InSession,
}

impl CoordinatorState {
    /// Check if transition to target state is valid.
    ///
    /// Valid transitions:
    /// - Idle/AwaitingFind/AwaitingJoin/InSession -> AwaitingDestroy | AwaitingCreate (host)
    /// - AwaitingDestroy -> AwaitingCreate (recreate)
    /// - AwaitingCreate -> InSession
    /// - Idle -> AwaitingFind
    /// - Idle/AwaitingFind/AwaitingJoin/InSession -> AwaitingJoin (a finished join can be retried)
    /// - any state -> Idle (failure, timeout or network failure)
    pub fn can_transition_to(&self, target: CoordinatorState) -> bool {
        use CoordinatorState::*;
        matches!(
            (*self, target),
            (_, Idle)
                | (Idle | AwaitingFind | AwaitingJoin | InSession, AwaitingDestroy)
                | (Idle | AwaitingFind | AwaitingJoin | InSession, AwaitingCreate)
                | (AwaitingDestroy, AwaitingCreate)
                | (AwaitingCreate, InSession)
                | (Idle, AwaitingFind)
                | (Idle | AwaitingFind | AwaitingJoin | InSession, AwaitingJoin)
        )
    }

    /// Attempt to transition to a new state.
    ///
    /// Returns `Ok(())` if the transition is valid, or an error otherwise.
    pub fn transition_to(&mut self, target: CoordinatorState) -> crate::Result<()> {
        if self.can_transition_to(target) {
            *self = target;
            Ok(())
        } else {
            Err(crate::error::SessionError::InvalidStateTransition {
                from: *self,
                to: target,
            })
        }
    }
}
