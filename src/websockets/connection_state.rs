use std::collections::HashSet;
use thiserror::Error;
use tracing::error;

use crate::shared::AppError;

/// Lifecycle of a single connection. `Closed` is terminal; a reconnect is a new connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    Unauthenticated,
    Authenticating,
    Active,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEvent {
    Attempt,
    Verified,
    Rejected,
    Close,
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid transition from {from:?} on {event:?}")]
pub struct InvalidTransition {
    pub from: ConnectionPhase,
    pub event: PhaseEvent,
}

impl ConnectionPhase {
    pub fn transition(self, event: PhaseEvent) -> Result<ConnectionPhase, InvalidTransition> {
        use ConnectionPhase::*;
        use PhaseEvent::*;

        match (self, event) {
            (Unauthenticated, Attempt) => Ok(Authenticating),
            (Authenticating, Verified) => Ok(Active),
            (Authenticating, Rejected) | (Authenticating, Close) | (Active, Close) => Ok(Closed),
            (from, event) => Err(InvalidTransition { from, event }),
        }
    }
}

impl From<InvalidTransition> for AppError {
    fn from(e: InvalidTransition) -> Self {
        error!(error = %e, "Connection lifecycle violated");
        AppError::Internal
    }
}

/// Everything the relay knows about one live connection
#[derive(Debug, Clone)]
pub struct ConnectionState {
    pub connection_id: String,
    pub user_id: String,
    pub username: String,
    /// Rooms whose channel this connection currently receives
    pub subscriptions: HashSet<String>,
    /// Rooms where the last signal from this connection was `typing`
    pub typing: HashSet<String>,
    phase: ConnectionPhase,
}

impl ConnectionState {
    /// State for a connection whose handshake already reached `Active`.
    /// The handshake phases are walked by `AuthenticatedConnection` before the upgrade.
    pub fn new(connection_id: String, user_id: String, username: String) -> Self {
        Self {
            connection_id,
            user_id,
            username,
            subscriptions: HashSet::new(),
            typing: HashSet::new(),
            phase: ConnectionPhase::Active,
        }
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase == ConnectionPhase::Active
    }

    /// Moves to `Closed`. Closing twice is an error.
    pub fn close(&mut self) -> Result<(), InvalidTransition> {
        self.phase = self.phase.transition(PhaseEvent::Close)?;
        Ok(())
    }

    /// Drains the rooms with an outstanding typing indicator
    pub fn take_typing(&mut self) -> Vec<String> {
        let mut rooms: Vec<String> = self.typing.drain().collect();
        rooms.sort();
        rooms
    }
}
