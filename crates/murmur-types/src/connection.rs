//! Realtime connection identifiers and the per-connection state machine.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;

use crate::error::TransitionError;

/// Process-local identifier of a live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a realtime connection.
///
/// `Connecting -> Authenticated -> Open -> Closed`. A connection that fails
/// authentication goes straight from `Connecting` to `Closed`; nothing else
/// may skip a state, and `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connecting,
    Authenticated,
    Open,
    Closed,
}

impl ConnectionState {
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (Connecting, Authenticated)
                | (Connecting, Closed)
                | (Authenticated, Open)
                | (Authenticated, Closed)
                | (Open, Closed)
        )
    }

    /// Validate and perform a transition.
    pub fn transition(&mut self, next: ConnectionState) -> Result<(), TransitionError> {
        if !self.can_transition_to(next) {
            return Err(TransitionError {
                from: *self,
                to: next,
            });
        }
        *self = next;
        Ok(())
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Authenticated => write!(f, "authenticated"),
            ConnectionState::Open => write!(f, "open"),
            ConnectionState::Closed => write!(f, "closed"),
        }
    }
}
