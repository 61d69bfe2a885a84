use std::collections::BTreeMap;

use thiserror::Error;

use crate::connection::{ConnectionId, ConnectionState};

/// Handshake-time authentication failures. Terminal for that connection only.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("no session presented")]
    MissingSession,

    /// Unknown, revoked, or expired session. Deliberately indistinguishable.
    #[error("invalid session")]
    InvalidSession,
}

/// Durable store failures.
///
/// Reported to the single affected connection; never tears down the server
/// or other connections.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to append message: {0}")]
    Append(String),

    #[error("failed to read history: {0}")]
    History(String),
}

/// Per-peer delivery failures during a broadcast.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("connection {0} is closed")]
    Closed(ConnectionId),

    #[error("outbound queue full for connection {0}")]
    QueueFull(ConnectionId),
}

impl TransportError {
    pub fn connection_id(&self) -> ConnectionId {
        match self {
            TransportError::Closed(id) | TransportError::QueueFull(id) => *id,
        }
    }
}

/// Illegal connection state transition.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("invalid connection transition: {from} -> {to}")]
pub struct TransitionError {
    pub from: ConnectionState,
    pub to: ConnectionState,
}

/// Field name -> human-readable message, as returned to signup forms.
pub type FieldErrors = BTreeMap<String, String>;

/// Errors from account operations (signup, login, provisioning).
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("validation failed: {0:?}")]
    Validation(FieldErrors),

    /// Unknown username or wrong password; callers cannot tell which.
    #[error("bad username or password")]
    InvalidCredentials,

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("storage error: {0}")]
    StorageError(String),
}

/// Errors from repository operations (used by trait definitions in murmur-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_display() {
        assert_eq!(AuthError::InvalidSession.to_string(), "invalid session");
    }

    #[test]
    fn test_transport_error_connection_id() {
        let id = ConnectionId::new();
        assert_eq!(TransportError::QueueFull(id).connection_id(), id);
        assert_eq!(TransportError::Closed(id).connection_id(), id);
    }

    #[test]
    fn test_transition_error_display() {
        let err = TransitionError {
            from: ConnectionState::Closed,
            to: ConnectionState::Open,
        };
        assert_eq!(err.to_string(), "invalid connection transition: closed -> open");
    }

    #[test]
    fn test_repository_error_display() {
        let err = RepositoryError::Query("syntax error".to_string());
        assert_eq!(err.to_string(), "query error: syntax error");
    }
}
