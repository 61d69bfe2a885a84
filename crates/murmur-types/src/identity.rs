//! Authenticated user identity.
//!
//! An [`Identity`] is issued by the account service on signup/login, carried
//! by every session created for it, and bound to a realtime connection for
//! the connection's whole lifetime.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Unique identifier for a user, wrapping a UUID v7 (time-sortable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Create a new UserId using UUID v7.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Create a UserId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Privilege rank of a user account.
///
/// Maps to the CHECK constraint in the SQLite schema:
/// `CHECK (rank IN ('user', 'admin'))`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rank {
    User,
    Admin,
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rank::User => write!(f, "user"),
            Rank::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for Rank {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Rank::User),
            "admin" => Ok(Rank::Admin),
            other => Err(format!("invalid rank: '{other}'")),
        }
    }
}

impl Default for Rank {
    fn default() -> Self {
        Rank::User
    }
}

/// The authenticated attributes of a user.
///
/// Immutable once issued. Connections copy it at handshake time and never
/// re-validate it per message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    pub username: String,
    pub is_admin: bool,
}

impl Identity {
    pub fn new(user_id: UserId, username: impl Into<String>, rank: Rank) -> Self {
        Self {
            user_id,
            username: username.into(),
            is_admin: rank == Rank::Admin,
        }
    }
}
