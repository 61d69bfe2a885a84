//! Chat messages and the JSON frames sent to realtime clients.
//!
//! Three outbound frame shapes exist and their field names are part of the
//! client contract:
//!
//! - [`BroadcastFrame`] -- `{"id","message","username"}` for live fan-out
//! - [`HistoryFrame`] -- the same plus `"timestamp"`, for history replay
//! - [`ErrorFrame`] -- `{"error"}`, an inline notice to a single connection

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::identity::UserId;

/// A persisted chat message.
///
/// Created by the message store on append; immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub body: String,
    pub author_id: UserId,
    pub author_username: String,
    pub timestamp: DateTime<Utc>,
}

/// Live broadcast frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastFrame {
    pub id: String,
    pub message: String,
    pub username: String,
}

impl From<&ChatMessage> for BroadcastFrame {
    fn from(msg: &ChatMessage) -> Self {
        Self {
            id: msg.id.to_string(),
            message: msg.body.clone(),
            username: msg.author_username.clone(),
        }
    }
}

/// History replay frame, sent once per recent message right after a handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryFrame {
    pub id: String,
    pub message: String,
    pub username: String,
    pub timestamp: String,
}

impl From<&ChatMessage> for HistoryFrame {
    fn from(msg: &ChatMessage) -> Self {
        Self {
            id: msg.id.to_string(),
            message: msg.body.clone(),
            username: msg.author_username.clone(),
            timestamp: msg.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
        }
    }
}

/// Inline error notice delivered to the affected connection only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorFrame {
    pub error: String,
}

impl ErrorFrame {
    pub const HISTORY_UNAVAILABLE: &'static str =
        "Error retrieving previous messages. Please try again later.";
    pub const APPEND_FAILED: &'static str = "Failed to store message. Please try again.";
    pub const INVALID_UTF8: &'static str = "Messages must be valid UTF-8 text.";

    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
