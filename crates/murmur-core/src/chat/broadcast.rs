//! Broadcast engine: persist, then fan out.

use std::sync::Arc;

use murmur_types::error::StorageError;
use murmur_types::identity::Identity;
use murmur_types::message::{BroadcastFrame, ChatMessage, ErrorFrame, HistoryFrame};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::frame;
use crate::connection::{BroadcastReport, ClientConnection, ConnectionRegistry};
use crate::repository::message::MessageStore;

/// A message that was stored and fanned out.
#[derive(Debug)]
pub struct Published {
    pub message: ChatMessage,
    pub report: BroadcastReport,
}

/// Appends each inbound message to the store and delivers the stored record
/// to every registered connection.
///
/// Append and fan-out run under one lock, so every recipient observes
/// messages in store insertion order. Joining takes the same lock: each
/// message reaches a new connection either in its history replay or live,
/// never both and never neither.
pub struct BroadcastEngine<S: MessageStore> {
    store: Arc<S>,
    connections: Arc<ConnectionRegistry>,
    publish_lock: Mutex<()>,
}

impl<S: MessageStore> BroadcastEngine<S> {
    pub fn new(store: Arc<S>, connections: Arc<ConnectionRegistry>) -> Self {
        Self {
            store,
            connections,
            publish_lock: Mutex::new(()),
        }
    }

    /// Persist `body` as authored by `author` and broadcast it.
    ///
    /// If the append fails nothing is broadcast and the error is returned to
    /// the caller. The broadcast frame is built from the stored record only;
    /// nothing client-supplied besides the body reaches it.
    pub async fn publish(&self, author: &Identity, body: &str) -> Result<Published, StorageError> {
        let _guard = self.publish_lock.lock().await;

        let message = self.store.append(author, body).await.inspect_err(|e| {
            error!(user_id = %author.user_id, error = %e, "message append failed");
        })?;
        info!(
            message_id = %message.id,
            user_id = %author.user_id,
            username = %author.username,
            "message received"
        );

        let report = self
            .connections
            .broadcast_all(frame::encode(&BroadcastFrame::from(&message)))
            .await;

        Ok(Published { message, report })
    }

    /// Replay the last `history_limit` messages to `connection` alone, then
    /// register it for broadcasts.
    ///
    /// History is best-effort: a failed read queues a `HISTORY_UNAVAILABLE`
    /// notice and the connection is registered anyway. Returns the number of
    /// messages replayed.
    pub async fn join(&self, connection: &Arc<ClientConnection>, history_limit: u32) -> usize {
        let _guard = self.publish_lock.lock().await;

        let replayed = match self.store.recent(history_limit).await {
            Ok(history) => replay(connection, &history),
            Err(err) => {
                error!(conn_id = %connection.id(), error = %err, "failed to retrieve history");
                let notice = frame::encode(&ErrorFrame::new(ErrorFrame::HISTORY_UNAVAILABLE));
                if let Err(e) = connection.send(notice) {
                    debug!(conn_id = %connection.id(), error = %e, "history notice not delivered");
                }
                0
            }
        };

        self.connections.register(Arc::clone(connection)).await;
        replayed
    }
}

fn replay(connection: &ClientConnection, history: &[ChatMessage]) -> usize {
    for (sent, message) in history.iter().enumerate() {
        if let Err(e) = connection.send(frame::encode(&HistoryFrame::from(message))) {
            warn!(conn_id = %connection.id(), error = %e, "history replay interrupted");
            return sent;
        }
    }
    debug!(conn_id = %connection.id(), replayed = history.len(), "history replayed");
    history.len()
}
