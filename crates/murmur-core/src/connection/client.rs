//! A live realtime client as seen by the registry.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use murmur_types::connection::ConnectionId;
use murmur_types::error::TransportError;
use murmur_types::identity::Identity;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;

/// A connected client: bound identity plus the sending half of its bounded
/// outbound queue.
///
/// The socket writer task owns the receiving half. Closing the connection
/// cancels its close signal; the writer task exits on it and further sends
/// are rejected, so nothing is written after close.
pub struct ClientConnection {
    id: ConnectionId,
    identity: Identity,
    tx: mpsc::Sender<Arc<String>>,
    closed: CancellationToken,
    connected_at: DateTime<Utc>,
    /// Frames that could not be queued.
    dropped: AtomicU64,
}

impl ClientConnection {
    pub fn new(identity: Identity, tx: mpsc::Sender<Arc<String>>) -> Self {
        Self {
            id: ConnectionId::new(),
            identity,
            tx,
            closed: CancellationToken::new(),
            connected_at: Utc::now(),
            dropped: AtomicU64::new(0),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    /// Queue a text frame without waiting.
    ///
    /// Fails with `Closed` once the connection is closed or its writer is
    /// gone, and with `QueueFull` when the peer is not draining fast enough.
    pub fn send(&self, payload: Arc<String>) -> Result<(), TransportError> {
        if self.closed.is_cancelled() {
            return Err(TransportError::Closed(self.id));
        }
        self.tx.try_send(payload).map_err(|e| {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            match e {
                TrySendError::Full(_) => TransportError::QueueFull(self.id),
                TrySendError::Closed(_) => TransportError::Closed(self.id),
            }
        })
    }

    /// Mark the connection closed. Idempotent.
    pub fn close(&self) {
        self.closed.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled() || self.tx.is_closed()
    }

    /// A token that fires when the connection is closed, for the writer task.
    pub fn close_signal(&self) -> CancellationToken {
        self.closed.clone()
    }

    pub fn drop_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use murmur_types::identity::{Rank, UserId};

    fn make_connection(capacity: usize) -> (ClientConnection, mpsc::Receiver<Arc<String>>) {
        let (tx, rx) = mpsc::channel(capacity);
        let identity = Identity::new(UserId::new(), "alice", Rank::User);
        (ClientConnection::new(identity, tx), rx)
    }

    #[tokio::test]
    async fn send_message_success() {
        let (conn, mut rx) = make_connection(4);
        conn.send(Arc::new("hello".into())).unwrap();
        assert_eq!(&*rx.recv().await.unwrap(), "hello");
        assert_eq!(conn.drop_count(), 0);
    }

    #[test]
    fn send_to_full_queue_fails() {
        let (conn, _rx) = make_connection(1);
        conn.send(Arc::new("one".into())).unwrap();
        let err = conn.send(Arc::new("two".into())).unwrap_err();
        assert_eq!(err, TransportError::QueueFull(conn.id()));
        assert_eq!(conn.drop_count(), 1);
    }

    #[test]
    fn send_after_receiver_dropped_fails() {
        let (conn, rx) = make_connection(4);
        drop(rx);
        assert!(conn.is_closed());
        let err = conn.send(Arc::new("late".into())).unwrap_err();
        assert_eq!(err, TransportError::Closed(conn.id()));
    }

    #[test]
    fn send_after_close_is_rejected() {
        let (conn, mut rx) = make_connection(4);
        conn.close();
        conn.close();
        assert!(conn.is_closed());
        assert!(conn.close_signal().is_cancelled());
        assert!(conn.send(Arc::new("late".into())).is_err());
        assert!(rx.try_recv().is_err());
    }
}
