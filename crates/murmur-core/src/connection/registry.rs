//! The set of live connections and registry-wide fan-out.

use std::collections::HashMap;
use std::sync::Arc;

use murmur_types::connection::ConnectionId;
use murmur_types::error::TransportError;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::client::ClientConnection;

/// Outcome of one [`ConnectionRegistry::broadcast_all`] call.
#[derive(Debug, Default)]
pub struct BroadcastReport {
    /// Connections in the snapshot the broadcast iterated over.
    pub recipients: usize,
    /// Connections the payload was queued for.
    pub delivered: usize,
    /// Per-peer failures; each of these connections has been evicted.
    pub failures: Vec<TransportError>,
}

impl BroadcastReport {
    pub fn evicted(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.failures.iter().map(TransportError::connection_id)
    }
}

/// Owner of every registered connection.
///
/// `register`/`unregister` take the write lock and `broadcast_all` holds the
/// read lock for its whole iteration, so each broadcast sees a consistent
/// snapshot: a connection registered mid-broadcast waits for it to finish
/// and never receives a message sent before it joined.
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<ConnectionId, Arc<ClientConnection>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Add a connection to the broadcast set.
    ///
    /// Returns `false` if it was already registered (never double-counted).
    pub async fn register(&self, connection: Arc<ClientConnection>) -> bool {
        let id = connection.id();
        let mut conns = self.connections.write().await;
        if conns.contains_key(&id) {
            return false;
        }
        conns.insert(id, connection);
        debug!(conn_id = %id, total = conns.len(), "connection registered");
        true
    }

    /// Remove a connection. No-op (returns `false`) if already removed.
    pub async fn unregister(&self, id: ConnectionId) -> bool {
        let removed = self.connections.write().await.remove(&id).is_some();
        if removed {
            debug!(conn_id = %id, "connection unregistered");
        }
        removed
    }

    /// Deliver `payload` to every registered connection.
    ///
    /// A failure for one peer never stops delivery to the others; failed
    /// peers are closed and evicted after the iteration.
    pub async fn broadcast_all(&self, payload: Arc<String>) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        {
            let conns = self.connections.read().await;
            report.recipients = conns.len();
            for conn in conns.values() {
                match conn.send(Arc::clone(&payload)) {
                    Ok(()) => report.delivered += 1,
                    Err(err) => {
                        warn!(
                            conn_id = %conn.id(),
                            username = %conn.identity().username,
                            error = %err,
                            "broadcast delivery failed, evicting connection"
                        );
                        report.failures.push(err);
                    }
                }
            }
        }

        if !report.failures.is_empty() {
            let mut conns = self.connections.write().await;
            for id in report.evicted() {
                if let Some(conn) = conns.remove(&id) {
                    conn.close();
                }
            }
        }

        debug!(
            recipients = report.recipients,
            delivered = report.delivered,
            evicted = report.failures.len(),
            "broadcast complete"
        );
        report
    }

    /// Close and remove every connection. Returns how many were closed.
    pub async fn close_all(&self) -> usize {
        let drained: Vec<_> = self.connections.write().await.drain().collect();
        for (_, conn) in &drained {
            conn.close();
        }
        drained.len()
    }

    pub async fn contains(&self, id: ConnectionId) -> bool {
        self.connections.read().await.contains_key(&id)
    }

    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.connections.read().await.is_empty()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use murmur_types::identity::{Identity, Rank, UserId};
    use tokio::sync::mpsc;

    fn make_connection(
        name: &str,
        capacity: usize,
    ) -> (Arc<ClientConnection>, mpsc::Receiver<Arc<String>>) {
        let (tx, rx) = mpsc::channel(capacity);
        let identity = Identity::new(UserId::new(), name, Rank::User);
        (Arc::new(ClientConnection::new(identity, tx)), rx)
    }

    fn payload(text: &str) -> Arc<String> {
        Arc::new(text.to_string())
    }

    #[tokio::test]
    async fn register_is_not_double_counted() {
        let registry = ConnectionRegistry::new();
        let (conn, _rx) = make_connection("alice", 8);

        assert!(registry.register(Arc::clone(&conn)).await);
        assert!(!registry.register(Arc::clone(&conn)).await);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn unregister_twice_is_noop() {
        let registry = ConnectionRegistry::new();
        let (conn, _rx) = make_connection("alice", 8);
        registry.register(Arc::clone(&conn)).await;

        assert!(registry.unregister(conn.id()).await);
        assert!(!registry.unregister(conn.id()).await);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn broadcast_reaches_every_connection_once() {
        let registry = ConnectionRegistry::new();
        let (a, mut rx_a) = make_connection("alice", 8);
        let (b, mut rx_b) = make_connection("bob", 8);
        registry.register(a).await;
        registry.register(b).await;

        let report = registry.broadcast_all(payload("m1")).await;
        assert_eq!(report.recipients, 2);
        assert_eq!(report.delivered, 2);
        assert!(report.failures.is_empty());

        assert_eq!(&*rx_a.recv().await.unwrap(), "m1");
        assert_eq!(&*rx_b.recv().await.unwrap(), "m1");
        assert!(rx_a.try_recv().is_err());
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn late_registration_misses_earlier_broadcast() {
        let registry = ConnectionRegistry::new();
        let (a, mut rx_a) = make_connection("alice", 8);
        registry.register(a).await;

        registry.broadcast_all(payload("before")).await;

        let (b, mut rx_b) = make_connection("bob", 8);
        registry.register(b).await;
        registry.broadcast_all(payload("after")).await;

        assert_eq!(&*rx_a.recv().await.unwrap(), "before");
        assert_eq!(&*rx_a.recv().await.unwrap(), "after");
        assert_eq!(&*rx_b.recv().await.unwrap(), "after");
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn dead_peer_is_evicted_and_others_still_receive() {
        let registry = ConnectionRegistry::new();
        let (a, rx_a) = make_connection("alice", 8);
        let (b, mut rx_b) = make_connection("bob", 8);
        let a_id = a.id();
        registry.register(Arc::clone(&a)).await;
        registry.register(b).await;

        // Alice's transport goes away mid-conversation.
        drop(rx_a);

        let report = registry.broadcast_all(payload("m")).await;
        assert_eq!(report.delivered, 1);
        assert_eq!(report.evicted().collect::<Vec<_>>(), vec![a_id]);
        assert_eq!(&*rx_b.recv().await.unwrap(), "m");
        assert!(!registry.contains(a_id).await);
        assert!(a.is_closed());

        // The next broadcast is not attempted against the evicted peer.
        let report = registry.broadcast_all(payload("m2")).await;
        assert_eq!(report.recipients, 1);
        assert_eq!(report.delivered, 1);
        assert_eq!(&*rx_b.recv().await.unwrap(), "m2");
    }

    #[tokio::test]
    async fn slow_consumer_is_evicted_on_overflow() {
        let registry = ConnectionRegistry::new();
        let (slow, _rx_slow) = make_connection("slow", 1);
        let slow_id = slow.id();
        registry.register(slow).await;

        registry.broadcast_all(payload("1")).await;
        let report = registry.broadcast_all(payload("2")).await;

        assert_eq!(report.failures, vec![TransportError::QueueFull(slow_id)]);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn closed_connection_is_skipped() {
        let registry = ConnectionRegistry::new();
        let (a, mut rx_a) = make_connection("alice", 8);
        registry.register(Arc::clone(&a)).await;
        a.close();

        let report = registry.broadcast_all(payload("m")).await;
        assert_eq!(report.delivered, 0);
        assert!(rx_a.try_recv().is_err());
        // Eviction after close followed by an explicit unregister stays a no-op.
        assert!(!registry.unregister(a.id()).await);
    }

    #[tokio::test]
    async fn close_all_closes_everything() {
        let registry = ConnectionRegistry::new();
        let (a, _rx_a) = make_connection("alice", 8);
        let (b, _rx_b) = make_connection("bob", 8);
        registry.register(Arc::clone(&a)).await;
        registry.register(Arc::clone(&b)).await;

        assert_eq!(registry.close_all().await, 2);
        assert!(registry.is_empty().await);
        assert!(a.is_closed() && b.is_closed());
    }

    #[tokio::test]
    async fn concurrent_register_and_broadcast() {
        let registry = Arc::new(ConnectionRegistry::new());
        let mut receivers = Vec::new();
        let mut handles = Vec::new();

        for i in 0..32 {
            let (conn, rx) = make_connection(&format!("user{i}"), 64);
            receivers.push(rx);
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                registry.register(conn).await;
                registry.broadcast_all(Arc::new(format!("from {i}"))).await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(registry.len().await, 32);
        for mut rx in receivers {
            let mut seen = std::collections::HashSet::new();
            while let Ok(msg) = rx.try_recv() {
                assert!(seen.insert(msg), "duplicate delivery");
            }
            // Every connection at least sees its own broadcast.
            assert!(!seen.is_empty());
        }
    }
}
