//! Connection lifecycle controller.
//!
//! Drives each realtime connection through
//! `Connecting -> Authenticated -> Open -> Closed`:
//!
//! 1. [`LifecycleController::authenticate`] resolves the presented session.
//!    Failure ends the connection before it is ever registered.
//! 2. [`LifecycleController::open`] binds the identity, replays recent history
//!    to this connection only, then registers it for broadcasts.
//! 3. [`LifecycleController::handle_inbound`] turns each inbound payload into
//!    a stored, broadcast message, in arrival order for that connection.
//! 4. [`LifecycleController::close`] unregisters exactly once; repeats are no-ops.
//!
//! The first two states are carried by types rather than a runtime field:
//! a connection is `Connecting` until `authenticate` returns, `Authenticated`
//! while an [`AuthenticatedConnection`] is held, and [`OpenConnection`]
//! tracks `Open -> Closed` from there.
//!
//! The socket itself stays in the transport layer: it drains the outbound
//! queue returned by `open` and feeds inbound text to `handle_inbound`.

use std::sync::Arc;

use murmur_types::connection::{ConnectionId, ConnectionState};
use murmur_types::error::{AuthError, StorageError, TransportError};
use murmur_types::identity::Identity;
use murmur_types::message::{ChatMessage, ErrorFrame};
use murmur_types::session::SessionId;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::broadcast::BroadcastEngine;
use super::frame;
use crate::connection::{ClientConnection, ConnectionRegistry};
use crate::repository::message::MessageStore;
use crate::session::SessionRegistry;

/// A connection that passed the session gate but is not yet registered.
#[derive(Debug)]
pub struct AuthenticatedConnection {
    identity: Identity,
}

impl AuthenticatedConnection {
    pub fn identity(&self) -> &Identity {
        &self.identity
    }
}

/// A registered connection, plus the receiving half of its outbound queue
/// until the transport takes it.
pub struct OpenConnection {
    connection: Arc<ClientConnection>,
    outbound: Option<mpsc::Receiver<Arc<String>>>,
    state: ConnectionState,
}

impl OpenConnection {
    pub fn id(&self) -> ConnectionId {
        self.connection.id()
    }

    pub fn identity(&self) -> &Identity {
        self.connection.identity()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Hand the outbound queue to the socket writer. `None` after the first call.
    pub fn take_outbound(&mut self) -> Option<mpsc::Receiver<Arc<String>>> {
        self.outbound.take()
    }

    /// Fires on close, including eviction by the registry.
    pub fn close_signal(&self) -> CancellationToken {
        self.connection.close_signal()
    }

    /// Send an inline error notice to this connection only.
    pub fn notify(&self, error: &str) -> Result<(), TransportError> {
        self.connection.send(frame::encode(&ErrorFrame::new(error)))
    }
}

/// Owns the handshake-to-close path for every realtime connection.
pub struct LifecycleController<S: MessageStore> {
    sessions: Arc<SessionRegistry>,
    connections: Arc<ConnectionRegistry>,
    engine: BroadcastEngine<S>,
    history_limit: u32,
    outbound_buffer: usize,
}

impl<S: MessageStore> LifecycleController<S> {
    /// - `history_limit`: messages replayed to each new connection
    /// - `outbound_buffer`: per-connection queue capacity; raised to fit a
    ///   full replay plus one notice if smaller
    pub fn new(
        sessions: Arc<SessionRegistry>,
        connections: Arc<ConnectionRegistry>,
        store: Arc<S>,
        history_limit: u32,
        outbound_buffer: usize,
    ) -> Self {
        let engine = BroadcastEngine::new(store, Arc::clone(&connections));
        Self {
            sessions,
            connections,
            engine,
            history_limit,
            outbound_buffer: outbound_buffer.max(history_limit as usize + 1),
        }
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    pub fn connections(&self) -> &Arc<ConnectionRegistry> {
        &self.connections
    }

    /// Handshake gate: resolve the presented session id to an identity.
    pub async fn authenticate(
        &self,
        session_id: Option<&str>,
    ) -> Result<AuthenticatedConnection, AuthError> {
        let Some(raw) = session_id.filter(|s| !s.is_empty()) else {
            warn!("connection denied: no session presented");
            return Err(AuthError::MissingSession);
        };

        match self.sessions.lookup(&SessionId::from(raw)).await {
            Some(identity) => {
                debug!(username = %identity.username, "handshake authenticated");
                Ok(AuthenticatedConnection { identity })
            }
            None => {
                warn!("connection denied: invalid session");
                Err(AuthError::InvalidSession)
            }
        }
    }

    /// Replay history to the new connection, then register it.
    ///
    /// History is best-effort: a failed read sends an inline notice and the
    /// connection opens anyway. Messages published while the connection
    /// joins are delivered exactly once, in the replay or live.
    pub async fn open(&self, authenticated: AuthenticatedConnection) -> OpenConnection {
        let (tx, rx) = mpsc::channel(self.outbound_buffer);
        let connection = Arc::new(ClientConnection::new(authenticated.identity, tx));

        self.engine.join(&connection, self.history_limit).await;
        info!(
            conn_id = %connection.id(),
            username = %connection.identity().username,
            "connection established"
        );

        OpenConnection {
            connection,
            outbound: Some(rx),
            state: ConnectionState::Open,
        }
    }

    /// Treat `body` as a new chat message from `conn`: store it, then
    /// broadcast the stored record.
    ///
    /// Returns `Ok(None)` when nothing was published (blank body, or the
    /// connection is no longer open). An append failure is reported to
    /// `conn` alone and leaves it open.
    pub async fn handle_inbound(
        &self,
        conn: &OpenConnection,
        body: &str,
    ) -> Result<Option<ChatMessage>, StorageError> {
        if conn.state != ConnectionState::Open || conn.connection.is_closed() {
            debug!(conn_id = %conn.id(), "inbound message on closed connection ignored");
            return Ok(None);
        }
        if body.trim().is_empty() {
            return Ok(None);
        }

        match self.engine.publish(conn.identity(), body).await {
            Ok(published) => Ok(Some(published.message)),
            Err(err) => {
                if let Err(e) = conn.notify(ErrorFrame::APPEND_FAILED) {
                    debug!(conn_id = %conn.id(), error = %e, "append failure notice not delivered");
                }
                Err(err)
            }
        }
    }

    /// Transition to `Closed` and unregister. Returns `false` if the
    /// connection was already closed.
    pub async fn close(&self, conn: &mut OpenConnection) -> bool {
        if conn.state.transition(ConnectionState::Closed).is_err() {
            return false;
        }
        self.connections.unregister(conn.id()).await;
        conn.connection.close();
        info!(
            conn_id = %conn.id(),
            username = %conn.identity().username,
            "connection closed"
        );
        true
    }

    /// Close every live connection (server shutdown).
    pub async fn shutdown(&self) -> usize {
        let closed = self.connections.close_all().await;
        info!(closed, "closed all live connections");
        closed
    }
}
