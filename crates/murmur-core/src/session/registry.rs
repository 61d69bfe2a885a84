//! Session registry: opaque session id -> identity, with a fixed TTL.
//!
//! Sessions are process-local and die with the process. Expiry is enforced
//! at lookup time (the expired entry is evicted on the spot); an optional
//! background sweeper purges entries nobody looks up again.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, TimeDelta, Utc};
use murmur_types::identity::Identity;
use murmur_types::session::{Session, SessionId};
use rand::RngCore;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Bytes of entropy per session identifier (256 bits).
const SESSION_ID_BYTES: usize = 32;

/// Owner of every live session.
///
/// Mutations (`create`, `revoke`, evictions) take the write lock; lookups
/// share the read lock.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, Session>>,
    ttl: TimeDelta,
}

impl SessionRegistry {
    /// Create an empty registry whose sessions live for `ttl` after creation.
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
        }
    }

    /// Issue a new session for `identity` and return its identifier.
    pub async fn create(&self, identity: Identity) -> SessionId {
        let created_at = Utc::now();
        let expires_at = created_at
            .checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let mut sessions = self.sessions.write().await;
        let id = loop {
            let candidate = generate_session_id();
            if !sessions.contains_key(&candidate) {
                break candidate;
            }
        };

        debug!(user_id = %identity.user_id, username = %identity.username, "session created");
        sessions.insert(
            id.clone(),
            Session {
                id: id.clone(),
                identity,
                created_at,
                expires_at,
            },
        );
        id
    }

    /// Resolve a session to its identity.
    ///
    /// Unknown, revoked, and expired sessions all return `None`. An expired
    /// entry is removed as a side effect.
    pub async fn lookup(&self, id: &SessionId) -> Option<Identity> {
        let now = Utc::now();
        {
            let sessions = self.sessions.read().await;
            match sessions.get(id) {
                None => return None,
                Some(session) if !session.is_expired_at(now) => {
                    return Some(session.identity.clone());
                }
                Some(_) => {}
            }
        }

        let mut sessions = self.sessions.write().await;
        if sessions.get(id).is_some_and(|s| s.is_expired_at(now)) {
            sessions.remove(id);
            debug!("expired session evicted at lookup");
        }
        None
    }

    /// Remove a session. Returns `false` if it was not present or had
    /// already expired (an expired entry is still removed).
    pub async fn revoke(&self, id: &SessionId) -> bool {
        let now = Utc::now();
        self.sessions
            .write()
            .await
            .remove(id)
            .is_some_and(|s| !s.is_expired_at(now))
    }

    /// Drop every expired session. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired_at(now));
        before - sessions.len()
    }

    /// Number of stored sessions (expired-but-unswept ones included).
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Run [`purge_expired`](Self::purge_expired) every `interval` until
    /// `cancel` fires.
    pub fn spawn_sweeper(
        self: &Arc<Self>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // First tick completes immediately.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let purged = registry.purge_expired().await;
                        if purged > 0 {
                            info!(purged, "swept expired sessions");
                        }
                    }
                }
            }
            debug!("session sweeper stopped");
        })
    }
}

fn generate_session_id() -> SessionId {
    let mut bytes = [0u8; SESSION_ID_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    SessionId::new(URL_SAFE_NO_PAD.encode(bytes))
}
