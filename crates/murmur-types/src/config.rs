//! Server configuration types for Murmur.
//!
//! `ServerConfig` represents the top-level `config.toml` in the data
//! directory. Every field has a default, so an empty or missing file yields a
//! runnable local server.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level configuration for the chat server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// SQLite database file name, relative to the data directory.
    #[serde(default = "default_database_file")]
    pub database_file: String,

    /// Session lifetime from creation, in seconds.
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,

    /// Interval of the background expired-session sweep. 0 disables it.
    #[serde(default = "default_session_sweep_interval_secs")]
    pub session_sweep_interval_secs: u64,

    /// Number of recent messages replayed to a newly joined connection.
    #[serde(default = "default_history_limit")]
    pub history_limit: u32,

    /// Capacity of each connection's outbound queue.
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer: usize,

    /// Upper bound on the time an upgrade request may take.
    #[serde(default = "default_handshake_timeout_secs")]
    pub handshake_timeout_secs: u64,

    /// Largest inbound WebSocket message accepted, in bytes.
    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,

    /// Origin allowed by CORS (credentials are allowed for it).
    #[serde(default = "default_allowed_origin")]
    pub allowed_origin: String,

    /// Mark the session cookie `Secure`. Disable only for plain-HTTP local development.
    #[serde(default = "default_secure_cookies")]
    pub secure_cookies: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_database_file() -> String {
    "murmur.db".to_string()
}

fn default_session_ttl_secs() -> u64 {
    3600
}

fn default_session_sweep_interval_secs() -> u64 {
    60
}

fn default_history_limit() -> u32 {
    5
}

fn default_outbound_buffer() -> usize {
    256
}

fn default_handshake_timeout_secs() -> u64 {
    10
}

fn default_max_message_bytes() -> usize {
    64 * 1024
}

fn default_allowed_origin() -> String {
    "http://localhost:3000".to_string()
}

fn default_secure_cookies() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            database_file: default_database_file(),
            session_ttl_secs: default_session_ttl_secs(),
            session_sweep_interval_secs: default_session_sweep_interval_secs(),
            history_limit: default_history_limit(),
            outbound_buffer: default_outbound_buffer(),
            handshake_timeout_secs: default_handshake_timeout_secs(),
            max_message_bytes: default_max_message_bytes(),
            allowed_origin: default_allowed_origin(),
            secure_cookies: default_secure_cookies(),
        }
    }
}

impl ServerConfig {
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    /// `None` when the background sweep is disabled.
    pub fn session_sweep_interval(&self) -> Option<Duration> {
        (self.session_sweep_interval_secs > 0)
            .then(|| Duration::from_secs(self.session_sweep_interval_secs))
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }

    /// Outbound queue capacity, never smaller than one full history replay
    /// plus one inline notice.
    pub fn effective_outbound_buffer(&self) -> usize {
        self.outbound_buffer.max(self.history_limit as usize + 1)
    }
}
