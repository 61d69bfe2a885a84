//! Application state wiring all services together.
//!
//! AppState holds the concrete service instances used by both the CLI and
//! the HTTP server. Core types are generic over repository/hasher traits;
//! AppState pins them to the infra implementations.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use murmur_core::chat::LifecycleController;
use murmur_core::connection::ConnectionRegistry;
use murmur_core::service::account::AccountService;
use murmur_core::session::SessionRegistry;
use murmur_infra::config::{load_server_config, resolve_data_dir};
use murmur_infra::crypto::password::Argon2PasswordHasher;
use murmur_infra::sqlite::message::SqliteMessageStore;
use murmur_infra::sqlite::pool::DatabasePool;
use murmur_infra::sqlite::user::SqliteUserRepository;
use murmur_types::config::ServerConfig;
use tokio_util::sync::CancellationToken;

/// Concrete type aliases for the core generics pinned to infra implementations.
pub type ConcreteAccountService = AccountService<SqliteUserRepository, Argon2PasswordHasher>;

pub type ChatHub = LifecycleController<SqliteMessageStore>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<ConcreteAccountService>,
    pub hub: Arc<ChatHub>,
    pub messages: Arc<SqliteMessageStore>,
    pub config: Arc<ServerConfig>,
    pub data_dir: PathBuf,
    /// Cancelled once the server begins shutting down.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Resolve the data directory, load `config.toml`, open the database.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        let config = load_server_config(&data_dir).await;
        Self::with_config(data_dir, config).await
    }

    /// Wire services over `{data_dir}/{config.database_file}`.
    pub async fn with_config(data_dir: PathBuf, config: ServerConfig) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(&data_dir).await?;
        let db_pool = DatabasePool::open_in(&data_dir, &config.database_file).await?;

        let accounts = AccountService::new(
            SqliteUserRepository::new(db_pool.clone()),
            Argon2PasswordHasher::new(),
        );

        let messages = Arc::new(SqliteMessageStore::new(db_pool));
        let hub = LifecycleController::new(
            Arc::new(SessionRegistry::new(config.session_ttl())),
            Arc::new(ConnectionRegistry::new()),
            Arc::clone(&messages),
            config.history_limit,
            config.effective_outbound_buffer(),
        );

        Ok(Self {
            accounts: Arc::new(accounts),
            hub: Arc::new(hub),
            messages,
            config: Arc::new(config),
            data_dir,
            shutdown: CancellationToken::new(),
        })
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        self.hub.sessions()
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}
