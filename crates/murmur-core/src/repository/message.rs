//! Message store trait definition.
//!
//! Durable, append-only record of chat messages. The infrastructure layer
//! (murmur-infra) implements this trait with SQLite persistence.

use murmur_types::error::StorageError;
use murmur_types::identity::Identity;
use murmur_types::message::ChatMessage;

/// Append-only, ordered chat history.
///
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait MessageStore: Send + Sync {
    /// Persist a new message authored by `author`.
    ///
    /// The store assigns the message id and timestamp. Timestamps never
    /// decrease across appends; ties keep insertion order. Concurrent
    /// appends must not corrupt the order seen by [`MessageStore::recent`].
    fn append(
        &self,
        author: &Identity,
        body: &str,
    ) -> impl std::future::Future<Output = Result<ChatMessage, StorageError>> + Send;

    /// Up to `limit` most recently appended messages, oldest first.
    ///
    /// Bounded top-N query; implementations must not scan the whole history.
    fn recent(
        &self,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<ChatMessage>, StorageError>> + Send;
}
