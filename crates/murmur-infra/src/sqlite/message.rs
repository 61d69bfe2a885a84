//! SQLite message store implementation.
//!
//! Implements `MessageStore` from `murmur-core`. Messages live in a single
//! append-only table; history reads join `users` for the author's name.

use chrono::{DateTime, SecondsFormat, Utc};
use murmur_core::repository::message::MessageStore;
use murmur_types::error::StorageError;
use murmur_types::identity::{Identity, UserId};
use murmur_types::message::ChatMessage;
use sqlx::Row;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `MessageStore`.
///
/// Timestamps are assigned here, never by the caller. The latest assigned
/// timestamp is held as a high-water mark so stored order and timestamp
/// order agree even if the wall clock steps backwards.
pub struct SqliteMessageStore {
    pool: DatabasePool,
    last_timestamp: Mutex<Option<DateTime<Utc>>>,
}

impl SqliteMessageStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self {
            pool,
            last_timestamp: Mutex::new(None),
        }
    }

    async fn stored_high_water(&self) -> Result<Option<DateTime<Utc>>, StorageError> {
        let max: Option<String> = sqlx::query_scalar("SELECT MAX(timestamp) FROM messages")
            .fetch_one(&self.pool.writer)
            .await
            .map_err(|e| StorageError::Append(e.to_string()))?;

        max.as_deref()
            .map(parse_datetime)
            .transpose()
            .map_err(StorageError::Append)
    }
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("invalid datetime '{s}': {e}"))
}

/// Fixed-width so lexical order in SQLite equals chronological order.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn message_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<ChatMessage, String> {
    let id: String = row.try_get("id").map_err(|e| e.to_string())?;
    let author_id: String = row.try_get("userId").map_err(|e| e.to_string())?;
    let timestamp: String = row.try_get("timestamp").map_err(|e| e.to_string())?;

    Ok(ChatMessage {
        id: id
            .parse::<Uuid>()
            .map_err(|e| format!("invalid message id: {e}"))?,
        body: row.try_get("message").map_err(|e| e.to_string())?,
        author_id: author_id
            .parse::<UserId>()
            .map_err(|e| format!("invalid user id: {e}"))?,
        author_username: row.try_get("username").map_err(|e| e.to_string())?,
        timestamp: parse_datetime(&timestamp)?,
    })
}

impl MessageStore for SqliteMessageStore {
    async fn append(&self, author: &Identity, body: &str) -> Result<ChatMessage, StorageError> {
        // Held across the insert so concurrent appends cannot interleave
        // timestamps out of insertion order.
        let mut last = self.last_timestamp.lock().await;
        if last.is_none() {
            *last = self.stored_high_water().await?;
        }

        let now = Utc::now();
        let timestamp = last.map_or(now, |prev| prev.max(now));
        let message = ChatMessage {
            id: Uuid::now_v7(),
            body: body.to_string(),
            author_id: author.user_id,
            author_username: author.username.clone(),
            timestamp,
        };

        sqlx::query("INSERT INTO messages (id, message, userId, timestamp) VALUES (?, ?, ?, ?)")
            .bind(message.id.to_string())
            .bind(&message.body)
            .bind(message.author_id.to_string())
            .bind(format_datetime(&message.timestamp))
            .execute(&self.pool.writer)
            .await
            .map_err(|e| StorageError::Append(e.to_string()))?;

        *last = Some(timestamp);
        Ok(message)
    }

    async fn recent(&self, limit: u32) -> Result<Vec<ChatMessage>, StorageError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            r#"SELECT m.id, m.message, m.userId, m.timestamp, u.username
               FROM messages m
               JOIN users u ON u.id = m.userId
               ORDER BY m.timestamp DESC, m.rowid DESC
               LIMIT ?"#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| StorageError::History(e.to_string()))?;

        let mut messages = rows
            .iter()
            .map(message_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(StorageError::History)?;
        messages.reverse();
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::user::SqliteUserRepository;
    use murmur_core::repository::user::UserRepository;
    use murmur_types::identity::Rank;
    use murmur_types::user::UserRecord;

    async fn setup() -> (tempfile::TempDir, DatabasePool, SqliteMessageStore) {
        let dir = tempfile::tempdir().unwrap();
        let pool = DatabasePool::open_in(dir.path(), "test.db").await.unwrap();
        let store = SqliteMessageStore::new(pool.clone());
        (dir, pool, store)
    }

    async fn add_user(pool: &DatabasePool, username: &str) -> Identity {
        let record = UserRecord {
            id: UserId::new(),
            username: username.to_string(),
            password_hash: "$argon2id$stub".to_string(),
            rank: Rank::User,
        };
        SqliteUserRepository::new(pool.clone())
            .create(&record)
            .await
            .unwrap();
        record.identity()
    }

    #[tokio::test]
    async fn test_append_assigns_id_and_timestamp() {
        let (_dir, pool, store) = setup().await;
        let alice = add_user(&pool, "alice").await;

        let before = Utc::now();
        let msg = store.append(&alice, "hello").await.unwrap();

        assert_eq!(msg.body, "hello");
        assert_eq!(msg.author_id, alice.user_id);
        assert_eq!(msg.author_username, "alice");
        assert!(msg.timestamp >= before - chrono::TimeDelta::milliseconds(1));
    }

    #[tokio::test]
    async fn test_recent_empty_store() {
        let (_dir, _pool, store) = setup().await;
        assert!(store.recent(5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_recent_returns_last_n_oldest_first() {
        let (_dir, pool, store) = setup().await;
        let alice = add_user(&pool, "alice").await;
        let bob = add_user(&pool, "bob").await;

        let mut ids = Vec::new();
        for n in 0..7 {
            let author = if n % 2 == 0 { &alice } else { &bob };
            ids.push(store.append(author, &format!("m{n}")).await.unwrap().id);
        }

        let recent = store.recent(5).await.unwrap();
        assert_eq!(recent.iter().map(|m| m.id).collect::<Vec<_>>(), ids[2..].to_vec());
        assert_eq!(recent[0].body, "m2");
        assert_eq!(recent[0].author_username, "alice");
        assert_eq!(recent[1].author_username, "bob");
        assert!(recent.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[tokio::test]
    async fn test_recent_fewer_than_limit() {
        let (_dir, pool, store) = setup().await;
        let alice = add_user(&pool, "alice").await;
        store.append(&alice, "only").await.unwrap();

        let recent = store.recent(5).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert!(store.recent(0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_timestamps_never_decrease_across_restart() {
        let (_dir, pool, store) = setup().await;
        let alice = add_user(&pool, "alice").await;

        // A row from the future, as if the clock stepped back after it was written.
        let future = Utc::now() + chrono::TimeDelta::hours(1);
        sqlx::query("INSERT INTO messages (id, message, userId, timestamp) VALUES (?, ?, ?, ?)")
            .bind(Uuid::now_v7().to_string())
            .bind("from the future")
            .bind(alice.user_id.to_string())
            .bind(format_datetime(&future))
            .execute(&pool.writer)
            .await
            .unwrap();

        let msg = store.append(&alice, "now").await.unwrap();
        assert!(msg.timestamp >= future);

        let recent = store.recent(2).await.unwrap();
        assert_eq!(recent[1].body, "now");
    }

    #[tokio::test]
    async fn test_append_for_unknown_author_fails() {
        let (_dir, _pool, store) = setup().await;
        let ghost = Identity::new(UserId::new(), "ghost", Rank::User);

        let err = store.append(&ghost, "boo").await.unwrap_err();
        assert!(matches!(err, StorageError::Append(_)));
        assert!(store.recent(5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_appends_keep_unique_ids() {
        let (_dir, pool, store) = setup().await;
        let alice = add_user(&pool, "alice").await;
        let store = std::sync::Arc::new(store);

        let mut handles = Vec::new();
        for i in 0..4 {
            let store = std::sync::Arc::clone(&store);
            let alice = alice.clone();
            handles.push(tokio::spawn(async move {
                for n in 0..5 {
                    store.append(&alice, &format!("{i}-{n}")).await.unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let all = store.recent(100).await.unwrap();
        assert_eq!(all.len(), 20);
        let ids: std::collections::HashSet<_> = all.iter().map(|m| m.id).collect();
        assert_eq!(ids.len(), 20);
        assert!(all.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }
}
