//! In-memory message stores for unit tests.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use murmur_types::error::StorageError;
use murmur_types::identity::Identity;
use murmur_types::message::ChatMessage;
use tokio::sync::{Mutex, Notify};
use uuid::Uuid;

use crate::repository::message::MessageStore;

#[derive(Default)]
pub struct MemoryMessageStore {
    messages: Mutex<Vec<ChatMessage>>,
}

impl MemoryMessageStore {
    pub async fn len(&self) -> usize {
        self.messages.lock().await.len()
    }
}

impl MessageStore for MemoryMessageStore {
    async fn append(&self, author: &Identity, body: &str) -> Result<ChatMessage, StorageError> {
        let mut messages = self.messages.lock().await;
        let now = Utc::now();
        let timestamp = messages.last().map_or(now, |last| last.timestamp.max(now));
        let message = ChatMessage {
            id: Uuid::now_v7(),
            body: body.to_string(),
            author_id: author.user_id,
            author_username: author.username.clone(),
            timestamp,
        };
        messages.push(message.clone());
        Ok(message)
    }

    async fn recent(&self, limit: u32) -> Result<Vec<ChatMessage>, StorageError> {
        let messages = self.messages.lock().await;
        let start = messages.len().saturating_sub(limit as usize);
        Ok(messages[start..].to_vec())
    }
}

/// A store whose disk is always full.
pub struct FailingMessageStore;

impl MessageStore for FailingMessageStore {
    async fn append(&self, _author: &Identity, _body: &str) -> Result<ChatMessage, StorageError> {
        Err(StorageError::Append("disk full".to_string()))
    }

    async fn recent(&self, _limit: u32) -> Result<Vec<ChatMessage>, StorageError> {
        Err(StorageError::History("store unavailable".to_string()))
    }
}

/// Memory store whose next `recent` call, once armed, pauses after reading
/// until `release` is notified.
#[derive(Default)]
pub struct GatedMessageStore {
    inner: MemoryMessageStore,
    armed: AtomicBool,
    pub reached: Notify,
    pub release: Notify,
}

impl GatedMessageStore {
    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.inner.len().await
    }
}

impl MessageStore for GatedMessageStore {
    async fn append(&self, author: &Identity, body: &str) -> Result<ChatMessage, StorageError> {
        self.inner.append(author, body).await
    }

    async fn recent(&self, limit: u32) -> Result<Vec<ChatMessage>, StorageError> {
        let history = self.inner.recent(limit).await;
        if self.armed.swap(false, Ordering::SeqCst) {
            self.reached.notify_one();
            self.release.notified().await;
        }
        history
    }
}
