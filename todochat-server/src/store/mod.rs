//! Persistence collaborator of the relay: an append-only store of chat messages
//! keyed by a server-generated UUID.

use async_trait::async_trait;
use time::OffsetDateTime;
use todochat_core::ChatMessage;
use uuid::Uuid;

use crate::error::StoreError;

mod memory;
mod sqlite;

pub use memory::MemoryMessageStore;
pub use sqlite::SqliteMessageStore;

/// A validated message that has not been given an id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub list_id: Uuid,
    pub user_id: Uuid,
    pub username: Option<String>,
    pub content: String,
    pub created_at: OffsetDateTime,
}

impl NewMessage {
    pub(crate) fn into_message(self, id: Uuid) -> ChatMessage {
        ChatMessage {
            id,
            list_id: self.list_id,
            user_id: self.user_id,
            username: self.username,
            content: self.content,
            created_at: self.created_at,
        }
    }
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Assigns an id and writes the message.
    async fn create(&self, message: NewMessage) -> Result<ChatMessage, StoreError>;

    /// Every stored message, in insertion order.
    async fn find_all(&self) -> Result<Vec<ChatMessage>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ChatMessage>, StoreError>;

    /// Messages of one list, in insertion order.
    async fn find_by_list_id(&self, list_id: Uuid) -> Result<Vec<ChatMessage>, StoreError>;

    /// Returns whether a row was removed. Unknown ids are not an error.
    async fn delete_by_id(&self, id: Uuid) -> Result<bool, StoreError>;
}
