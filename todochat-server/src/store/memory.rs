use async_trait::async_trait;
use todochat_core::{new_message_id, ChatMessage};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{MessageStore, NewMessage};
use crate::error::StoreError;

/// Process-local store for tests that do not need SQLite.
#[derive(Debug, Default)]
pub struct MemoryMessageStore {
    messages: RwLock<Vec<ChatMessage>>,
}

impl MemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.messages.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.messages.read().await.is_empty()
    }
}

#[async_trait]
impl MessageStore for MemoryMessageStore {
    async fn create(&self, message: NewMessage) -> Result<ChatMessage, StoreError> {
        let saved = message.into_message(new_message_id());
        self.messages.write().await.push(saved.clone());
        Ok(saved)
    }

    async fn find_all(&self) -> Result<Vec<ChatMessage>, StoreError> {
        Ok(self.messages.read().await.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ChatMessage>, StoreError> {
        Ok(self.messages.read().await.iter().find(|m| m.id == id).cloned())
    }

    async fn find_by_list_id(&self, list_id: Uuid) -> Result<Vec<ChatMessage>, StoreError> {
        Ok(self
            .messages
            .read()
            .await
            .iter()
            .filter(|m| m.list_id == list_id)
            .cloned()
            .collect())
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut messages = self.messages.write().await;
        let before = messages.len();
        messages.retain(|m| m.id != id);
        Ok(messages.len() != before)
    }
}
