//! Message relay: validation, server-side stamping, persistence, fan-out and
//! ordered history reads for the chat of a to-do list.

use std::sync::Arc;

use todochat_core::{now_utc, topic_for, ChatMessage, MessageDraft, SendMessageRequest, StreamSend};
use tracing::{info, warn};
use uuid::Uuid;

use crate::broadcast::BroadcastChannel;
use crate::error::{RelayError, StoreError, ValidationError};
use crate::store::{MessageStore, NewMessage};

#[derive(Clone)]
pub struct RelayService {
    store: Arc<dyn MessageStore>,
    channel: Arc<dyn BroadcastChannel>,
}

impl RelayService {
    pub fn new(store: Arc<dyn MessageStore>, channel: Arc<dyn BroadcastChannel>) -> Self {
        Self { store, channel }
    }

    /// Validates `draft`, persists it under `list_id` and publishes the stored record.
    ///
    /// `list_id` comes from the transport and always wins over `draft.list_id`.
    /// A preset `created_at` is kept, otherwise the current server time is used.
    /// Content made only of whitespace counts as empty and is rejected.
    /// Nothing is written or published when validation fails.
    pub async fn submit(
        &self,
        draft: MessageDraft,
        list_id: Option<&str>,
    ) -> Result<ChatMessage, RelayError> {
        let new_message = validate(draft, list_id)?;
        let saved = self.store.create(new_message).await?;

        self.channel.publish(&topic_for(&saved.list_id), &saved);
        info!(
            message_id = %saved.id,
            list_id = %saved.list_id,
            user_id = %saved.user_id,
            "chat message relayed"
        );
        Ok(saved)
    }

    /// Request/response entry point: every field, `username` included, is required.
    pub async fn submit_request(&self, req: SendMessageRequest) -> Result<ChatMessage, RelayError> {
        if req.username.is_none() {
            return Err(ValidationError::Missing("username").into());
        }
        let list_id = req.list_id.clone();
        self.submit(MessageDraft::from(req), list_id.as_deref()).await
    }

    /// Streaming entry point, fire-and-forget.
    ///
    /// A frame without message or list id is ignored, and so is a message that
    /// fails validation: the streaming caller never gets a validation error.
    /// Only store failures come back.
    pub async fn submit_stream(&self, send: StreamSend) -> Result<Option<ChatMessage>, StoreError> {
        let (Some(list_id), Some(draft)) = (send.list_id, send.message) else {
            return Ok(None);
        };
        match self.submit(draft, Some(&list_id)).await {
            Ok(saved) => Ok(Some(saved)),
            Err(RelayError::Validation(e)) => {
                warn!(list_id = %list_id, field = e.field(), error = %e, "dropped streamed message");
                Ok(None)
            }
            Err(RelayError::Persistence(e)) => Err(e),
        }
    }

    /// History of one list, oldest first; equal timestamps keep insertion order.
    /// `None` gives an empty history without touching the store.
    pub async fn list(&self, list_id: Option<Uuid>) -> Result<Vec<ChatMessage>, RelayError> {
        let Some(list_id) = list_id else {
            return Ok(Vec::new());
        };
        let mut messages = self.store.find_by_list_id(list_id).await?;
        messages.retain(|m| m.list_id == list_id);
        messages.sort_by_key(|m| m.created_at);
        Ok(messages)
    }
}

fn validate(draft: MessageDraft, list_id: Option<&str>) -> Result<NewMessage, ValidationError> {
    let content = draft.content.ok_or(ValidationError::Missing("content"))?;
    if content.trim().is_empty() {
        return Err(ValidationError::Empty("content"));
    }
    let user_id = parse_id("userId", draft.user_id.as_deref())?;
    let list_id = parse_id("listId", list_id)?;

    Ok(NewMessage {
        list_id,
        user_id,
        username: draft.username,
        content,
        created_at: draft.created_at.unwrap_or_else(now_utc),
    })
}

fn parse_id(field: &'static str, raw: Option<&str>) -> Result<Uuid, ValidationError> {
    let raw = raw.ok_or(ValidationError::Missing(field))?;
    Uuid::parse_str(raw.trim()).map_err(|_| ValidationError::Malformed {
        field,
        value: raw.to_string(),
    })
}
