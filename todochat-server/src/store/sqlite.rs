use async_trait::async_trait;
use sqlx::SqlitePool;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use todochat_core::{new_message_id, ChatMessage};
use uuid::Uuid;

use super::{MessageStore, NewMessage};
use crate::error::StoreError;

/// Store backed by the `chat_messages` table.
/// Ids and timestamps are TEXT columns (hyphenated UUID, RFC3339).
#[derive(Debug, Clone)]
pub struct SqliteMessageStore {
    pool: SqlitePool,
}

impl SqliteMessageStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct MessageRow {
    id: String,
    todo_list_id: String,
    user_id: String,
    username: Option<String>,
    content: String,
    created_at: String,
}

fn parse_uuid(row_id: &str, column: &str, raw: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(raw).map_err(|e| StoreError::Corrupt {
        id: row_id.to_string(),
        reason: format!("{column}: {e}"),
    })
}

impl TryFrom<MessageRow> for ChatMessage {
    type Error = StoreError;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        let created_at =
            OffsetDateTime::parse(&row.created_at, &Rfc3339).map_err(|e| StoreError::Corrupt {
                id: row.id.clone(),
                reason: format!("created_at: {e}"),
            })?;
        Ok(ChatMessage {
            id: parse_uuid(&row.id, "id", &row.id)?,
            list_id: parse_uuid(&row.id, "todo_list_id", &row.todo_list_id)?,
            user_id: parse_uuid(&row.id, "user_id", &row.user_id)?,
            username: row.username,
            content: row.content,
            created_at,
        })
    }
}

fn decode_all(rows: Vec<MessageRow>) -> Result<Vec<ChatMessage>, StoreError> {
    rows.into_iter().map(ChatMessage::try_from).collect()
}

#[async_trait]
impl MessageStore for SqliteMessageStore {
    async fn create(&self, message: NewMessage) -> Result<ChatMessage, StoreError> {
        let saved = message.into_message(new_message_id());
        let created_at = saved.created_at.format(&Rfc3339)?;

        sqlx::query(
            "INSERT INTO chat_messages (id, todo_list_id, user_id, username, content, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(saved.id.to_string())
        .bind(saved.list_id.to_string())
        .bind(saved.user_id.to_string())
        .bind(saved.username.as_deref())
        .bind(saved.content.as_str())
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        Ok(saved)
    }

    async fn find_all(&self) -> Result<Vec<ChatMessage>, StoreError> {
        let rows = sqlx::query_as::<_, MessageRow>(
            "SELECT id, todo_list_id, user_id, username, content, created_at \
             FROM chat_messages ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await?;
        decode_all(rows)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ChatMessage>, StoreError> {
        let row = sqlx::query_as::<_, MessageRow>(
            "SELECT id, todo_list_id, user_id, username, content, created_at \
             FROM chat_messages WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.map(ChatMessage::try_from).transpose()
    }

    async fn find_by_list_id(&self, list_id: Uuid) -> Result<Vec<ChatMessage>, StoreError> {
        let rows = sqlx::query_as::<_, MessageRow>(
            "SELECT id, todo_list_id, user_id, username, content, created_at \
             FROM chat_messages WHERE todo_list_id = ? ORDER BY rowid",
        )
        .bind(list_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        decode_all(rows)
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM chat_messages WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
