//! todochat-core: tipi condivisi tra client e server della chat delle to-do list
//! (modello dei messaggi, DTO HTTP, envelope WS, errori, naming dei topic).
//! Niente I/O.

pub mod error;
pub mod models;
pub mod protocol;
pub mod utils;

// Re-export utili per ridurre i percorsi nei crate client/server
pub use error::Error;
pub use models::{ChatMessage, MessageDraft};
pub use protocol::http::SendMessageRequest;
pub use protocol::ws::{StreamSend, Subscribed, Subscription, WsMessage};
pub use utils::{new_message_id, now_utc, topic_for, TOPIC_PREFIX};
