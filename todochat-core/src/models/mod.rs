pub mod message;

pub use message::{ChatMessage, MessageDraft};
