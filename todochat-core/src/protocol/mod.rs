pub mod http;
pub mod ws;

// Re-export comodi
pub use http::SendMessageRequest;
pub use ws::{StreamSend, Subscribed, Subscription, WsMessage};
