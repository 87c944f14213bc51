/* This file defines how data "travel" through the web socket.
    WsMessage is the envelope { type, payload }; the variants are:
    Subscribe / Unsubscribe -> client joins or leaves the topic of a to-do list
    Send -> streaming send from client, fire-and-forget (no ack, the broadcast is the answer)
    Subscribed -> server confirms a subscription with the topic name
    Message -> server pushes a message broadcast on a subscribed topic
    Error -> for errors not related to validation (e.g. storage down, bad envelope)
*/
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::Error,
    models::{ChatMessage, MessageDraft},
};

/// Messaggio WS con envelope { type, payload }.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum WsMessage {
    /// Client → Server: iscrizione al topic di una lista.
    #[serde(rename = "subscribe")]
    Subscribe(Subscription),
    /// Client → Server: disiscrizione.
    #[serde(rename = "unsubscribe")]
    Unsubscribe(Subscription),
    /// Client → Server: invio in streaming.
    #[serde(rename = "send")]
    Send(StreamSend),
    /// Server → Client: conferma dell'iscrizione.
    #[serde(rename = "subscribed")]
    Subscribed(Subscribed),
    /// Server → Client: nuovo messaggio sul topic.
    #[serde(rename = "message")]
    Message(ChatMessage),
    /// Server → Client: errore fuori banda.
    #[serde(rename = "error")]
    Error(Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    #[serde(alias = "todoListId")]
    pub list_id: Uuid,
}

/// Payload dell'invio in streaming (C→S). Entrambi i campi possono mancare:
/// in quel caso il server ignora il frame senza rispondere.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamSend {
    #[serde(default, alias = "todoListId", skip_serializing_if = "Option::is_none")]
    pub list_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<MessageDraft>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscribed {
    pub topic: String,
}
