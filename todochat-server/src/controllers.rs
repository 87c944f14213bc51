use axum::extract::ws::{Message, WebSocket};
use axum::{
    extract::{rejection::JsonRejection, Extension, Path, WebSocketUpgrade},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use futures_util::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use todochat_core::{topic_for, ChatMessage, SendMessageRequest, Subscribed, WsMessage};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::{RelayError, ValidationError};
use crate::AppState;

/// Handler per POST /api/chat/send
///
/// Anche un body illeggibile (JSON rotto, tipi sbagliati, content-type mancante)
/// è un 400 senza body, come un campo mancante.
pub async fn send_message(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ChatMessage>), RelayError> {
    let Json(req) = payload.map_err(|rejection| ValidationError::Body(rejection.body_text()))?;
    let saved = state.relay.submit_request(req).await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

/// Handler per GET /api/chat/history/:list_id
///
/// Un id che non è un UUID vale come assente: 200 con lista vuota.
pub async fn history(
    Extension(state): Extension<Arc<AppState>>,
    Path(list_id): Path<String>,
) -> Result<Json<Vec<ChatMessage>>, RelayError> {
    let parsed = Uuid::parse_str(&list_id).ok();
    if parsed.is_none() {
        tracing::debug!(%list_id, "history requested for a non-uuid list id");
    }
    Ok(Json(state.relay.list(parsed).await?))
}

/// Handler per /ws
pub async fn ws_handler(
    Extension(state): Extension<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    /* socket.split() divide l'oggetto WebSocket in due metà indipendenti:
        sender (un Sink) usato per inviare messaggi verso il client,
        receiver (uno Stream) usato per ricevere messaggi dal client. */
    let (mut sender, mut receiver) = socket.split();

    // Tutto ciò che va verso il client passa da questo canale: risposte dirette
    // e messaggi inoltrati dai topic sottoscritti. È limitato come i topic, così
    // un client lento perde messaggi invece di accumularli in memoria.
    let (tx, mut rx) = mpsc::channel::<WsMessage>(state.hub.capacity());

    // Task: forward messages from rx -> websocket
    let forward_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let text = match serde_json::to_string(&msg) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to encode ws frame");
                    continue;
                }
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let mut subscriptions: HashMap<Uuid, JoinHandle<()>> = HashMap::new();

    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(t) => match serde_json::from_str::<WsMessage>(&t) {
                Ok(WsMessage::Subscribe(sub)) => {
                    let topic = topic_for(&sub.list_id);
                    if !subscriptions.contains_key(&sub.list_id) {
                        let rx = state.hub.subscribe(&topic);
                        subscriptions.insert(sub.list_id, forward_topic(rx, tx.clone(), topic.clone()));
                        tracing::info!(%topic, "websocket subscribed");
                    }
                    let _ = tx.send(WsMessage::Subscribed(Subscribed { topic })).await;
                }
                Ok(WsMessage::Unsubscribe(sub)) => {
                    if let Some(handle) = subscriptions.remove(&sub.list_id) {
                        stop_forwarding(&state, sub.list_id, handle).await;
                    }
                }
                Ok(WsMessage::Send(send)) => {
                    // fire-and-forget: il broadcast è l'unica risposta
                    let list_id = send.list_id.clone();
                    if let Err(e) = state.relay.submit_stream(send).await {
                        tracing::error!(list_id = ?list_id, error = %e, "streamed message not stored");
                        let _ = tx
                            .send(WsMessage::Error(todochat_core::Error::new(
                                "internal_error",
                                "message store unavailable",
                            )))
                            .await;
                    }
                }
                Ok(other) => {
                    tracing::debug!(frame = ?other, "unexpected client frame");
                    let _ = tx
                        .send(WsMessage::Error(todochat_core::Error::new(
                            "unexpected_message",
                            "clients may only send subscribe, unsubscribe or send",
                        )))
                        .await;
                }
                Err(e) => {
                    let _ = tx
                        .send(WsMessage::Error(todochat_core::Error::new(
                            "bad_request",
                            format!("invalid frame: {}", e),
                        )))
                        .await;
                }
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    // cleanup
    for (list_id, handle) in subscriptions.drain() {
        stop_forwarding(&state, list_id, handle).await;
    }
    drop(tx);
    // ensure forward task ends
    let _ = forward_task.await;
}

/// Inoltra i messaggi del topic verso la sessione WS.
/// Se la coda della sessione è piena il messaggio viene scartato.
fn forward_topic(
    mut rx: broadcast::Receiver<ChatMessage>,
    out: mpsc::Sender<WsMessage>,
    topic: String,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut dropped: u64 = 0;
        loop {
            match rx.recv().await {
                Ok(message) => match out.try_send(WsMessage::Message(message)) {
                    Ok(()) => {
                        if dropped > 0 {
                            tracing::warn!(%topic, dropped, "slow websocket, messages dropped");
                            dropped = 0;
                        }
                    }
                    Err(mpsc::error::TrySendError::Full(_)) => dropped += 1,
                    Err(mpsc::error::TrySendError::Closed(_)) => break,
                },
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(%topic, skipped, "slow subscriber, messages dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

async fn stop_forwarding(state: &AppState, list_id: Uuid, handle: JoinHandle<()>) {
    handle.abort();
    // aspetta che il receiver sia davvero rilasciato prima di potare il topic
    let _ = handle.await;
    state.hub.prune(&topic_for(&list_id));
}
