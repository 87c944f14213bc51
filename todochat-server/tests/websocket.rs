use anyhow::{bail, Result};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use todochat_core::{new_message_id, now_utc, topic_for, ChatMessage, WsMessage};
use todochat_server::broadcast::BroadcastChannel;
use todochat_server::{connect_pool, routes, run_migrations, sqlite_url_for_path, AppState};
use uuid::Uuid;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct Server {
    _dir: TempDir,
    state: Arc<AppState>,
    addr: SocketAddr,
}

async fn start_server() -> Result<Server> {
    start_server_with_capacity(16).await
}

async fn start_server_with_capacity(capacity: usize) -> Result<Server> {
    let dir = TempDir::new()?;
    let url = sqlite_url_for_path(&dir.path().join("todochat.db"))?;
    let pool = connect_pool(&url, 5).await?;
    run_migrations(&pool).await?;
    let state = Arc::new(AppState::with_sqlite(pool, capacity));

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = routes::router(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app.into_make_service()).await;
    });
    Ok(Server { _dir: dir, state, addr })
}

async fn connect(addr: SocketAddr) -> Result<Client> {
    let (client, _) = connect_async(format!("ws://{addr}/ws")).await?;
    Ok(client)
}

async fn send(client: &mut Client, frame: Value) -> Result<()> {
    client.send(Message::Text(frame.to_string())).await?;
    Ok(())
}

async fn next_frame(client: &mut Client) -> Result<WsMessage> {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), client.next()).await?;
        match msg {
            Some(Ok(Message::Text(text))) => return Ok(serde_json::from_str(&text)?),
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(e.into()),
            None => bail!("connection closed"),
        }
    }
}

async fn subscribe(client: &mut Client, list_id: Uuid) -> Result<()> {
    send(client, json!({"type": "subscribe", "payload": {"listId": list_id}})).await?;
    match next_frame(client).await? {
        WsMessage::Subscribed(s) => assert_eq!(s.topic, topic_for(&list_id)),
        other => bail!("expected subscribed, got {other:?}"),
    }
    Ok(())
}

fn stream_send(list_id: Uuid, content: &str) -> Value {
    json!({
        "type": "send",
        "payload": {
            "listId": list_id,
            "message": {"content": content, "userId": Uuid::new_v4(), "username": "Ann"}
        }
    })
}

#[tokio::test]
async fn streamed_message_reaches_every_subscriber_of_the_list() -> Result<()> {
    let server = start_server().await?;
    let list_id = Uuid::new_v4();

    let mut alice = connect(server.addr).await?;
    let mut bob = connect(server.addr).await?;
    let mut other_list = connect(server.addr).await?;
    subscribe(&mut alice, list_id).await?;
    subscribe(&mut bob, list_id).await?;
    subscribe(&mut other_list, Uuid::new_v4()).await?;

    send(&mut alice, stream_send(list_id, "ciao")).await?;

    for client in [&mut alice, &mut bob] {
        match next_frame(client).await? {
            WsMessage::Message(m) => {
                assert_eq!(m.content, "ciao");
                assert_eq!(m.list_id, list_id);
                assert_eq!(m.username.as_deref(), Some("Ann"));
            }
            other => bail!("expected message, got {other:?}"),
        }
    }

    let silent = tokio::time::timeout(Duration::from_millis(200), other_list.next()).await;
    assert!(silent.is_err(), "other lists must not receive the message");

    assert_eq!(server.state.relay.list(Some(list_id)).await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn incomplete_stream_frames_are_ignored_silently() -> Result<()> {
    let server = start_server().await?;
    let list_id = Uuid::new_v4();
    let mut client = connect(server.addr).await?;
    subscribe(&mut client, list_id).await?;

    // niente messaggio, niente lista, contenuto mancante: nessuna risposta
    send(&mut client, json!({"type": "send", "payload": {"listId": list_id}})).await?;
    send(
        &mut client,
        json!({"type": "send", "payload": {"message": {"content": "x", "userId": Uuid::new_v4()}}}),
    )
    .await?;
    send(
        &mut client,
        json!({"type": "send", "payload": {"listId": list_id, "message": {"userId": Uuid::new_v4()}}}),
    )
    .await?;
    send(&mut client, stream_send(list_id, "valid")).await?;

    // the first frame back is the valid one: nothing was sent for the others
    match next_frame(&mut client).await? {
        WsMessage::Message(m) => assert_eq!(m.content, "valid"),
        other => bail!("expected message, got {other:?}"),
    }
    assert_eq!(server.state.relay.list(Some(list_id)).await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn unsubscribe_stops_delivery_and_prunes_the_topic() -> Result<()> {
    let server = start_server().await?;
    let list_id = Uuid::new_v4();
    let topic = topic_for(&list_id);
    let mut client = connect(server.addr).await?;
    subscribe(&mut client, list_id).await?;
    assert_eq!(server.state.hub.subscriber_count(&topic), 1);

    send(&mut client, json!({"type": "unsubscribe", "payload": {"listId": list_id}})).await?;
    // a round-trip through the same socket guarantees the unsubscribe was processed
    subscribe(&mut client, Uuid::new_v4()).await?;
    assert_eq!(server.state.hub.subscriber_count(&topic), 0);

    send(&mut client, stream_send(list_id, "unheard")).await?;
    let silent = tokio::time::timeout(Duration::from_millis(200), client.next()).await;
    assert!(silent.is_err());
    Ok(())
}

#[tokio::test]
async fn garbage_and_server_only_frames_get_an_error_envelope() -> Result<()> {
    let server = start_server().await?;
    let mut client = connect(server.addr).await?;

    client.send(Message::Text("not json".into())).await?;
    match next_frame(&mut client).await? {
        WsMessage::Error(e) => assert_eq!(e.code, "bad_request"),
        other => bail!("expected error, got {other:?}"),
    }

    send(&mut client, json!({"type": "subscribed", "payload": {"topic": "x"}})).await?;
    match next_frame(&mut client).await? {
        WsMessage::Error(e) => assert_eq!(e.code, "unexpected_message"),
        other => bail!("expected error, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn closing_the_socket_releases_its_subscriptions() -> Result<()> {
    let server = start_server().await?;
    let list_id = Uuid::new_v4();
    let topic = topic_for(&list_id);
    let mut client = connect(server.addr).await?;
    subscribe(&mut client, list_id).await?;

    client.close(None).await?;

    // cleanup happens on the server task, poll briefly for it
    for _ in 0..50 {
        if server.state.hub.topic_count() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(server.state.hub.subscriber_count(&topic), 0);
    assert_eq!(server.state.hub.topic_count(), 0);
    Ok(())
}

#[tokio::test]
async fn store_failure_on_stream_send_is_reported_to_the_sender() -> Result<()> {
    let server = start_server().await?;
    let list_id = Uuid::new_v4();
    let mut client = connect(server.addr).await?;
    subscribe(&mut client, list_id).await?;

    server.state.pool.close().await;
    send(&mut client, stream_send(list_id, "lost")).await?;

    match next_frame(&mut client).await? {
        WsMessage::Error(e) => assert_eq!(e.code, "internal_error"),
        other => bail!("expected error, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn idle_subscriber_does_not_buffer_without_limit() -> Result<()> {
    let server = start_server_with_capacity(2).await?;
    let list_id = Uuid::new_v4();
    let topic = topic_for(&list_id);
    let mut client = connect(server.addr).await?;
    subscribe(&mut client, list_id).await?;

    // the client reads nothing while the topic is flooded
    let content = "x".repeat(1024);
    let published = 20_000usize;
    for _ in 0..published {
        let message = ChatMessage {
            id: new_message_id(),
            list_id,
            user_id: Uuid::new_v4(),
            username: None,
            content: content.clone(),
            created_at: now_utc(),
        };
        server.state.hub.publish(&topic, &message);
        tokio::task::yield_now().await;
    }

    let mut received = 0usize;
    while let Ok(Some(frame)) = tokio::time::timeout(Duration::from_millis(500), client.next()).await {
        if let Message::Text(text) = frame? {
            if let WsMessage::Message(_) = serde_json::from_str::<WsMessage>(&text)? {
                received += 1;
            }
        }
    }
    assert!(received > 0);
    assert!(received < published, "all {published} messages were queued for an idle client");

    // the session survives the overflow
    subscribe(&mut client, Uuid::new_v4()).await?;
    Ok(())
}
