// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests over a real listener and real WebSocket clients.

use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use murmur_relay::Delivery;
use murmur_test_utils::TestHarness;

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

async fn connect(addr: SocketAddr, token: &str) -> Ws {
    let (ws, _) = connect_async(format!("ws://{addr}/ws?token={token}"))
        .await
        .unwrap();
    ws
}

async fn send(ws: &mut Ws, frame: Value) {
    ws.send(Message::text(frame.to_string())).await.unwrap();
}

/// Next JSON frame, skipping control frames.
async fn next_event(ws: &mut Ws) -> Value {
    loop {
        let msg = tokio::time::timeout(RECV_TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("socket closed")
            .unwrap();
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

/// Connect and join as `username`, waiting for the `joined` reply.
async fn join(addr: SocketAddr, token: &str, username: &str) -> Ws {
    let mut ws = connect(addr, token).await;
    send(&mut ws, json!({"type": "join", "username": username})).await;
    let joined = next_event(&mut ws).await;
    assert_eq!(joined["type"], "joined");
    assert_eq!(joined["username"], username);
    ws
}

#[tokio::test]
async fn accepted_peers_chat_live() {
    let harness = TestHarness::builder().build().await.unwrap();
    let alice = harness.add_user("alice").await.unwrap();
    let bob = harness.add_user("bob").await.unwrap();
    harness.befriend(&alice, &bob).await.unwrap();
    let (addr, cancel) = harness.spawn_server().await.unwrap();

    let mut alice_ws = join(addr, &harness.login("alice").await.unwrap(), "alice").await;
    let mut bob_ws = join(addr, &harness.login("bob").await.unwrap(), "bob").await;

    send(
        &mut alice_ws,
        json!({"type": "message", "recipient": "bob", "message": "hello bob"}),
    )
    .await;

    let received = next_event(&mut bob_ws).await;
    assert_eq!(received["type"], "message");
    assert_eq!(received["username"], "alice");
    assert_eq!(received["recipient"], "bob");
    assert_eq!(received["message"], "hello bob");

    let echo = next_event(&mut alice_ws).await;
    assert_eq!(echo, received);

    send(
        &mut bob_ws,
        json!({"type": "message", "recipient": "alice", "message": "hi alice"}),
    )
    .await;
    let reply = next_event(&mut alice_ws).await;
    assert_eq!(reply["username"], "bob");
    assert!(reply["id"].as_i64().unwrap() > received["id"].as_i64().unwrap());

    let history = harness.service.get_messages(&alice, "bob").await.unwrap();
    let contents: Vec<&str> = history.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["hello bob", "hi alice"]);

    cancel.cancel();
}

#[tokio::test]
async fn message_without_consent_is_refused_on_the_socket() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness.add_user("alice").await.unwrap();
    let bob = harness.add_user("bob").await.unwrap();
    let (addr, cancel) = harness.spawn_server().await.unwrap();

    let mut alice_ws = join(addr, &harness.login("alice").await.unwrap(), "alice").await;
    send(
        &mut alice_ws,
        json!({"type": "message", "recipient": "bob", "message": "let me in"}),
    )
    .await;

    let err = next_event(&mut alice_ws).await;
    assert_eq!(err["type"], "error");
    assert_eq!(err["code"], "unauthorized");

    let history = harness.service.get_messages(&bob, "alice").await.unwrap();
    assert!(history.is_empty());

    cancel.cancel();
}

#[tokio::test]
async fn joining_as_someone_else_is_refused() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness.add_user("alice").await.unwrap();
    let bob = harness.add_user("bob").await.unwrap();
    let (addr, cancel) = harness.spawn_server().await.unwrap();

    let mut ws = connect(addr, &harness.login("alice").await.unwrap()).await;
    send(&mut ws, json!({"type": "join", "username": "bob"})).await;
    let err = next_event(&mut ws).await;
    assert_eq!(err["type"], "error");
    assert_eq!(err["code"], "unauthorized");
    assert!(!harness.service.presence().is_online(&bob.id));

    send(&mut ws, json!({"type": "bogus"})).await;
    let err = next_event(&mut ws).await;
    assert_eq!(err["type"], "error");
    assert_eq!(err["code"], "invalid_input");

    cancel.cancel();
}

#[tokio::test]
async fn second_connection_supersedes_the_first() {
    let harness = TestHarness::builder().build().await.unwrap();
    let alice = harness.add_user("alice").await.unwrap();
    let bob = harness.add_user("bob").await.unwrap();
    harness.befriend(&alice, &bob).await.unwrap();
    let (addr, cancel) = harness.spawn_server().await.unwrap();
    let token = harness.login("bob").await.unwrap();

    let mut first = join(addr, &token, "bob").await;
    let mut second = join(addr, &token, "bob").await;

    let evicted = next_event(&mut first).await;
    assert_eq!(evicted, json!({"type": "superseded"}));

    // Only the newer connection receives traffic from here on.
    let relayed = harness
        .service
        .send_message(&alice, "bob", "which tab?")
        .await
        .unwrap();
    assert_eq!(relayed.delivery, Delivery::Delivered);
    let received = next_event(&mut second).await;
    assert_eq!(received["message"], "which tab?");

    let rest = tokio::time::timeout(RECV_TIMEOUT, first.next())
        .await
        .expect("evicted socket should close");
    match rest {
        None | Some(Err(_)) | Some(Ok(Message::Close(_))) => {}
        Some(Ok(other)) => panic!("evicted socket received {other:?}"),
    }
    assert_eq!(harness.service.presence().online_count(), 1);

    cancel.cancel();
}

#[tokio::test]
async fn offline_recipient_reads_history_later() {
    let harness = TestHarness::builder().build().await.unwrap();
    let alice = harness.add_user("alice").await.unwrap();
    let bob = harness.add_user("bob").await.unwrap();
    harness.befriend(&alice, &bob).await.unwrap();

    let relayed = harness
        .service
        .send_message(&alice, "bob", "are you there?")
        .await
        .unwrap();
    assert_eq!(relayed.delivery, Delivery::Offline);

    let (addr, cancel) = harness.spawn_server().await.unwrap();
    let mut bob_ws = join(addr, &harness.login("bob").await.unwrap(), "bob").await;

    let history = harness.service.get_messages(&bob, "alice").await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].sender_username, "alice");
    assert_eq!(history[0].content, "are you there?");

    let live = harness
        .service
        .send_message(&alice, "bob", "now you are")
        .await
        .unwrap();
    assert_eq!(live.delivery, Delivery::Delivered);
    assert_eq!(next_event(&mut bob_ws).await["message"], "now you are");

    cancel.cancel();
}

#[tokio::test]
async fn disconnect_clears_presence() {
    let harness = TestHarness::builder().build().await.unwrap();
    let alice = harness.add_user("alice").await.unwrap();
    let (addr, cancel) = harness.spawn_server().await.unwrap();

    let mut ws = join(addr, &harness.login("alice").await.unwrap(), "alice").await;
    assert!(harness.service.presence().is_online(&alice.id));
    ws.close(None).await.unwrap();

    let presence = harness.service.presence().clone();
    let cleared = tokio::time::timeout(RECV_TIMEOUT, async move {
        while presence.is_online(&alice.id) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(cleared.is_ok(), "presence entry should be removed on close");

    cancel.cancel();
}

#[tokio::test]
async fn revoked_token_cannot_open_a_socket() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness.add_user("alice").await.unwrap();
    let token = harness.login("alice").await.unwrap();
    assert!(harness.service.logout(&token).await.unwrap());
    let (addr, cancel) = harness.spawn_server().await.unwrap();

    let err = connect_async(format!("ws://{addr}/ws?token={token}"))
        .await
        .unwrap_err();
    match err {
        tokio_tungstenite::tungstenite::Error::Http(resp) => {
            assert_eq!(resp.status().as_u16(), 401);
        }
        other => panic!("unexpected handshake error {other:?}"),
    }

    cancel.cancel();
}
