// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket handler for real-time messaging.
//!
//! The session token travels as `?token=` because browsers cannot set
//! headers on a WebSocket handshake. Frames are the JSON events defined in
//! [`murmur_relay::events`].
//!
//! Each socket runs two tasks:
//! 1. Sender task: drains the connection's outbox into the socket.
//! 2. Receive loop: handles client frames one at a time, in order.
//!
//! When the presence registry evicts the connection, the sender task flushes
//! what is queued (ending with `superseded`) and closes the socket.

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade, rejection::WebSocketUpgradeRejection},
    },
    response::{IntoResponse, Response},
};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use murmur_core::{MurmurError, User};
use murmur_relay::{ClientEvent, ConnectionHandle, ServerEvent};

use crate::handlers::ApiError;
use crate::server::GatewayState;

/// How long an evicted socket gets to flush `superseded` and close.
const EVICTION_GRACE: Duration = Duration::from_secs(5);

/// How long a reply waits for space in the caller's own outbox.
const REPLY_WAIT: Duration = Duration::from_secs(2);

#[derive(Debug, Deserialize)]
pub struct WsParams {
    #[serde(default)]
    token: Option<String>,
}

/// WebSocket upgrade handler. Authenticates before upgrading.
pub async fn ws_handler(
    State(state): State<GatewayState>,
    Query(params): Query<WsParams>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let Some(token) = params.token.filter(|t| !t.is_empty()) else {
        return ApiError::unauthenticated("missing token").into_response();
    };
    let user = match state.service.authenticate(&token).await {
        Ok(user) => user,
        Err(MurmurError::Unauthorized(_) | MurmurError::NotFound(_)) => {
            return ApiError::unauthenticated("invalid or expired session").into_response();
        }
        Err(e) => return ApiError::from(e).into_response(),
    };
    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return rejection.into_response(),
    };
    ws.on_upgrade(move |socket| handle_socket(socket, state, user))
}

async fn handle_socket(socket: WebSocket, state: GatewayState, user: User) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (handle, rx) = state.service.presence().connect();
    let closed = handle.closed().clone();
    tracing::debug!(user = %user.id, connection = %handle.id(), "websocket opened");

    let sender_task = tokio::spawn(async move {
        forward_outbox(rx, &mut ws_sender, &closed).await;
        let _ = ws_sender.send(Message::Close(None)).await;
    });

    let closed = handle.closed().clone();
    loop {
        let frame = tokio::select! {
            _ = closed.cancelled() => break,
            frame = ws_receiver.next() => frame,
        };
        match frame {
            Some(Ok(Message::Text(text))) => {
                handle_frame(&state, &user, &handle, text.as_str()).await;
            }
            Some(Ok(Message::Close(_))) | None => break,
            Some(Ok(_)) => {} // binary and ping/pong are ignored
            Some(Err(e)) => {
                tracing::debug!(error = %e, "websocket receive error");
                break;
            }
        }
    }

    state
        .service
        .presence()
        .unregister(&user.id, handle.id());
    finish_sender(sender_task, closed.is_cancelled(), EVICTION_GRACE).await;
    tracing::debug!(user = %user.id, connection = %handle.id(), "websocket closed");
}

/// Stop the sender task. An evicted connection first gets `grace` to flush
/// and close; a peer that stops reading cannot hold the task past that.
///
/// Returns whether the sender finished on its own.
async fn finish_sender(mut task: JoinHandle<()>, evicted: bool, grace: Duration) -> bool {
    if evicted {
        if tokio::time::timeout(grace, &mut task).await.is_ok() {
            return true;
        }
        tracing::debug!("evicted connection did not drain in time, dropping it");
    }
    task.abort();
    false
}

async fn forward_outbox<S>(
    mut rx: mpsc::Receiver<ServerEvent>,
    sink: &mut S,
    closed: &tokio_util::sync::CancellationToken,
) where
    S: futures::Sink<Message> + Unpin,
{
    loop {
        let event = tokio::select! {
            biased;
            event = rx.recv() => match event {
                Some(event) => event,
                None => return,
            },
            _ = closed.cancelled() => {
                while let Ok(event) = rx.try_recv() {
                    if send_event(sink, &event).await.is_err() {
                        return;
                    }
                }
                return;
            }
        };
        if send_event(sink, &event).await.is_err() {
            return;
        }
    }
}

async fn send_event<S>(sink: &mut S, event: &ServerEvent) -> Result<(), ()>
where
    S: futures::Sink<Message> + Unpin,
{
    let json = event.to_json().map_err(|e| {
        tracing::error!(error = %e, "dropping unencodable event");
    })?;
    sink.send(Message::Text(json.into())).await.map_err(|_| ())
}

/// Handle one client frame. Every outcome is reported on this connection.
async fn handle_frame(state: &GatewayState, user: &User, handle: &ConnectionHandle, text: &str) {
    let event = match serde_json::from_str::<ClientEvent>(text) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!("invalid WebSocket frame: {e}");
            let err = MurmurError::Validation(format!("invalid frame: {e}"));
            handle.reply(ServerEvent::error(&err), REPLY_WAIT).await;
            return;
        }
    };

    let reply = match event {
        ClientEvent::Join { username } => state
            .service
            .join(user, &username, handle)
            .await
            .map(|()| ServerEvent::joined(user)),
        ClientEvent::Message { recipient, message } => state
            .service
            .send_message(user, &recipient, &message)
            .await
            .map(|relayed| relayed.event),
    };
    handle
        .reply(reply.unwrap_or_else(|e| ServerEvent::error(&e)), REPLY_WAIT)
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_token_is_optional() {
        let params: WsParams = serde_json::from_str("{}").unwrap();
        assert!(params.token.is_none());
        let params: WsParams = serde_json::from_str(r#"{"token": "abc"}"#).unwrap();
        assert_eq!(params.token.as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn stalled_eviction_flush_is_abandoned() {
        let stalled = tokio::spawn(std::future::pending::<()>());
        let flushed = tokio::time::timeout(
            Duration::from_secs(5),
            finish_sender(stalled, true, Duration::from_millis(20)),
        )
        .await
        .expect("finish_sender must not wait past the grace period");
        assert!(!flushed);
    }

    #[tokio::test]
    async fn prompt_eviction_flush_completes() {
        let done = tokio::spawn(async {});
        assert!(finish_sender(done, true, Duration::from_secs(5)).await);
    }

    #[tokio::test]
    async fn live_disconnect_aborts_sender() {
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let sender = tokio::spawn(async move {
            let _tx = tx;
            std::future::pending::<()>().await;
        });
        assert!(!finish_sender(sender, false, Duration::from_secs(5)).await);
        // The aborted task drops its half of the channel.
        assert!(rx.await.is_err());
    }

    #[tokio::test]
    async fn evicted_outbox_flushes_then_stops() {
        let presence = murmur_relay::PresenceRegistry::new(8);
        let (handle, rx) = presence.connect();
        let closed = handle.closed().clone();
        handle.deliver(ServerEvent::Superseded);
        closed.cancel();

        let (mut sink, mut stream) = futures::channel::mpsc::unbounded::<Message>();
        forward_outbox(rx, &mut sink, &closed).await;
        drop(sink);

        let frames: Vec<Message> = stream.by_ref().collect().await;
        assert_eq!(frames.len(), 1);
        match &frames[0] {
            Message::Text(text) => assert_eq!(text.as_str(), r#"{"type":"superseded"}"#),
            other => panic!("unexpected frame {other:?}"),
        }
    }
}
