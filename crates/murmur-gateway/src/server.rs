// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use murmur_config::model::ServerConfig;
use murmur_core::MurmurError;
use murmur_relay::ChatService;

use crate::auth::auth_middleware;
use crate::handlers;
use crate::ws;

/// Largest accepted JSON request body.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub service: Arc<ChatService>,
    /// Process start time for uptime calculation.
    pub start_time: Instant,
}

impl GatewayState {
    pub fn new(service: Arc<ChatService>) -> Self {
        Self {
            service,
            start_time: Instant::now(),
        }
    }
}

/// Build the full application router.
///
/// - Public: `GET /health`, `POST /auth/signup`, `POST /auth/login`
/// - Bearer-authenticated: logout and every chat operation
/// - `GET /ws`: authenticated by `?token=` during the handshake
pub fn build_router(state: GatewayState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/auth/signup", post(handlers::signup))
        .route("/auth/login", post(handlers::login))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/auth/logout", post(handlers::logout))
        .route("/search_user", post(handlers::search_user))
        .route("/send_chat_request", post(handlers::send_chat_request))
        .route("/get_chat_requests", get(handlers::get_chat_requests))
        .route("/accept_chat_request", post(handlers::accept_chat_request))
        .route("/reject_chat_request", post(handlers::reject_chat_request))
        .route("/get_accepted_chats", get(handlers::get_accepted_chats))
        .route("/get_messages", post(handlers::get_messages))
        .route("/send_message", post(handlers::send_message))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state.clone());

    let ws_routes = Router::new()
        .route("/ws", get(ws::ws_handler))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .merge(ws_routes)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind and serve until `cancel` fires.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    cancel: CancellationToken,
) -> Result<(), MurmurError> {
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| MurmurError::Channel {
            message: format!("failed to bind gateway to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("Gateway server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(|e| MurmurError::Channel {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("Gateway server stopped");
    Ok(())
}
