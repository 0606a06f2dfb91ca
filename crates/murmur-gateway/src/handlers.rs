// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the REST API.
//!
//! Consent operations answer with a logical `{"status": ...}` body; other
//! failures map [`MurmurError`] to an HTTP status and a JSON error body.

use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use murmur_core::{HealthStatus, MurmurError, UserId};
use murmur_relay::{ChatPeer, HistoryEntry, PendingRequest};

use crate::auth::AuthenticatedUser;
use crate::server::GatewayState;

/// Error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// A [`MurmurError`] rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: MurmurError,
}

impl ApiError {
    /// 401 for a missing or unusable session token.
    pub fn unauthenticated(message: &str) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            error: MurmurError::Unauthorized(message.to_string()),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

fn status_for(error: &MurmurError) -> StatusCode {
    match error {
        MurmurError::NotFound(_) => StatusCode::NOT_FOUND,
        MurmurError::AlreadyExists(_) | MurmurError::AlreadyResolved(_) => StatusCode::CONFLICT,
        MurmurError::Unauthorized(_) => StatusCode::FORBIDDEN,
        MurmurError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        MurmurError::InvalidTarget(_) | MurmurError::ContentEmpty | MurmurError::Validation(_) => {
            StatusCode::BAD_REQUEST
        }
        MurmurError::ContentTooLong { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        MurmurError::Config(_)
        | MurmurError::Storage { .. }
        | MurmurError::Channel { .. }
        | MurmurError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<MurmurError> for ApiError {
    fn from(error: MurmurError) -> Self {
        Self {
            status: status_for(&error),
            error,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = if self.status.is_server_error() {
            tracing::error!(error = %self.error, "request failed");
            "internal server error".to_string()
        } else {
            self.error.to_string()
        };
        let body = ErrorResponse {
            error: message,
            code: self.error.code().to_string(),
        };
        (self.status, Json(body)).into_response()
    }
}

/// Body of status-returning consent operations.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

fn status_reply(status: StatusCode, label: &str) -> Response {
    (
        status,
        Json(StatusResponse {
            status: label.to_string(),
        }),
    )
        .into_response()
}

/// Map the expected ledger outcomes to status bodies; anything else is an error.
fn ledger_reply(result: Result<(StatusCode, &str), MurmurError>) -> Response {
    match result {
        Ok((status, label)) => status_reply(status, label),
        Err(e @ (MurmurError::NotFound(_)
        | MurmurError::AlreadyExists(_)
        | MurmurError::AlreadyResolved(_)
        | MurmurError::InvalidTarget(_))) => status_reply(status_for(&e), e.code()),
        Err(e) => ApiError::from(e).into_response(),
    }
}

// --- Accounts ---

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub user_id: UserId,
    pub username: String,
}

/// POST /auth/signup
pub async fn signup(
    State(state): State<GatewayState>,
    Json(body): Json<SignupRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let user = state
        .service
        .signup(&body.username, &body.email, &body.password)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            user_id: user.id,
            username: user.username,
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user_id: UserId,
    pub username: String,
    pub expires_at: String,
}

/// POST /auth/login
pub async fn login(
    State(state): State<GatewayState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let session = state.service.login(&body.username, &body.password).await?;
    Ok(Json(LoginResponse {
        token: session.token,
        user_id: session.user_id,
        username: body.username,
        expires_at: session.expires_at,
    }))
}

/// POST /auth/logout
pub async fn logout(
    State(state): State<GatewayState>,
    Extension(caller): Extension<AuthenticatedUser>,
) -> Result<Json<StatusResponse>, ApiError> {
    state.service.logout(&caller.token).await?;
    Ok(Json(StatusResponse {
        status: "logged_out".to_string(),
    }))
}

// --- Directory and consent ---

#[derive(Debug, Deserialize)]
pub struct SearchUserRequest {
    pub username: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchUserResponse {
    pub found: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// POST /search_user
pub async fn search_user(
    State(state): State<GatewayState>,
    Json(body): Json<SearchUserRequest>,
) -> Result<Json<SearchUserResponse>, ApiError> {
    let found = state.service.search_user(&body.username).await?;
    Ok(Json(match found {
        Some(user) => SearchUserResponse {
            found: true,
            user_id: Some(user.id),
            username: Some(user.username),
        },
        None => SearchUserResponse {
            found: false,
            user_id: None,
            username: None,
        },
    }))
}

#[derive(Debug, Deserialize)]
pub struct ChatRequestBody {
    pub user_id: UserId,
}

/// POST /send_chat_request
pub async fn send_chat_request(
    State(state): State<GatewayState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Json(body): Json<ChatRequestBody>,
) -> Response {
    let result = state
        .service
        .send_chat_request(&caller.user, &body.user_id)
        .await
        .map(|_| (StatusCode::CREATED, "created"));
    ledger_reply(result)
}

#[derive(Debug, Serialize)]
pub struct ChatRequestsResponse {
    pub requests: Vec<PendingRequest>,
}

/// GET /get_chat_requests
pub async fn get_chat_requests(
    State(state): State<GatewayState>,
    Extension(caller): Extension<AuthenticatedUser>,
) -> Result<Json<ChatRequestsResponse>, ApiError> {
    let pending = state.service.get_chat_requests(&caller.user).await?;
    Ok(Json(ChatRequestsResponse {
        requests: pending,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ResolveRequestBody {
    pub sender_id: UserId,
}

/// POST /accept_chat_request
pub async fn accept_chat_request(
    State(state): State<GatewayState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Json(body): Json<ResolveRequestBody>,
) -> Response {
    let result = state
        .service
        .accept_chat_request(&caller.user, &body.sender_id)
        .await
        .map(|_| (StatusCode::OK, "accepted"));
    ledger_reply(result)
}

/// POST /reject_chat_request
pub async fn reject_chat_request(
    State(state): State<GatewayState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Json(body): Json<ResolveRequestBody>,
) -> Response {
    let result = state
        .service
        .reject_chat_request(&caller.user, &body.sender_id)
        .await
        .map(|_| (StatusCode::OK, "rejected"));
    ledger_reply(result)
}

#[derive(Debug, Serialize)]
pub struct AcceptedChatsResponse {
    pub chats: Vec<ChatPeer>,
}

/// GET /get_accepted_chats
pub async fn get_accepted_chats(
    State(state): State<GatewayState>,
    Extension(caller): Extension<AuthenticatedUser>,
) -> Result<Json<AcceptedChatsResponse>, ApiError> {
    let chats = state.service.get_accepted_chats(&caller.user).await?;
    Ok(Json(AcceptedChatsResponse { chats }))
}

// --- Messages ---

#[derive(Debug, Deserialize)]
pub struct GetMessagesRequest {
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub messages: Vec<HistoryEntry>,
}

/// POST /get_messages
pub async fn get_messages(
    State(state): State<GatewayState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Json(body): Json<GetMessagesRequest>,
) -> Result<Json<MessagesResponse>, ApiError> {
    let messages = state
        .service
        .get_messages(&caller.user, &body.username)
        .await?;
    Ok(Json(MessagesResponse { messages }))
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub recipient: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SendMessageResponse {
    pub id: i64,
    pub created_at: String,
    pub delivered: bool,
}

/// POST /send_message
///
/// Same path as a WebSocket `message` frame; the sender's live connection,
/// if any, receives the echo.
pub async fn send_message(
    State(state): State<GatewayState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Json(body): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<SendMessageResponse>), ApiError> {
    let relayed = state
        .service
        .send_message(&caller.user, &body.recipient, &body.message)
        .await?;
    state
        .service
        .presence()
        .route_event(&caller.user.id, relayed.event.clone());
    Ok((
        StatusCode::CREATED,
        Json(SendMessageResponse {
            id: relayed.message.id.0,
            created_at: relayed.message.created_at,
            delivered: relayed.delivery == murmur_relay::Delivery::Delivered,
        }),
    ))
}

// --- Health ---

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub version: String,
    pub uptime_secs: u64,
    pub online_users: usize,
}

/// GET /health
///
/// 200 while storage answers, 503 otherwise.
pub async fn health(State(state): State<GatewayState>) -> (StatusCode, Json<HealthResponse>) {
    let (code, status, detail) = match state.service.health().await {
        HealthStatus::Healthy => (StatusCode::OK, "ok", None),
        HealthStatus::Degraded(reason) => (StatusCode::OK, "degraded", Some(reason)),
        HealthStatus::Unhealthy(reason) => {
            tracing::warn!(reason = %reason, "health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "unhealthy", Some(reason))
        }
    };
    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            detail,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs: state.start_time.elapsed().as_secs(),
            online_users: state.service.presence().online_count(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_statuses() {
        assert_eq!(
            status_for(&MurmurError::NotFound("x".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&MurmurError::AlreadyResolved("x".into())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(&MurmurError::Unauthorized("x".into())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_for(&MurmurError::InvalidCredentials),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_for(&MurmurError::Internal("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn unauthenticated_is_401() {
        assert_eq!(
            ApiError::unauthenticated("nope").status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn ledger_outcomes_become_status_bodies() {
        let resp = ledger_reply(Err(MurmurError::AlreadyExists("dup".into())));
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let resp = ledger_reply(Err(MurmurError::InvalidTarget("self".into())));
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let resp = ledger_reply(Ok((StatusCode::CREATED, "created")));
        assert_eq!(resp.status(), StatusCode::CREATED);
        let resp = ledger_reply(Err(MurmurError::Internal("boom".into())));
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn search_miss_omits_user_fields() {
        let json = serde_json::to_string(&SearchUserResponse {
            found: false,
            user_id: None,
            username: None,
        })
        .unwrap();
        assert_eq!(json, r#"{"found":false}"#);
    }
}
