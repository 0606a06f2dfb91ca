// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bearer-token authentication for the HTTP API.
//!
//! Tokens are login session tokens issued by `POST /auth/login`. A valid
//! token resolves to an [`AuthenticatedUser`] request extension; anything
//! else is rejected with 401 before the handler runs.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use murmur_core::{MurmurError, User};

use crate::handlers::ApiError;
use crate::server::GatewayState;

/// The caller behind a request, inserted by [`auth_middleware`].
#[derive(Clone)]
pub struct AuthenticatedUser {
    pub user: User,
    pub token: String,
}

impl std::fmt::Debug for AuthenticatedUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatedUser")
            .field("user", &self.user.id)
            .field("token", &"[redacted]")
            .finish()
    }
}

/// Token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

pub async fn auth_middleware(
    State(state): State<GatewayState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(token) = bearer_token(request.headers()).map(str::to_string) else {
        return Err(ApiError::unauthenticated("missing bearer token"));
    };

    let user = match state.service.authenticate(&token).await {
        Ok(user) => user,
        Err(MurmurError::Unauthorized(_) | MurmurError::NotFound(_)) => {
            tracing::debug!("rejected request with invalid session token");
            return Err(ApiError::unauthenticated("invalid or expired session"));
        }
        Err(e) => return Err(e.into()),
    };

    request
        .extensions_mut()
        .insert(AuthenticatedUser { user, token });
    Ok(next.run(request).await)
}
