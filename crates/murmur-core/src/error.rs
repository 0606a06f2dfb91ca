// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Murmur messaging server.

use thiserror::Error;

/// The primary error type shared by every Murmur component.
///
/// The first group of variants are domain outcomes that are reported to the
/// caller verbatim. The remaining variants wrap infrastructure failures.
#[derive(Debug, Error)]
pub enum MurmurError {
    /// A user, request, or session does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A pending or accepted chat request already exists for the pair, or a
    /// username/email is already taken.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The chat request was already accepted or rejected.
    #[error("already resolved: {0}")]
    AlreadyResolved(String),

    /// The caller is not allowed to perform this operation.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// A user targeted themselves.
    #[error("invalid target: {0}")]
    InvalidTarget(String),

    /// Message content is empty after trimming whitespace.
    #[error("message content is empty")]
    ContentEmpty,

    /// Message content exceeds the configured byte limit.
    #[error("message content is {len} bytes, limit is {max}")]
    ContentTooLong { len: usize, max: usize },

    /// Username or password did not match.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// Malformed caller input (username syntax, email shape, password length).
    #[error("invalid input: {0}")]
    Validation(String),

    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, migrations).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Transport errors (socket bind failure, server crash).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl MurmurError {
    /// Stable machine-readable code, used in HTTP bodies and WebSocket error frames.
    pub fn code(&self) -> &'static str {
        match self {
            MurmurError::NotFound(_) => "not_found",
            MurmurError::AlreadyExists(_) => "already_exists",
            MurmurError::AlreadyResolved(_) => "already_resolved",
            MurmurError::Unauthorized(_) => "unauthorized",
            MurmurError::InvalidTarget(_) => "invalid_target",
            MurmurError::ContentEmpty => "content_empty",
            MurmurError::ContentTooLong { .. } => "content_too_long",
            MurmurError::InvalidCredentials => "invalid_credentials",
            MurmurError::Validation(_) => "invalid_input",
            MurmurError::Config(_) => "config_error",
            MurmurError::Storage { .. } => "storage_error",
            MurmurError::Channel { .. } => "channel_error",
            MurmurError::Internal(_) => "internal_error",
        }
    }

    /// True for outcomes caused by the caller rather than by the server.
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            MurmurError::Config(_)
                | MurmurError::Storage { .. }
                | MurmurError::Channel { .. }
                | MurmurError::Internal(_)
        )
    }
}
