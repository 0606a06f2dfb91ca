// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Login session CRUD operations.

use murmur_core::types::{AuthSession, timestamp_now};
use murmur_core::{MurmurError, UserId};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};

/// Create a new session.
pub async fn create_session(db: &Database, session: &AuthSession) -> Result<(), MurmurError> {
    let session = session.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO auth_sessions (token, user_id, created_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    session.token,
                    session.user_id.as_str(),
                    session.created_at,
                    session.expires_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// The owner of `token` if the session exists and has not expired.
pub async fn session_user(db: &Database, token: &str) -> Result<Option<UserId>, MurmurError> {
    let token = token.to_string();
    let now = timestamp_now();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT user_id FROM auth_sessions WHERE token = ?1 AND expires_at > ?2",
                params![token, now],
                |row| row.get(0).map(UserId),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Delete a session by token.
pub async fn delete_session(db: &Database, token: &str) -> Result<bool, MurmurError> {
    let token = token.to_string();
    db.connection()
        .call(move |conn| {
            let removed = conn.execute(
                "DELETE FROM auth_sessions WHERE token = ?1",
                params![token],
            )?;
            Ok(removed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Delete all sessions whose expiry is in the past.
pub async fn purge_expired(db: &Database) -> Result<usize, MurmurError> {
    let now = timestamp_now();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "DELETE FROM auth_sessions WHERE expires_at <= ?1",
                params![now],
            )
        })
        .await
        .map_err(map_tr_err)
}
