// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User account queries backing the identity directory.

use murmur_core::types::{Credentials, NewAccount, timestamp_now};
use murmur_core::{MurmurError, User, UserId};
use rusqlite::{OptionalExtension, Row, params};

use crate::database::{Database, map_tr_err};

const USER_COLUMNS: &str = "id, username, created_at";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: UserId(row.get(0)?),
        username: row.get(1)?,
        created_at: row.get(2)?,
    })
}

/// Insert a new user. Fails with `AlreadyExists` if the username or email is taken.
pub async fn create_account(db: &Database, account: NewAccount) -> Result<User, MurmurError> {
    let user = User {
        id: UserId::generate(),
        username: account.username,
        created_at: timestamp_now(),
    };
    let email = account.email;
    let password_hash = account.password_hash;

    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let taken: Option<String> = tx
                .query_row(
                    "SELECT CASE WHEN username = ?1 THEN 'username' ELSE 'email' END
                     FROM users WHERE username = ?1 OR email = ?2 LIMIT 1",
                    params![user.username, email],
                    |row| row.get(0),
                )
                .optional()?;
            if let Some(field) = taken {
                return Ok(Err(MurmurError::AlreadyExists(format!(
                    "{field} is already taken"
                ))));
            }

            tx.execute(
                "INSERT INTO users (id, username, email, password_hash, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    user.id.as_str(),
                    user.username,
                    email,
                    password_hash,
                    user.created_at
                ],
            )?;
            tx.commit()?;
            Ok(Ok(user))
        })
        .await
        .map_err(map_tr_err)?
}

/// Look up a user by exact username.
pub async fn get_by_username(db: &Database, username: &str) -> Result<Option<User>, MurmurError> {
    let username = username.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
                params![username],
                user_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Look up a user by id.
pub async fn get_by_id(db: &Database, id: &UserId) -> Result<Option<User>, MurmurError> {
    let id = id.0.clone();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id],
                user_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Whether a user with this id exists.
pub async fn exists(db: &Database, id: &UserId) -> Result<bool, MurmurError> {
    let id = id.0.clone();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)",
                params![id],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Stored credentials for the login path.
pub async fn find_credentials(
    db: &Database,
    username: &str,
) -> Result<Option<Credentials>, MurmurError> {
    let username = username.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {USER_COLUMNS}, password_hash FROM users WHERE username = ?1"),
                params![username],
                |row| {
                    Ok(Credentials {
                        user: user_from_row(row)?,
                        password_hash: row.get(3)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}
