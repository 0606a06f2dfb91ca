// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat request ledger operations.
//!
//! Every mutation runs inside one transaction on the writer thread. Status
//! changes go through [`RequestStatus::apply`] and are written with a
//! compare-and-set on `status = 'pending'`; the partial unique index on the
//! pair backs the one-open-request-per-pair rule at the schema level.

use std::str::FromStr;

use murmur_core::types::timestamp_now;
use murmur_core::{
    ChatRequest, MurmurError, RequestAction, RequestId, RequestStatus, UserId, UserPair,
};
use rusqlite::types::Type;
use rusqlite::{OptionalExtension, Row, Transaction, params};
use tracing::debug;

use crate::database::{Database, is_constraint_violation, map_tr_err};

const REQUEST_COLUMNS: &str =
    "id, requester_id, recipient_id, status, created_at, resolved_at";

fn request_from_row(row: &Row<'_>) -> rusqlite::Result<ChatRequest> {
    let status: String = row.get(3)?;
    let status = RequestStatus::from_str(&status)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;
    Ok(ChatRequest {
        id: RequestId(row.get(0)?),
        requester_id: UserId(row.get(1)?),
        recipient_id: UserId(row.get(2)?),
        status,
        created_at: row.get(4)?,
        resolved_at: row.get(5)?,
    })
}

/// Whether a rejected requester may ask the same user again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RerequestPolicy {
    Allow,
    Deny,
}

/// Record a new pending request from `requester` to `recipient`.
pub async fn create_request(
    db: &Database,
    requester: &UserId,
    recipient: &UserId,
    policy: RerequestPolicy,
) -> Result<ChatRequest, MurmurError> {
    if requester == recipient {
        return Err(MurmurError::InvalidTarget(
            "cannot send a chat request to yourself".to_string(),
        ));
    }

    let pair = UserPair::new(requester, recipient);
    let requester = requester.clone();
    let recipient = recipient.clone();

    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            for (user, role) in [(&recipient, "recipient"), (&requester, "requester")] {
                let found: bool = tx.query_row(
                    "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)",
                    params![user.as_str()],
                    |row| row.get(0),
                )?;
                if !found {
                    return Ok(Err(MurmurError::NotFound(format!("{role} {user}"))));
                }
            }

            let latest = tx
                .query_row(
                    &format!(
                        "SELECT {REQUEST_COLUMNS} FROM chat_requests
                         WHERE user_lo = ?1 AND user_hi = ?2
                         ORDER BY id DESC LIMIT 1"
                    ),
                    params![pair.lo().as_str(), pair.hi().as_str()],
                    request_from_row,
                )
                .optional()?;

            if let Some(existing) = latest {
                if existing.status.blocks_new_request() {
                    return Ok(Err(MurmurError::AlreadyExists(format!(
                        "a {} chat request already exists for this pair",
                        existing.status
                    ))));
                }
                if policy == RerequestPolicy::Deny && existing.requester_id == requester {
                    return Ok(Err(MurmurError::AlreadyResolved(
                        "your previous chat request was rejected".to_string(),
                    )));
                }
            }

            let created_at = timestamp_now();
            let inserted = tx.execute(
                "INSERT INTO chat_requests
                     (requester_id, recipient_id, user_lo, user_hi, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, 'pending', ?5)",
                params![
                    requester.as_str(),
                    recipient.as_str(),
                    pair.lo().as_str(),
                    pair.hi().as_str(),
                    created_at,
                ],
            );
            match inserted {
                Ok(_) => {}
                Err(e) if is_constraint_violation(&e) => {
                    return Ok(Err(MurmurError::AlreadyExists(
                        "a chat request already exists for this pair".to_string(),
                    )));
                }
                Err(e) => return Err(e),
            }
            let id = RequestId(tx.last_insert_rowid());
            tx.commit()?;

            debug!(request_id = id.0, %requester, %recipient, "chat request created");
            Ok(Ok(ChatRequest {
                id,
                requester_id: requester,
                recipient_id: recipient,
                status: RequestStatus::Pending,
                created_at,
                resolved_at: None,
            }))
        })
        .await
        .map_err(map_tr_err)?
}

/// Pending requests addressed to `user`, oldest first.
pub async fn list_pending(db: &Database, user: &UserId) -> Result<Vec<ChatRequest>, MurmurError> {
    let user = user.0.clone();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {REQUEST_COLUMNS} FROM chat_requests
                 WHERE recipient_id = ?1 AND status = 'pending'
                 ORDER BY created_at ASC, id ASC"
            ))?;
            let rows = stmt.query_map(params![user], request_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Apply `action` to the latest request from `requester` to `recipient`.
pub async fn resolve(
    db: &Database,
    recipient: &UserId,
    requester: &UserId,
    action: RequestAction,
) -> Result<ChatRequest, MurmurError> {
    let recipient = recipient.clone();
    let requester = requester.clone();

    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let Some(latest) = latest_directed(&tx, &requester, &recipient)? else {
                return Ok(Err(MurmurError::NotFound(format!(
                    "no chat request from {requester}"
                ))));
            };

            let next = match latest.status.apply(action) {
                Ok(next) => next,
                Err(e) => return Ok(Err(e)),
            };

            let resolved_at = timestamp_now();
            let changed = tx.execute(
                "UPDATE chat_requests SET status = ?1, resolved_at = ?2
                 WHERE id = ?3 AND status = 'pending'",
                params![next.to_string(), resolved_at, latest.id.0],
            )?;
            if changed == 0 {
                return Ok(Err(MurmurError::AlreadyResolved(
                    "chat request was resolved concurrently".to_string(),
                )));
            }
            tx.commit()?;

            debug!(request_id = latest.id.0, status = %next, "chat request resolved");
            Ok(Ok(ChatRequest {
                status: next,
                resolved_at: Some(resolved_at),
                ..latest
            }))
        })
        .await
        .map_err(map_tr_err)?
}

fn latest_directed(
    tx: &Transaction<'_>,
    requester: &UserId,
    recipient: &UserId,
) -> rusqlite::Result<Option<ChatRequest>> {
    tx.query_row(
        &format!(
            "SELECT {REQUEST_COLUMNS} FROM chat_requests
             WHERE requester_id = ?1 AND recipient_id = ?2
             ORDER BY id DESC LIMIT 1"
        ),
        params![requester.as_str(), recipient.as_str()],
        request_from_row,
    )
    .optional()
}

/// True iff an accepted request exists for the unordered pair.
pub async fn is_authorized(db: &Database, a: &UserId, b: &UserId) -> Result<bool, MurmurError> {
    if a == b {
        return Ok(false);
    }
    let pair = UserPair::new(a, b);
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM chat_requests
                 WHERE user_lo = ?1 AND user_hi = ?2 AND status = 'accepted')",
                params![pair.lo().as_str(), pair.hi().as_str()],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Peers sharing an accepted request with `user`, in acceptance order.
pub async fn list_accepted_peers(db: &Database, user: &UserId) -> Result<Vec<UserId>, MurmurError> {
    let user = user.0.clone();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT CASE WHEN user_lo = ?1 THEN user_hi ELSE user_lo END
                 FROM chat_requests
                 WHERE (user_lo = ?1 OR user_hi = ?1) AND status = 'accepted'
                 ORDER BY resolved_at ASC, id ASC",
            )?;
            let rows = stmt.query_map(params![user], |row| row.get(0).map(UserId))?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
