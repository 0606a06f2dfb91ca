// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only direct message log.

use murmur_core::types::timestamp_now;
use murmur_core::{Message, MessageId, MurmurError, UserId, UserPair};
use rusqlite::{Row, params};

use crate::database::{Database, map_tr_err};

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: MessageId(row.get(0)?),
        sender_id: UserId(row.get(1)?),
        recipient_id: UserId(row.get(2)?),
        content: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// Append a message. The id and timestamp are assigned on the writer thread,
/// so ids increase in commit order.
pub async fn append(
    db: &Database,
    sender: &UserId,
    recipient: &UserId,
    content: &str,
) -> Result<Message, MurmurError> {
    if content.trim().is_empty() {
        return Err(MurmurError::ContentEmpty);
    }
    let pair = UserPair::new(sender, recipient);
    let sender = sender.clone();
    let recipient = recipient.clone();
    let content = content.to_string();

    db.connection()
        .call(move |conn| -> Result<Message, rusqlite::Error> {
            let created_at = timestamp_now();
            conn.execute(
                "INSERT INTO messages
                     (sender_id, recipient_id, user_lo, user_hi, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    sender.as_str(),
                    recipient.as_str(),
                    pair.lo().as_str(),
                    pair.hi().as_str(),
                    content,
                    created_at,
                ],
            )?;
            Ok(Message {
                id: MessageId(conn.last_insert_rowid()),
                sender_id: sender,
                recipient_id: recipient,
                content,
                created_at,
            })
        })
        .await
        .map_err(map_tr_err)
}

/// Messages between `a` and `b` in either direction, oldest first.
///
/// With `limit`, only the newest `limit` rows are returned (still ascending).
pub async fn list_between(
    db: &Database,
    a: &UserId,
    b: &UserId,
    limit: Option<u32>,
) -> Result<Vec<Message>, MurmurError> {
    let pair = UserPair::new(a, b);
    db.connection()
        .call(move |conn| -> Result<Vec<Message>, rusqlite::Error> {
            let lo = pair.lo().as_str();
            let hi = pair.hi().as_str();
            match limit {
                Some(limit) => {
                    let mut stmt = conn.prepare(
                        "SELECT id, sender_id, recipient_id, content, created_at FROM (
                             SELECT id, sender_id, recipient_id, content, created_at
                             FROM messages WHERE user_lo = ?1 AND user_hi = ?2
                             ORDER BY id DESC LIMIT ?3
                         ) ORDER BY id ASC",
                    )?;
                    let rows = stmt.query_map(params![lo, hi, limit], message_from_row)?;
                    rows.collect()
                }
                None => {
                    let mut stmt = conn.prepare(
                        "SELECT id, sender_id, recipient_id, content, created_at
                         FROM messages WHERE user_lo = ?1 AND user_hi = ?2
                         ORDER BY id ASC",
                    )?;
                    let rows = stmt.query_map(params![lo, hi], message_from_row)?;
                    rows.collect()
                }
            }
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::users::create_account;
    use murmur_core::types::NewAccount;
    use tempfile::tempdir;

    async fn setup() -> (Database, UserId, UserId, UserId, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("msg.db").to_str().unwrap())
            .await
            .unwrap();
        let mut ids = Vec::new();
        for name in ["alice", "bob", "carol"] {
            let user = create_account(
                &db,
                NewAccount {
                    username: name.to_string(),
                    email: format!("{name}@example.com"),
                    password_hash: "hash".to_string(),
                },
            )
            .await
            .unwrap();
            ids.push(user.id);
        }
        (db, ids[0].clone(), ids[1].clone(), ids[2].clone(), dir)
    }

    #[tokio::test]
    async fn conversation_is_symmetric_and_ordered() {
        let (db, alice, bob, carol, _dir) = setup().await;
        let m1 = append(&db, &alice, &bob, "hi bob").await.unwrap();
        let m2 = append(&db, &bob, &alice, "hi alice").await.unwrap();
        append(&db, &alice, &carol, "unrelated").await.unwrap();
        let m3 = append(&db, &alice, &bob, "how are you?").await.unwrap();
        assert!(m1.id < m2.id && m2.id < m3.id);

        let from_alice = list_between(&db, &alice, &bob, None).await.unwrap();
        let from_bob = list_between(&db, &bob, &alice, None).await.unwrap();
        assert_eq!(from_alice, from_bob);
        assert_eq!(
            from_alice.iter().map(|m| m.id).collect::<Vec<_>>(),
            vec![m1.id, m2.id, m3.id]
        );
        assert_eq!(from_alice[1].sender_id, bob);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn limit_keeps_newest_in_ascending_order() {
        let (db, alice, bob, _carol, _dir) = setup().await;
        for i in 0..5 {
            append(&db, &alice, &bob, &format!("msg {i}")).await.unwrap();
        }
        let tail = list_between(&db, &alice, &bob, Some(2)).await.unwrap();
        let contents: Vec<_> = tail.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["msg 3", "msg 4"]);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn blank_content_is_rejected() {
        let (db, alice, bob, _carol, _dir) = setup().await;
        let err = append(&db, &alice, &bob, "  \n\t ").await.unwrap_err();
        assert!(matches!(err, MurmurError::ContentEmpty));
        assert!(list_between(&db, &alice, &bob, None).await.unwrap().is_empty());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn empty_conversation_returns_empty_list() {
        let (db, alice, bob, _carol, _dir) = setup().await;
        assert!(list_between(&db, &alice, &bob, None).await.unwrap().is_empty());
        assert!(list_between(&db, &alice, &bob, Some(10)).await.unwrap().is_empty());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_appends_get_distinct_increasing_ids() {
        let (db, alice, bob, _carol, _dir) = setup().await;
        let sends = (0..20).map(|i| {
            let (from, to) = if i % 2 == 0 { (&alice, &bob) } else { (&bob, &alice) };
            append(&db, from, to, "ping")
        });
        let results = futures::future::join_all(sends).await;
        let mut ids: Vec<_> = results.into_iter().map(|r| r.unwrap().id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 20);

        let log = list_between(&db, &alice, &bob, None).await.unwrap();
        assert_eq!(log.len(), 20);
        assert!(log.windows(2).all(|w| w[0].id < w[1].id));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn messages_are_immutable() {
        let (db, alice, bob, _carol, _dir) = setup().await;
        append(&db, &alice, &bob, "original").await.unwrap();
        let updated = db
            .connection()
            .call(|conn| conn.execute("UPDATE messages SET content = 'edited'", []))
            .await
            .map_err(map_tr_err);
        assert!(updated.is_err());
        let deleted = db
            .connection()
            .call(|conn| conn.execute("DELETE FROM messages", []))
            .await
            .map_err(map_tr_err);
        assert!(deleted.is_err());
        db.close().await.unwrap();
    }
}
