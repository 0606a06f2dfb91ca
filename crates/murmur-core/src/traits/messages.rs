// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only message log.

use async_trait::async_trait;

use crate::error::MurmurError;
use crate::types::{Message, UserId};

/// Durable, time-ordered log of direct messages.
///
/// Messages are never mutated or deleted. Authorization is the caller's
/// job; the store only rejects empty content.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist a message and return it with its assigned id and timestamp.
    async fn append(
        &self,
        sender: &UserId,
        recipient: &UserId,
        content: &str,
    ) -> Result<Message, MurmurError>;

    /// All messages exchanged between `a` and `b` in either direction, in
    /// append order. With `limit`, only the most recent `limit` messages are
    /// returned, still oldest first.
    async fn list_between(
        &self,
        a: &UserId,
        b: &UserId,
        limit: Option<u32>,
    ) -> Result<Vec<Message>, MurmurError>;
}
