// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat request ledger: the durable consent state machine.

use async_trait::async_trait;

use crate::error::MurmurError;
use crate::types::{ChatRequest, UserId};

/// Durable record of chat requests between user pairs.
///
/// At most one request per unordered pair may be pending or accepted at a
/// time. Status changes follow [`RequestStatus::apply`](crate::types::RequestStatus::apply)
/// and are applied atomically, so of two racing decisions exactly one wins.
#[async_trait]
pub trait RequestLedger: Send + Sync {
    /// Record a new pending request from `requester` to `recipient`.
    ///
    /// Fails with `InvalidTarget` for self-requests, `NotFound` for an
    /// unknown recipient, and `AlreadyExists` when the pair already has a
    /// pending or accepted request.
    async fn create_request(
        &self,
        requester: &UserId,
        recipient: &UserId,
    ) -> Result<ChatRequest, MurmurError>;

    /// Pending requests addressed to `user`, oldest first.
    async fn list_pending(&self, user: &UserId) -> Result<Vec<ChatRequest>, MurmurError>;

    /// Accept the latest request from `requester` to `recipient`.
    async fn accept(
        &self,
        recipient: &UserId,
        requester: &UserId,
    ) -> Result<ChatRequest, MurmurError>;

    /// Reject the latest request from `requester` to `recipient`.
    async fn reject(
        &self,
        recipient: &UserId,
        requester: &UserId,
    ) -> Result<ChatRequest, MurmurError>;

    /// True iff an accepted request exists for the unordered pair `{a, b}`.
    async fn is_authorized(&self, a: &UserId, b: &UserId) -> Result<bool, MurmurError>;

    /// Users that share an accepted request with `user`.
    async fn list_accepted_peers(&self, user: &UserId) -> Result<Vec<UserId>, MurmurError>;
}
