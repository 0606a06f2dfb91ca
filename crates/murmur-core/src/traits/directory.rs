// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identity directory: username and user id lookups.

use async_trait::async_trait;

use crate::error::MurmurError;
use crate::types::{User, UserId};

/// Read-only view of provisioned users.
///
/// Lookups are exact-match only, so a miss never reveals near-matches.
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    /// Resolve a username to its user id, or [`MurmurError::NotFound`].
    async fn resolve(&self, username: &str) -> Result<UserId, MurmurError>;

    /// Whether a user with this id exists.
    async fn exists(&self, user_id: &UserId) -> Result<bool, MurmurError>;

    /// Fetch a user by id, or [`MurmurError::NotFound`].
    async fn get_user(&self, user_id: &UserId) -> Result<User, MurmurError>;
}
