// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Account provisioning and login sessions.

use async_trait::async_trait;

use crate::error::MurmurError;
use crate::types::{AuthSession, Credentials, NewAccount, User, UserId};

/// Persistence for accounts and bearer sessions.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Create a user. `AlreadyExists` if the username or email is taken.
    async fn create_account(&self, account: NewAccount) -> Result<User, MurmurError>;

    /// Look up stored credentials by exact username.
    async fn find_credentials(&self, username: &str) -> Result<Option<Credentials>, MurmurError>;

    /// Persist a new session.
    async fn create_session(&self, session: &AuthSession) -> Result<(), MurmurError>;

    /// The user owning an unexpired session token, if any.
    async fn session_user(&self, token: &str) -> Result<Option<UserId>, MurmurError>;

    /// Delete a session. Returns whether a row was removed.
    async fn delete_session(&self, token: &str) -> Result<bool, MurmurError>;

    /// Delete every expired session, returning how many were removed.
    async fn purge_expired_sessions(&self) -> Result<usize, MurmurError>;
}
