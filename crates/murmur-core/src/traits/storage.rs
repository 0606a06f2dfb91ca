// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage lifecycle trait.

use async_trait::async_trait;

use crate::error::MurmurError;
use crate::traits::adapter::PluginAdapter;

/// Lifecycle of a persistence backend.
///
/// The data-access contracts live in their own traits
/// ([`IdentityDirectory`](crate::IdentityDirectory),
/// [`RequestLedger`](crate::RequestLedger),
/// [`MessageStore`](crate::MessageStore),
/// [`AccountStore`](crate::AccountStore)); this trait only opens and closes
/// the backend.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (migrations, connection, PRAGMAs).
    async fn initialize(&self) -> Result<(), MurmurError>;

    /// Closes the storage backend, flushing pending writes.
    async fn close(&self) -> Result<(), MurmurError>;
}
