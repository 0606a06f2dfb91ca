// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the storage contracts.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use murmur_config::model::{LedgerConfig, StorageConfig};
use murmur_core::types::{AuthSession, Credentials, NewAccount};
use murmur_core::{
    AccountStore, ChatRequest, HealthStatus, IdentityDirectory, Message, MessageStore,
    MurmurError, PluginAdapter, RequestAction, RequestLedger, StorageAdapter, User, UserId,
};

use crate::database::{Database, map_tr_err};
use crate::queries;
use crate::queries::requests::RerequestPolicy;

/// SQLite-backed storage adapter.
///
/// One instance serves every data-access trait. The database is opened
/// lazily by [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    rerequest: RerequestPolicy,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    pub fn new(config: StorageConfig, ledger: &LedgerConfig) -> Self {
        let rerequest = if ledger.allow_rerequest {
            RerequestPolicy::Allow
        } else {
            RerequestPolicy::Deny
        };
        Self {
            config,
            rerequest,
            db: OnceCell::new(),
        }
    }

    fn db(&self) -> Result<&Database, MurmurError> {
        self.db.get().ok_or_else(|| MurmurError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    async fn health_check(&self) -> Result<HealthStatus, MurmurError> {
        let Some(db) = self.db.get() else {
            return Ok(HealthStatus::Unhealthy("not initialized".to_string()));
        };
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.query_row("SELECT 1", [], |_| Ok(()))?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MurmurError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), MurmurError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| MurmurError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), MurmurError> {
        self.db()?.checkpoint().await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

#[async_trait]
impl IdentityDirectory for SqliteStorage {
    async fn resolve(&self, username: &str) -> Result<UserId, MurmurError> {
        queries::users::get_by_username(self.db()?, username)
            .await?
            .map(|user| user.id)
            .ok_or_else(|| MurmurError::NotFound(format!("user {username}")))
    }

    async fn exists(&self, user_id: &UserId) -> Result<bool, MurmurError> {
        queries::users::exists(self.db()?, user_id).await
    }

    async fn get_user(&self, user_id: &UserId) -> Result<User, MurmurError> {
        queries::users::get_by_id(self.db()?, user_id)
            .await?
            .ok_or_else(|| MurmurError::NotFound(format!("user {user_id}")))
    }
}

#[async_trait]
impl RequestLedger for SqliteStorage {
    async fn create_request(
        &self,
        requester: &UserId,
        recipient: &UserId,
    ) -> Result<ChatRequest, MurmurError> {
        queries::requests::create_request(self.db()?, requester, recipient, self.rerequest).await
    }

    async fn list_pending(&self, user: &UserId) -> Result<Vec<ChatRequest>, MurmurError> {
        queries::requests::list_pending(self.db()?, user).await
    }

    async fn accept(
        &self,
        recipient: &UserId,
        requester: &UserId,
    ) -> Result<ChatRequest, MurmurError> {
        queries::requests::resolve(self.db()?, recipient, requester, RequestAction::Accept).await
    }

    async fn reject(
        &self,
        recipient: &UserId,
        requester: &UserId,
    ) -> Result<ChatRequest, MurmurError> {
        queries::requests::resolve(self.db()?, recipient, requester, RequestAction::Reject).await
    }

    async fn is_authorized(&self, a: &UserId, b: &UserId) -> Result<bool, MurmurError> {
        queries::requests::is_authorized(self.db()?, a, b).await
    }

    async fn list_accepted_peers(&self, user: &UserId) -> Result<Vec<UserId>, MurmurError> {
        queries::requests::list_accepted_peers(self.db()?, user).await
    }
}

#[async_trait]
impl MessageStore for SqliteStorage {
    async fn append(
        &self,
        sender: &UserId,
        recipient: &UserId,
        content: &str,
    ) -> Result<Message, MurmurError> {
        queries::messages::append(self.db()?, sender, recipient, content).await
    }

    async fn list_between(
        &self,
        a: &UserId,
        b: &UserId,
        limit: Option<u32>,
    ) -> Result<Vec<Message>, MurmurError> {
        queries::messages::list_between(self.db()?, a, b, limit).await
    }
}

#[async_trait]
impl AccountStore for SqliteStorage {
    async fn create_account(&self, account: NewAccount) -> Result<User, MurmurError> {
        queries::users::create_account(self.db()?, account).await
    }

    async fn find_credentials(&self, username: &str) -> Result<Option<Credentials>, MurmurError> {
        queries::users::find_credentials(self.db()?, username).await
    }

    async fn create_session(&self, session: &AuthSession) -> Result<(), MurmurError> {
        queries::sessions::create_session(self.db()?, session).await
    }

    async fn session_user(&self, token: &str) -> Result<Option<UserId>, MurmurError> {
        queries::sessions::session_user(self.db()?, token).await
    }

    async fn delete_session(&self, token: &str) -> Result<bool, MurmurError> {
        queries::sessions::delete_session(self.db()?, token).await
    }

    async fn purge_expired_sessions(&self) -> Result<usize, MurmurError> {
        queries::sessions::purge_expired(self.db()?).await
    }
}
