// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles the full server stack (temp SQLite database,
//! presence registry, chat service, router) and offers shortcuts for the
//! setup steps most tests repeat: creating users, logging in, and
//! establishing accepted chat requests.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio_util::sync::CancellationToken;

use murmur_config::model::MurmurConfig;
use murmur_core::{MurmurError, StorageAdapter, User};
use murmur_gateway::{GatewayState, build_router};
use murmur_relay::accounts::PasswordHashing;
use murmur_relay::{ChatService, PresenceRegistry};
use murmur_storage::SqliteStorage;

/// Password given to every user created through the harness.
pub const TEST_PASSWORD: &str = "correct-horse-battery";

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    config: MurmurConfig,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            config: MurmurConfig::default(),
        }
    }

    /// Whether a rejected requester may ask again.
    pub fn with_allow_rerequest(mut self, allow: bool) -> Self {
        self.config.ledger.allow_rerequest = allow;
        self
    }

    pub fn with_history_limit(mut self, limit: u32) -> Self {
        self.config.relay.history_limit = Some(limit);
        self
    }

    pub fn with_max_message_bytes(mut self, max: usize) -> Self {
        self.config.relay.max_message_bytes = max;
        self
    }

    pub fn with_outbox_capacity(mut self, capacity: usize) -> Self {
        self.config.presence.outbox_capacity = capacity;
        self
    }

    pub fn with_signup(mut self, enabled: bool) -> Self {
        self.config.auth.allow_signup = enabled;
        self
    }

    /// Build the harness, creating the database in a fresh temp directory.
    pub async fn build(mut self) -> Result<TestHarness, MurmurError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| MurmurError::Storage { source: e.into() })?;
        self.config.storage.database_path = temp_dir
            .path()
            .join("murmur.db")
            .to_string_lossy()
            .into_owned();

        let storage = Arc::new(SqliteStorage::new(
            self.config.storage.clone(),
            &self.config.ledger,
        ));
        storage.initialize().await?;

        let presence = Arc::new(PresenceRegistry::new(self.config.presence.outbox_capacity));
        let service = ChatService::new(storage.clone(), presence, &self.config)
            .with_password_hashing(PasswordHashing::insecure_fast());

        Ok(TestHarness {
            service: Arc::new(service),
            storage,
            config: self.config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete server stack over a temp database.
pub struct TestHarness {
    pub service: Arc<ChatService>,
    /// Direct storage access for assertions.
    pub storage: Arc<SqliteStorage>,
    pub config: MurmurConfig,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Create a user named `username` with [`TEST_PASSWORD`].
    pub async fn add_user(&self, username: &str) -> Result<User, MurmurError> {
        self.service
            .provision_user(username, &format!("{username}@example.test"), TEST_PASSWORD)
            .await
    }

    /// Log `username` in and return the session token.
    pub async fn login(&self, username: &str) -> Result<String, MurmurError> {
        Ok(self.service.login(username, TEST_PASSWORD).await?.token)
    }

    /// `requester` asks `recipient`, who accepts.
    pub async fn befriend(&self, requester: &User, recipient: &User) -> Result<(), MurmurError> {
        self.service
            .send_chat_request(requester, &recipient.id)
            .await?;
        self.service
            .accept_chat_request(recipient, &requester.id)
            .await?;
        Ok(())
    }

    pub fn router(&self) -> Router {
        build_router(GatewayState::new(self.service.clone()))
    }

    /// Serve the router on an ephemeral localhost port until the returned
    /// token is cancelled.
    pub async fn spawn_server(&self) -> Result<(SocketAddr, CancellationToken), MurmurError> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| MurmurError::Channel {
                message: format!("failed to bind test server: {e}"),
                source: Some(Box::new(e)),
            })?;
        let addr = listener.local_addr().map_err(|e| MurmurError::Channel {
            message: format!("failed to read test server address: {e}"),
            source: Some(Box::new(e)),
        })?;

        let cancel = CancellationToken::new();
        let shutdown = cancel.clone();
        let app = self.router();
        tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await;
            if let Err(e) = served {
                tracing::error!(error = %e, "test server failed");
            }
        });
        Ok((addr, cancel))
    }
}
