// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport-independent chat operations.
//!
//! [`ChatService`] is what the HTTP and WebSocket handlers call. Every
//! operation takes the authenticated caller explicitly; nothing here knows
//! about headers, sockets or JSON framing.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use murmur_config::model::{AuthConfig, MurmurConfig};
use murmur_core::types::{AuthSession, NewAccount, timestamp_now};
use murmur_core::{
    AccountStore, ChatRequest, HealthStatus, IdentityDirectory, MessageStore, MurmurError,
    RequestLedger, StorageAdapter, User, UserId,
};

use crate::accounts::{self, PasswordHashing};
use crate::engine::{RelayEngine, Relayed};
use crate::presence::{ConnectionHandle, PresenceRegistry};

/// Input to the placeholder hash. Whether a login matches it is ignored.
const PLACEHOLDER_PASSWORD: &str = "murmur-placeholder-credential";

/// A pending request as shown to its recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingRequest {
    pub sender_id: UserId,
    pub sender_username: String,
    pub created_at: String,
}

/// A user the caller may message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatPeer {
    pub user_id: UserId,
    pub username: String,
    pub online: bool,
}

/// One line of conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub sender_username: String,
    pub content: String,
    pub created_at: String,
}

/// The chat operations, wired to storage and the presence registry.
pub struct ChatService {
    backend: Arc<dyn StorageAdapter>,
    directory: Arc<dyn IdentityDirectory>,
    ledger: Arc<dyn RequestLedger>,
    messages: Arc<dyn MessageStore>,
    accounts: Arc<dyn AccountStore>,
    presence: Arc<PresenceRegistry>,
    engine: RelayEngine,
    auth: AuthConfig,
    history_limit: Option<u32>,
    hashing: PasswordHashing,
    /// Hash checked on logins for unknown usernames, so both failure paths
    /// pay the same Argon2 cost.
    placeholder_phc: OnceCell<String>,
}

impl ChatService {
    /// Build the service over one storage backend implementing every contract.
    pub fn new<S>(storage: Arc<S>, presence: Arc<PresenceRegistry>, config: &MurmurConfig) -> Self
    where
        S: StorageAdapter + IdentityDirectory + RequestLedger + MessageStore + AccountStore,
    {
        let ledger: Arc<dyn RequestLedger> = storage.clone();
        let messages: Arc<dyn MessageStore> = storage.clone();
        let engine = RelayEngine::new(
            ledger.clone(),
            messages.clone(),
            presence.clone(),
            config.relay.max_message_bytes,
        );
        Self {
            backend: storage.clone(),
            directory: storage.clone(),
            ledger,
            messages,
            accounts: storage,
            presence,
            engine,
            auth: config.auth.clone(),
            history_limit: config.relay.history_limit,
            hashing: PasswordHashing::default(),
            placeholder_phc: OnceCell::new(),
        }
    }

    /// Replace the password hasher (tests use a low-cost one).
    pub fn with_password_hashing(mut self, hashing: PasswordHashing) -> Self {
        self.hashing = hashing;
        self.placeholder_phc = OnceCell::new();
        self
    }

    pub fn presence(&self) -> &Arc<PresenceRegistry> {
        &self.presence
    }

    /// Storage health; a failing probe reads as unhealthy.
    pub async fn health(&self) -> HealthStatus {
        match self.backend.health_check().await {
            Ok(status) => status,
            Err(e) => HealthStatus::Unhealthy(e.to_string()),
        }
    }

    // --- Accounts and login sessions ---

    /// Self-service account creation; refused when `auth.allow_signup` is off.
    pub async fn signup(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, MurmurError> {
        if !self.auth.allow_signup {
            return Err(MurmurError::Unauthorized("signup is disabled".to_string()));
        }
        self.provision_user(username, email, password).await
    }

    /// Create an account regardless of the signup switch (operator path).
    pub async fn provision_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, MurmurError> {
        accounts::validate_username(username)?;
        accounts::validate_email(email)?;
        accounts::validate_password(password, self.auth.min_password_len)?;

        let password_hash = self.hash_password(password).await?;
        let user = self
            .accounts
            .create_account(NewAccount {
                username: username.to_string(),
                email: email.to_string(),
                password_hash,
            })
            .await?;
        info!(user = %user.id, username = %user.username, "account created");
        Ok(user)
    }

    /// Verify credentials and open a login session.
    ///
    /// Unknown users and wrong passwords fail identically.
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthSession, MurmurError> {
        let Some(credentials) = self.accounts.find_credentials(username).await? else {
            let placeholder = self
                .placeholder_phc
                .get_or_try_init(|| self.hash_password(PLACEHOLDER_PASSWORD))
                .await?;
            self.verify_password(password, placeholder).await?;
            return Err(MurmurError::InvalidCredentials);
        };
        if !self
            .verify_password(password, &credentials.password_hash)
            .await?
        {
            return Err(MurmurError::InvalidCredentials);
        }

        let session = AuthSession {
            token: accounts::generate_token()?,
            user_id: credentials.user.id,
            created_at: timestamp_now(),
            expires_at: accounts::expiry_after(self.auth.session_ttl_hours),
        };
        self.accounts.create_session(&session).await?;
        debug!(user = %session.user_id, "login session opened");
        Ok(session)
    }

    pub async fn logout(&self, token: &str) -> Result<bool, MurmurError> {
        self.accounts.delete_session(token).await
    }

    /// Resolve a bearer token to its user.
    pub async fn authenticate(&self, token: &str) -> Result<User, MurmurError> {
        let user_id = self
            .accounts
            .session_user(token)
            .await?
            .ok_or_else(|| MurmurError::Unauthorized("invalid or expired session".to_string()))?;
        self.directory.get_user(&user_id).await
    }

    pub async fn purge_expired_sessions(&self) -> Result<usize, MurmurError> {
        self.accounts.purge_expired_sessions().await
    }

    async fn hash_password(&self, password: &str) -> Result<String, MurmurError> {
        let hashing = self.hashing.clone();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hashing.hash(&password))
            .await
            .map_err(|e| MurmurError::Internal(format!("hashing task failed: {e}")))?
    }

    async fn verify_password(&self, password: &str, phc: &str) -> Result<bool, MurmurError> {
        let hashing = self.hashing.clone();
        let password = password.to_string();
        let phc = phc.to_string();
        tokio::task::spawn_blocking(move || hashing.verify(&password, &phc))
            .await
            .map_err(|e| MurmurError::Internal(format!("verification task failed: {e}")))
    }

    // --- Real-time operations ---

    /// Make `connection` the caller's live connection.
    ///
    /// `username` must resolve to the caller. Joining again on the same
    /// connection is harmless; joining on a connection that has since been
    /// superseded is refused and leaves the newer connection in place.
    pub async fn join(
        &self,
        caller: &User,
        username: &str,
        connection: &ConnectionHandle,
    ) -> Result<(), MurmurError> {
        let user_id = self.directory.resolve(username).await?;
        if user_id != caller.id {
            return Err(MurmurError::Unauthorized(format!(
                "cannot join as {username}"
            )));
        }
        self.presence.register(&caller.id, connection.clone())?;
        debug!(user = %caller.id, connection = %connection.id(), "joined");
        Ok(())
    }

    pub async fn send_message(
        &self,
        caller: &User,
        recipient_username: &str,
        content: &str,
    ) -> Result<Relayed, MurmurError> {
        let recipient_id = self.directory.resolve(recipient_username).await?;
        let recipient = self.directory.get_user(&recipient_id).await?;
        self.engine.send(caller, &recipient, content).await
    }

    // --- Directory and consent ---

    /// Exact-match username lookup. `Ok(None)` when no such user exists.
    pub async fn search_user(&self, username: &str) -> Result<Option<User>, MurmurError> {
        match self.directory.resolve(username).await {
            Ok(id) => self.directory.get_user(&id).await.map(Some),
            Err(MurmurError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn send_chat_request(
        &self,
        caller: &User,
        recipient: &UserId,
    ) -> Result<ChatRequest, MurmurError> {
        let request = self.ledger.create_request(&caller.id, recipient).await?;
        info!(request_id = request.id.0, from = %caller.id, to = %recipient, "chat request sent");
        Ok(request)
    }

    pub async fn get_chat_requests(&self, caller: &User) -> Result<Vec<PendingRequest>, MurmurError> {
        let pending = self.ledger.list_pending(&caller.id).await?;
        let mut views = Vec::with_capacity(pending.len());
        for request in pending {
            let sender = self.directory.get_user(&request.requester_id).await?;
            views.push(PendingRequest {
                sender_id: sender.id,
                sender_username: sender.username,
                created_at: request.created_at,
            });
        }
        Ok(views)
    }

    pub async fn accept_chat_request(
        &self,
        caller: &User,
        sender: &UserId,
    ) -> Result<ChatRequest, MurmurError> {
        let request = self.ledger.accept(&caller.id, sender).await?;
        info!(request_id = request.id.0, "chat request accepted");
        Ok(request)
    }

    pub async fn reject_chat_request(
        &self,
        caller: &User,
        sender: &UserId,
    ) -> Result<ChatRequest, MurmurError> {
        let request = self.ledger.reject(&caller.id, sender).await?;
        info!(request_id = request.id.0, "chat request rejected");
        Ok(request)
    }

    pub async fn get_accepted_chats(&self, caller: &User) -> Result<Vec<ChatPeer>, MurmurError> {
        let peers = self.ledger.list_accepted_peers(&caller.id).await?;
        let mut chats = Vec::with_capacity(peers.len());
        for peer in peers {
            let user = self.directory.get_user(&peer).await?;
            chats.push(ChatPeer {
                online: self.presence.is_online(&user.id),
                user_id: user.id,
                username: user.username,
            });
        }
        Ok(chats)
    }

    /// Conversation between the caller and `other_username`, oldest first.
    pub async fn get_messages(
        &self,
        caller: &User,
        other_username: &str,
    ) -> Result<Vec<HistoryEntry>, MurmurError> {
        let other_id = self.directory.resolve(other_username).await?;
        let other = self.directory.get_user(&other_id).await?;
        let names: HashMap<&UserId, &str> = HashMap::from([
            (&caller.id, caller.username.as_str()),
            (&other.id, other.username.as_str()),
        ]);

        let messages = self
            .messages
            .list_between(&caller.id, &other.id, self.history_limit)
            .await?;
        Ok(messages
            .into_iter()
            .map(|m| HistoryEntry {
                sender_username: names
                    .get(&m.sender_id)
                    .map_or_else(|| m.sender_id.to_string(), |name| name.to_string()),
                content: m.content,
                created_at: m.created_at,
            })
            .collect())
    }
}
