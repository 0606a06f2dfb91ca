// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Murmur server.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Murmur configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. Every section is optional and defaults to sensible
/// values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MurmurConfig {
    /// HTTP/WebSocket listener and logging settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// SQLite storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Live connection settings.
    #[serde(default)]
    pub presence: PresenceConfig,

    /// Chat request policy.
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// Message relay limits.
    #[serde(default)]
    pub relay: RelayConfig,

    /// Account and login session settings.
    #[serde(default)]
    pub auth: AuthConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address to bind the HTTP/WebSocket listener to.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("murmur").join("murmur.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("murmur.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Presence registry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PresenceConfig {
    /// Capacity of each connection's outbound event queue. Events routed to a
    /// full queue are dropped from live delivery (the message log keeps them).
    #[serde(default = "default_outbox_capacity")]
    pub outbox_capacity: usize,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            outbox_capacity: default_outbox_capacity(),
        }
    }
}

fn default_outbox_capacity() -> usize {
    64
}

/// Chat request ledger configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LedgerConfig {
    /// Allow a requester to send a fresh request after being rejected.
    #[serde(default = "default_allow_rerequest")]
    pub allow_rerequest: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            allow_rerequest: default_allow_rerequest(),
        }
    }
}

fn default_allow_rerequest() -> bool {
    true
}

/// Relay engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RelayConfig {
    /// Maximum message size in bytes (UTF-8).
    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,

    /// Maximum number of messages returned by a history read. `None` returns
    /// the full conversation.
    #[serde(default)]
    pub history_limit: Option<u32>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            max_message_bytes: default_max_message_bytes(),
            history_limit: None,
        }
    }
}

fn default_max_message_bytes() -> usize {
    4096
}

/// Account and session configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// Lifetime of a login session in hours.
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: u32,

    /// Whether `POST /auth/signup` is open. When disabled, accounts can only
    /// be created with `murmur adduser`.
    #[serde(default = "default_allow_signup")]
    pub allow_signup: bool,

    /// Minimum password length in characters.
    #[serde(default = "default_min_password_len")]
    pub min_password_len: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_hours: default_session_ttl_hours(),
            allow_signup: default_allow_signup(),
            min_password_len: default_min_password_len(),
        }
    }
}

fn default_session_ttl_hours() -> u32 {
    24 * 7
}

fn default_allow_signup() -> bool {
    true
}

fn default_min_password_len() -> usize {
    8
}
