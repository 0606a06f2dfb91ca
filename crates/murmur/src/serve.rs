// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `murmur serve` command implementation.
//!
//! Opens SQLite storage, builds the presence registry and chat service, and
//! runs the HTTP/WebSocket gateway until SIGINT or SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use murmur_config::model::MurmurConfig;
use murmur_core::{MurmurError, StorageAdapter};
use murmur_gateway::GatewayState;
use murmur_relay::{ChatService, PresenceRegistry};
use murmur_storage::SqliteStorage;

use crate::shutdown;

/// How often expired login sessions are swept.
const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Runs the `murmur serve` command.
pub async fn run_serve(config: MurmurConfig) -> Result<(), MurmurError> {
    init_tracing(&config.server.log_level);

    info!(version = env!("CARGO_PKG_VERSION"), "starting murmur serve");

    let storage = Arc::new(SqliteStorage::new(config.storage.clone(), &config.ledger));
    storage.initialize().await?;
    info!(path = %config.storage.database_path, "storage initialized");

    let presence = Arc::new(PresenceRegistry::new(config.presence.outbox_capacity));
    let service = Arc::new(ChatService::new(storage.clone(), presence, &config));

    let cancel = shutdown::install_signal_handler();
    let purge = tokio::spawn(purge_sessions_periodically(
        service.clone(),
        cancel.clone(),
    ));

    let served =
        murmur_gateway::start_server(&config.server, GatewayState::new(service), cancel.clone())
            .await;

    // A bind failure returns before any signal; stop the sweeper too.
    cancel.cancel();
    let _ = purge.await;

    if let Err(e) = storage.close().await {
        warn!(error = %e, "storage close failed");
    }
    info!("murmur stopped");
    served
}

async fn purge_sessions_periodically(service: Arc<ChatService>, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(SESSION_PURGE_INTERVAL);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {}
        }
        match service.purge_expired_sessions().await {
            Ok(0) => {}
            Ok(purged) => debug!(purged, "expired login sessions removed"),
            Err(e) => warn!(error = %e, "session purge failed"),
        }
    }
}

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` overrides `server.log_level` when set.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("murmur={log_level},tower_http={log_level},warn"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
