// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `murmur adduser`: operator-side account creation.
//!
//! Works whether or not `auth.allow_signup` is enabled.

use std::sync::Arc;

use secrecy::ExposeSecret;

use murmur_config::model::MurmurConfig;
use murmur_core::{MurmurError, StorageAdapter};
use murmur_relay::{ChatService, PresenceRegistry};
use murmur_storage::SqliteStorage;

use crate::prompt;

pub async fn run_adduser(
    config: MurmurConfig,
    username: &str,
    email: &str,
) -> Result<(), MurmurError> {
    let password = prompt::get_new_password()?;

    let storage = Arc::new(SqliteStorage::new(config.storage.clone(), &config.ledger));
    storage.initialize().await?;
    let presence = Arc::new(PresenceRegistry::new(config.presence.outbox_capacity));
    let service = ChatService::new(storage.clone(), presence, &config);

    let created = service
        .provision_user(username, email, password.expose_secret())
        .await;
    storage.close().await?;

    let user = created?;
    println!("created user {} ({})", user.username, user.id);
    Ok(())
}
