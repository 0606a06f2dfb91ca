// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Live connection registry.
//!
//! Maps each online user to exactly one [`ConnectionHandle`]. Mutations are
//! serialized per key by the DashMap shard locks; there is no global lock.
//! Registering a second connection for a user evicts the first: the old
//! connection is sent [`ServerEvent::Superseded`] and its close token fires.

use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::{SendTimeoutError, TrySendError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use murmur_core::{MurmurError, UserId};

use crate::events::ServerEvent;

/// Outcome of pushing an event at a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Queued on the live connection's outbox.
    Delivered,
    /// No live connection.
    Offline,
    /// A connection exists but its outbox is full or closed.
    Dropped,
}

/// Cheap, clonable reference to one live connection.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: Uuid,
    outbox: mpsc::Sender<ServerEvent>,
    closed: CancellationToken,
}

impl ConnectionHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Fires when the registry evicts this connection.
    pub fn closed(&self) -> &CancellationToken {
        &self.closed
    }

    /// Push an event without waiting for outbox space.
    pub fn deliver(&self, event: ServerEvent) -> Delivery {
        match self.outbox.try_send(event) {
            Ok(()) => Delivery::Delivered,
            Err(TrySendError::Full(_)) => {
                warn!(connection = %self.id, "outbox full, dropping event");
                Delivery::Dropped
            }
            Err(TrySendError::Closed(_)) => {
                debug!(connection = %self.id, "outbox closed, dropping event");
                Delivery::Dropped
            }
        }
    }

    /// Push a reply to this connection's own client, waiting up to `wait`
    /// for outbox space.
    pub async fn reply(&self, event: ServerEvent, wait: Duration) -> Delivery {
        match self.outbox.send_timeout(event, wait).await {
            Ok(()) => Delivery::Delivered,
            Err(SendTimeoutError::Timeout(_)) => {
                warn!(connection = %self.id, "outbox stayed full, dropping reply");
                Delivery::Dropped
            }
            Err(SendTimeoutError::Closed(_)) => {
                debug!(connection = %self.id, "outbox closed, dropping reply");
                Delivery::Dropped
            }
        }
    }
}

/// Registry of live connections keyed by user.
pub struct PresenceRegistry {
    connections: DashMap<UserId, ConnectionHandle>,
    outbox_capacity: usize,
}

impl PresenceRegistry {
    pub fn new(outbox_capacity: usize) -> Self {
        Self {
            connections: DashMap::new(),
            outbox_capacity: outbox_capacity.max(1),
        }
    }

    /// Allocate a handle and the receiving half of its outbox.
    ///
    /// The handle is not visible to other users until [`register`](Self::register).
    pub fn connect(&self) -> (ConnectionHandle, mpsc::Receiver<ServerEvent>) {
        let (outbox, rx) = mpsc::channel(self.outbox_capacity);
        let handle = ConnectionHandle {
            id: Uuid::new_v4(),
            outbox,
            closed: CancellationToken::new(),
        };
        (handle, rx)
    }

    /// Bind `user` to `handle`, evicting any previous connection.
    ///
    /// Re-registering the same connection is a no-op. Returns the evicted
    /// handle, if any. A handle that was already evicted cannot come back:
    /// the check and the eviction both happen under the entry's shard lock.
    pub fn register(
        &self,
        user: &UserId,
        handle: ConnectionHandle,
    ) -> Result<Option<ConnectionHandle>, MurmurError> {
        let connection = handle.id;
        let previous = match self.connections.entry(user.clone()) {
            _ if handle.closed.is_cancelled() => {
                return Err(MurmurError::Unauthorized(
                    "connection has been superseded".to_string(),
                ));
            }
            Entry::Occupied(entry) if entry.get().id == connection => return Ok(None),
            Entry::Occupied(mut entry) => {
                let previous = entry.insert(handle);
                previous.closed.cancel();
                previous
            }
            Entry::Vacant(entry) => {
                entry.insert(handle);
                return Ok(None);
            }
        };

        previous.deliver(ServerEvent::Superseded);
        info!(
            user = %user,
            evicted = %previous.id,
            %connection,
            "connection superseded"
        );
        Ok(Some(previous))
    }

    /// Remove the binding for `user` only if it still points at `connection`.
    pub fn unregister(&self, user: &UserId, connection: Uuid) -> bool {
        let removed = self
            .connections
            .remove_if(user, |_, handle| handle.id == connection)
            .is_some();
        if removed {
            debug!(user = %user, %connection, "connection unregistered");
        }
        removed
    }

    pub fn lookup(&self, user: &UserId) -> Option<ConnectionHandle> {
        self.connections.get(user).map(|entry| entry.value().clone())
    }

    pub fn is_online(&self, user: &UserId) -> bool {
        self.connections.contains_key(user)
    }

    pub fn online_count(&self) -> usize {
        self.connections.len()
    }

    /// Push `event` to the user's live connection. Offline is not an error.
    pub fn route_event(&self, user: &UserId, event: ServerEvent) -> Delivery {
        // Clone out first so the shard lock is not held across the send.
        match self.lookup(user) {
            Some(handle) => handle.deliver(event),
            None => Delivery::Offline,
        }
    }
}
