// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Presence registry, relay engine, and chat service for Murmur.
//!
//! The [`PresenceRegistry`] tracks one live connection per user, the
//! [`RelayEngine`] enforces consent before persisting and pushing a message,
//! and [`ChatService`] exposes every user-facing operation to the transport
//! layer.

pub mod accounts;
pub mod engine;
pub mod events;
pub mod presence;
pub mod service;

pub use engine::{RelayEngine, Relayed};
pub use events::{ClientEvent, ServerEvent};
pub use presence::{ConnectionHandle, Delivery, PresenceRegistry};
pub use service::{ChatPeer, ChatService, HistoryEntry, PendingRequest};
