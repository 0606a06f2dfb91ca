// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP/WebSocket gateway for Murmur.
//!
//! A thin transport over [`murmur_relay::ChatService`]: JSON REST routes for
//! accounts, consent and history, and a WebSocket for live delivery.

pub mod auth;
pub mod handlers;
pub mod server;
pub mod ws;

pub use server::{GatewayState, build_router, start_server};
