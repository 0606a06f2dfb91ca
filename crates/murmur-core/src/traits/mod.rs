// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Component contracts for the Murmur server.
//!
//! Every trait uses `#[async_trait]` so implementations can be shared as
//! `Arc<dyn Trait>` between the relay engine, the service layer, and tests.

pub mod accounts;
pub mod adapter;
pub mod directory;
pub mod ledger;
pub mod messages;
pub mod storage;

pub use accounts::AccountStore;
pub use adapter::PluginAdapter;
pub use directory::IdentityDirectory;
pub use ledger::RequestLedger;
pub use messages::MessageStore;
pub use storage::StorageAdapter;
