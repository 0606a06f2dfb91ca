// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Murmur integration tests.
//!
//! Provides a [`TestHarness`] that wires the real storage, relay, and
//! gateway crates over a throwaway SQLite database.

pub mod harness;

pub use harness::{TEST_PASSWORD, TestHarness};
