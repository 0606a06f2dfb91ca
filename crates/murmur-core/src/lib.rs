// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Murmur messaging server.
//!
//! This crate provides the error type, the domain types, and the component
//! contracts (identity directory, chat request ledger, message store,
//! account store) that the storage, relay, and gateway crates build on.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::MurmurError;
pub use types::{
    ChatRequest, HealthStatus, Message, MessageId, RequestAction, RequestId, RequestStatus, User,
    UserId, UserPair,
};

pub use traits::{
    AccountStore, IdentityDirectory, MessageStore, PluginAdapter, RequestLedger, StorageAdapter,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_distinct() {
        let errors = [
            MurmurError::NotFound("x".into()),
            MurmurError::AlreadyExists("x".into()),
            MurmurError::AlreadyResolved("x".into()),
            MurmurError::Unauthorized("x".into()),
            MurmurError::InvalidTarget("x".into()),
            MurmurError::ContentEmpty,
            MurmurError::ContentTooLong { len: 10, max: 5 },
            MurmurError::InvalidCredentials,
            MurmurError::Validation("x".into()),
            MurmurError::Config("x".into()),
            MurmurError::Storage {
                source: Box::new(std::io::Error::other("x")),
            },
            MurmurError::Channel {
                message: "x".into(),
                source: None,
            },
            MurmurError::Internal("x".into()),
        ];
        let mut codes: Vec<&str> = errors.iter().map(MurmurError::code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn storage_errors_are_not_client_errors() {
        let storage = MurmurError::Storage {
            source: Box::new(std::io::Error::other("disk full")),
        };
        assert!(!storage.is_client_error());
        assert!(MurmurError::ContentEmpty.is_client_error());
        assert!(MurmurError::Unauthorized("no".into()).is_client_error());
    }

    #[test]
    fn content_too_long_message_names_limit() {
        let err = MurmurError::ContentTooLong { len: 9000, max: 4096 };
        assert_eq!(err.to_string(), "message content is 9000 bytes, limit is 4096");
    }

    #[test]
    fn all_trait_modules_are_exported() {
        fn _assert_storage<T: StorageAdapter>() {}
        fn _assert_directory<T: IdentityDirectory>() {}
        fn _assert_ledger<T: RequestLedger>() {}
        fn _assert_messages<T: MessageStore>() {}
        fn _assert_accounts<T: AccountStore>() {}
        fn _assert_object_safe(
            _d: &dyn IdentityDirectory,
            _l: &dyn RequestLedger,
            _m: &dyn MessageStore,
            _a: &dyn AccountStore,
        ) {
        }
    }
}
