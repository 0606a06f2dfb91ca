// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the storage, relay, and gateway crates.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::MurmurError;

/// Timestamp format used for every persisted `created_at`/`resolved_at` column.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Current UTC time rendered with [`TIMESTAMP_FORMAT`].
pub fn timestamp_now() -> String {
    chrono::Utc::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Opaque, stable identifier of a user (UUID v4 string).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identifier of a chat request row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub i64);

/// Globally monotonic message identifier; doubles as the append-order key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub i64);

/// A provisioned user. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub created_at: String,
}

/// Input for account provisioning. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// Stored credentials for a user, used only by the login path.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user: User,
    pub password_hash: String,
}

/// A bearer session issued at login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub token: String,
    pub user_id: UserId,
    pub created_at: String,
    pub expires_at: String,
}

/// State of a chat request.
///
/// The only legal transitions are `Pending -> Accepted` and
/// `Pending -> Rejected`; see [`RequestStatus::apply`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
}

/// A recipient's decision on a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum RequestAction {
    Accept,
    Reject,
}

impl RequestStatus {
    /// Transition table for the consent state machine.
    ///
    /// Resolved requests never move again, so any action on them yields
    /// [`MurmurError::AlreadyResolved`].
    pub fn apply(self, action: RequestAction) -> Result<RequestStatus, MurmurError> {
        match (self, action) {
            (RequestStatus::Pending, RequestAction::Accept) => Ok(RequestStatus::Accepted),
            (RequestStatus::Pending, RequestAction::Reject) => Ok(RequestStatus::Rejected),
            (resolved, _) => Err(MurmurError::AlreadyResolved(format!(
                "chat request is already {resolved}"
            ))),
        }
    }

    /// Whether a request in this state occupies its pair, blocking a new request.
    pub fn blocks_new_request(self) -> bool {
        matches!(self, RequestStatus::Pending | RequestStatus::Accepted)
    }

    pub fn is_resolved(self) -> bool {
        self != RequestStatus::Pending
    }
}

/// A consent request from `requester_id` to `recipient_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub id: RequestId,
    pub requester_id: UserId,
    pub recipient_id: UserId,
    pub status: RequestStatus,
    pub created_at: String,
    pub resolved_at: Option<String>,
}

/// A persisted direct message. Never mutated after append.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub sender_id: UserId,
    pub recipient_id: UserId,
    pub content: String,
    pub created_at: String,
}

/// An unordered pair of users, normalized so `lo <= hi`.
///
/// Used as the key for both the ledger's uniqueness rule and the
/// conversation index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserPair {
    lo: UserId,
    hi: UserId,
}

impl UserPair {
    pub fn new(a: &UserId, b: &UserId) -> Self {
        if a <= b {
            Self {
                lo: a.clone(),
                hi: b.clone(),
            }
        } else {
            Self {
                lo: b.clone(),
                hi: a.clone(),
            }
        }
    }

    pub fn lo(&self) -> &UserId {
        &self.lo
    }

    pub fn hi(&self) -> &UserId {
        &self.hi
    }

    /// The other member of the pair, or `None` if `user` is not a member.
    pub fn peer_of(&self, user: &UserId) -> Option<&UserId> {
        if *user == self.lo {
            Some(&self.hi)
        } else if *user == self.hi {
            Some(&self.lo)
        } else {
            None
        }
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::str::FromStr;

    fn status_strategy() -> impl Strategy<Value = RequestStatus> {
        prop_oneof![
            Just(RequestStatus::Pending),
            Just(RequestStatus::Accepted),
            Just(RequestStatus::Rejected),
        ]
    }

    fn action_strategy() -> impl Strategy<Value = RequestAction> {
        prop_oneof![Just(RequestAction::Accept), Just(RequestAction::Reject)]
    }

    #[test]
    fn pending_transitions() {
        assert_eq!(
            RequestStatus::Pending.apply(RequestAction::Accept).unwrap(),
            RequestStatus::Accepted
        );
        assert_eq!(
            RequestStatus::Pending.apply(RequestAction::Reject).unwrap(),
            RequestStatus::Rejected
        );
    }

    #[test]
    fn rejected_request_cannot_be_accepted() {
        let err = RequestStatus::Rejected
            .apply(RequestAction::Accept)
            .unwrap_err();
        assert!(matches!(err, MurmurError::AlreadyResolved(_)));
    }

    #[test]
    fn status_string_forms_match_storage_column() {
        assert_eq!(RequestStatus::Pending.to_string(), "pending");
        assert_eq!(RequestStatus::Accepted.to_string(), "accepted");
        assert_eq!(
            RequestStatus::from_str("rejected").unwrap(),
            RequestStatus::Rejected
        );
        let json = serde_json::to_string(&RequestStatus::Accepted).unwrap();
        assert_eq!(json, "\"accepted\"");
    }

    #[test]
    fn blocking_states() {
        assert!(RequestStatus::Pending.blocks_new_request());
        assert!(RequestStatus::Accepted.blocks_new_request());
        assert!(!RequestStatus::Rejected.blocks_new_request());
    }

    #[test]
    fn user_pair_is_order_insensitive() {
        let a = UserId::from("aaa");
        let b = UserId::from("bbb");
        let ab = UserPair::new(&a, &b);
        let ba = UserPair::new(&b, &a);
        assert_eq!(ab, ba);
        assert_eq!(ab.lo(), &a);
        assert_eq!(ab.hi(), &b);
        assert_eq!(ab.peer_of(&a), Some(&b));
        assert_eq!(ab.peer_of(&UserId::from("ccc")), None);
    }

    #[test]
    fn user_id_serializes_as_plain_string() {
        let id = UserId::from("abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");
    }

    #[test]
    fn timestamps_sort_lexically() {
        let earlier = "2026-01-01T00:00:00.000Z";
        let now = timestamp_now();
        assert!(now.as_str() > earlier);
        assert!(now.ends_with('Z'));
    }

    proptest! {
        #[test]
        fn resolved_states_are_terminal(
            status in status_strategy(),
            action in action_strategy(),
        ) {
            let result = status.apply(action);
            if status.is_resolved() {
                prop_assert!(result.is_err());
            } else {
                let next = result.unwrap();
                prop_assert!(next.is_resolved());
                // A second decision on the same request always fails.
                prop_assert!(next.apply(action).is_err());
            }
        }
    }
}
