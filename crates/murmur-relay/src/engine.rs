// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Consent-checked send path: authorize, persist, then deliver.

use std::sync::Arc;

use tracing::debug;

use murmur_core::{Message, MessageStore, MurmurError, RequestLedger, User};

use crate::events::ServerEvent;
use crate::presence::{Delivery, PresenceRegistry};

/// Result of a successful send.
#[derive(Debug, Clone)]
pub struct Relayed {
    pub message: Message,
    /// The frame pushed to the recipient, reusable as the sender's echo.
    pub event: ServerEvent,
    pub delivery: Delivery,
}

/// Orchestrates the ledger, the message store and the presence registry.
///
/// The engine owns no state of its own; the ledger and store remain the sole
/// writers of their entities.
pub struct RelayEngine {
    ledger: Arc<dyn RequestLedger>,
    messages: Arc<dyn MessageStore>,
    presence: Arc<PresenceRegistry>,
    max_message_bytes: usize,
}

impl RelayEngine {
    pub fn new(
        ledger: Arc<dyn RequestLedger>,
        messages: Arc<dyn MessageStore>,
        presence: Arc<PresenceRegistry>,
        max_message_bytes: usize,
    ) -> Self {
        Self {
            ledger,
            messages,
            presence,
            max_message_bytes,
        }
    }

    /// Send `content` from `sender` to `recipient`.
    ///
    /// Nothing is delivered unless the message was persisted first. An
    /// offline recipient is not an error.
    pub async fn send(
        &self,
        sender: &User,
        recipient: &User,
        content: &str,
    ) -> Result<Relayed, MurmurError> {
        if !self.ledger.is_authorized(&sender.id, &recipient.id).await? {
            return Err(MurmurError::Unauthorized(format!(
                "no accepted chat request with {}",
                recipient.username
            )));
        }
        if content.trim().is_empty() {
            return Err(MurmurError::ContentEmpty);
        }
        if content.len() > self.max_message_bytes {
            return Err(MurmurError::ContentTooLong {
                len: content.len(),
                max: self.max_message_bytes,
            });
        }

        let message = self
            .messages
            .append(&sender.id, &recipient.id, content)
            .await?;

        let event = ServerEvent::message(&message, sender, recipient);
        let delivery = self.presence.route_event(&recipient.id, event.clone());
        debug!(
            message_id = message.id.0,
            sender = %sender.id,
            recipient = %recipient.id,
            ?delivery,
            "message relayed"
        );

        Ok(Relayed {
            message,
            event,
            delivery,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use murmur_core::{ChatRequest, MessageId, UserId, UserPair};

    use super::*;

    /// Ledger with a fixed set of accepted pairs.
    struct FixedLedger {
        accepted: Vec<UserPair>,
    }

    #[async_trait]
    impl RequestLedger for FixedLedger {
        async fn create_request(
            &self,
            _requester: &UserId,
            _recipient: &UserId,
        ) -> Result<ChatRequest, MurmurError> {
            unreachable!()
        }

        async fn list_pending(&self, _user: &UserId) -> Result<Vec<ChatRequest>, MurmurError> {
            Ok(Vec::new())
        }

        async fn accept(
            &self,
            _recipient: &UserId,
            _requester: &UserId,
        ) -> Result<ChatRequest, MurmurError> {
            unreachable!()
        }

        async fn reject(
            &self,
            _recipient: &UserId,
            _requester: &UserId,
        ) -> Result<ChatRequest, MurmurError> {
            unreachable!()
        }

        async fn is_authorized(&self, a: &UserId, b: &UserId) -> Result<bool, MurmurError> {
            Ok(self.accepted.contains(&UserPair::new(a, b)))
        }

        async fn list_accepted_peers(&self, _user: &UserId) -> Result<Vec<UserId>, MurmurError> {
            Ok(Vec::new())
        }
    }

    /// In-memory log that can be switched to fail every append.
    #[derive(Default)]
    struct MemoryLog {
        messages: Mutex<Vec<Message>>,
        fail: bool,
    }

    #[async_trait]
    impl MessageStore for MemoryLog {
        async fn append(
            &self,
            sender: &UserId,
            recipient: &UserId,
            content: &str,
        ) -> Result<Message, MurmurError> {
            if self.fail {
                return Err(MurmurError::Storage {
                    source: "disk full".into(),
                });
            }
            let mut messages = self.messages.lock().unwrap();
            let message = Message {
                id: MessageId(messages.len() as i64 + 1),
                sender_id: sender.clone(),
                recipient_id: recipient.clone(),
                content: content.to_string(),
                created_at: "2026-01-01T00:00:00.000Z".to_string(),
            };
            messages.push(message.clone());
            Ok(message)
        }

        async fn list_between(
            &self,
            _a: &UserId,
            _b: &UserId,
            _limit: Option<u32>,
        ) -> Result<Vec<Message>, MurmurError> {
            Ok(self.messages.lock().unwrap().clone())
        }
    }

    fn user(name: &str) -> User {
        User {
            id: UserId::from(name),
            username: name.to_string(),
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
        }
    }

    fn engine(log: Arc<MemoryLog>, presence: Arc<PresenceRegistry>) -> RelayEngine {
        let ledger = FixedLedger {
            accepted: vec![UserPair::new(&UserId::from("alice"), &UserId::from("bob"))],
        };
        RelayEngine::new(Arc::new(ledger), log, presence, 16)
    }

    #[tokio::test]
    async fn authorized_send_persists_and_delivers() {
        let log = Arc::new(MemoryLog::default());
        let presence = Arc::new(PresenceRegistry::new(4));
        let (handle, mut rx) = presence.connect();
        presence.register(&UserId::from("bob"), handle).unwrap();

        let relayed = engine(log.clone(), presence)
            .send(&user("alice"), &user("bob"), "hi")
            .await
            .unwrap();
        assert_eq!(relayed.delivery, Delivery::Delivered);
        assert_eq!(log.messages.lock().unwrap().len(), 1);
        assert_eq!(rx.try_recv().unwrap(), relayed.event);
    }

    #[tokio::test]
    async fn reverse_direction_is_also_authorized() {
        let log = Arc::new(MemoryLog::default());
        let presence = Arc::new(PresenceRegistry::new(4));
        let relayed = engine(log, presence)
            .send(&user("bob"), &user("alice"), "hey")
            .await
            .unwrap();
        assert_eq!(relayed.delivery, Delivery::Offline);
        assert_eq!(relayed.message.sender_id, UserId::from("bob"));
    }

    #[tokio::test]
    async fn unauthorized_send_creates_nothing() {
        let log = Arc::new(MemoryLog::default());
        let presence = Arc::new(PresenceRegistry::new(4));
        let (handle, mut rx) = presence.connect();
        presence.register(&UserId::from("carol"), handle).unwrap();

        let err = engine(log.clone(), presence)
            .send(&user("alice"), &user("carol"), "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, MurmurError::Unauthorized(_)));
        assert!(log.messages.lock().unwrap().is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn content_limits_are_enforced() {
        let log = Arc::new(MemoryLog::default());
        let engine = engine(log.clone(), Arc::new(PresenceRegistry::new(4)));

        let empty = engine.send(&user("alice"), &user("bob"), "   ").await;
        assert!(matches!(empty, Err(MurmurError::ContentEmpty)));

        let long = engine
            .send(&user("alice"), &user("bob"), &"x".repeat(17))
            .await;
        assert!(matches!(
            long,
            Err(MurmurError::ContentTooLong { len: 17, max: 16 })
        ));
        assert!(log.messages.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn storage_failure_delivers_nothing() {
        let log = Arc::new(MemoryLog {
            fail: true,
            ..Default::default()
        });
        let presence = Arc::new(PresenceRegistry::new(4));
        let (handle, mut rx) = presence.connect();
        presence.register(&UserId::from("bob"), handle).unwrap();

        let err = engine(log, presence)
            .send(&user("alice"), &user("bob"), "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, MurmurError::Storage { .. }));
        assert!(rx.try_recv().is_err());
    }
}
