// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Real-time event frames exchanged over a live connection.
//!
//! Client -> Server (JSON):
//! ```json
//! {"type": "join", "username": "alice"}
//! {"type": "message", "recipient": "bob", "message": "hi"}
//! ```
//!
//! Server -> Client (JSON):
//! ```json
//! {"type": "joined", "user_id": "...", "username": "alice"}
//! {"type": "message", "id": 7, "username": "alice", "recipient": "bob", "message": "hi", "created_at": "..."}
//! {"type": "error", "code": "unauthorized", "message": "..."}
//! {"type": "superseded"}
//! ```

use serde::{Deserialize, Serialize};

use murmur_core::{Message, MessageId, MurmurError, User, UserId};

/// Frame sent by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    Join { username: String },
    Message { recipient: String, message: String },
}

/// Frame pushed to a client through its outbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// The connection is now the user's live connection.
    Joined { user_id: UserId, username: String },
    /// A persisted direct message. `username` is the sender.
    Message {
        id: MessageId,
        username: String,
        recipient: String,
        message: String,
        created_at: String,
    },
    Error { code: String, message: String },
    /// A newer connection for the same user took over; this one is closing.
    Superseded,
}

impl ServerEvent {
    pub fn joined(user: &User) -> Self {
        Self::Joined {
            user_id: user.id.clone(),
            username: user.username.clone(),
        }
    }

    pub fn message(message: &Message, sender: &User, recipient: &User) -> Self {
        Self::Message {
            id: message.id,
            username: sender.username.clone(),
            recipient: recipient.username.clone(),
            message: message.content.clone(),
            created_at: message.created_at.clone(),
        }
    }

    pub fn error(err: &MurmurError) -> Self {
        Self::Error {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }

    /// Serialize to a JSON text frame.
    pub fn to_json(&self) -> Result<String, MurmurError> {
        serde_json::to_string(self)
            .map_err(|e| MurmurError::Internal(format!("failed to encode event: {e}")))
    }
}
