//! Chat message record and the persistence port.
//!
//! Maps to the `chat_messages` table:
//! - id: UUID PRIMARY KEY
//! - room_id: TEXT NOT NULL
//! - sender_id: TEXT NOT NULL
//! - body: JSONB NOT NULL (message fields exactly as relayed)
//! - sent_at: TIMESTAMPTZ NOT NULL (server delivery timestamp)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::connection::RoomId;
use crate::shared::error::AppError;

/// A message that was relayed to a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub room_id: RoomId,
    pub sender_id: String,
    pub body: Map<String, Value>,
    pub sent_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(
        room_id: RoomId,
        sender_id: String,
        body: Map<String, Value>,
        sent_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            room_id,
            sender_id,
            body,
            sent_at,
        }
    }
}

/// Best-effort sink for relayed messages.
///
/// Failures are reported to the caller for logging only; they never affect the
/// sender's acknowledgment.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn persist(&self, message: ChatMessage) -> Result<(), AppError>;
}
