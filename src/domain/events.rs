//! Outbound Events
//!
//! Everything the core pushes to a connection. Serialized as
//! `{"event": "<name>", "data": {...}}`.

use serde::Serialize;
use serde_json::{Map, Value};

use super::entities::{ParticipantId, RoomId};

/// Event pushed from the server to one connection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    /// Confirmation sent to a connection that joined a room
    RoomJoined {
        status: &'static str,
        room_id: RoomId,
        message: &'static str,
    },

    /// Chat message relayed to the other members of a room
    ReceiveMessage(Map<String, Value>),

    /// Typing indicator relayed verbatim
    Typing(Map<String, Value>),

    /// Participant list sent to a connection that joined a channel
    ChannelJoined { participants: Vec<ParticipantId> },

    /// A participant joined a channel the receiver is in
    UserJoined { user_id: ParticipantId },

    /// A participant's connection dropped
    UserLeft { user_id: ParticipantId },

    /// Call-signaling envelope, payload passed through untouched
    CallSignal {
        #[serde(rename = "type")]
        signal_type: String,
        payload: Value,
        sender_id: ParticipantId,
    },

    /// Terminal response to an acknowledgment-bearing request
    Ack {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        status: Option<&'static str>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    /// Error report for the originating connection only
    Error { message: String },
}

impl ServerEvent {
    pub fn room_joined(room_id: RoomId) -> Self {
        ServerEvent::RoomJoined {
            status: "success",
            room_id,
            message: "Successfully joined room",
        }
    }

    pub fn ack_success(id: Option<u64>) -> Self {
        ServerEvent::Ack {
            id,
            status: Some("success"),
            error: None,
        }
    }

    pub fn ack_failure(id: Option<u64>, error: impl Into<String>) -> Self {
        ServerEvent::Ack {
            id,
            status: None,
            error: Some(error.into()),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ServerEvent::Error {
            message: message.into(),
        }
    }

    /// Wire name, used for logging and metrics labels
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::RoomJoined { .. } => "room_joined",
            ServerEvent::ReceiveMessage(_) => "receive_message",
            ServerEvent::Typing(_) => "typing",
            ServerEvent::ChannelJoined { .. } => "channel_joined",
            ServerEvent::UserJoined { .. } => "user_joined",
            ServerEvent::UserLeft { .. } => "user_left",
            ServerEvent::CallSignal { .. } => "call_signal",
            ServerEvent::Ack { .. } => "ack",
            ServerEvent::Error { .. } => "error",
        }
    }
}
