//! Room Broadcaster
//!
//! Chat-room membership and one-to-many relay of messages and typing
//! indicators. Owned by the signaling hub; every method runs on the hub task.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

use super::connection_registry::ConnectionRegistry;
use crate::domain::{ConnectionId, RoomId, ServerEvent};

/// Result of relaying one chat message.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayReceipt {
    /// Peers whose queue accepted the message
    pub delivered: usize,
    /// The message exactly as peers received it
    pub message: Map<String, Value>,
    pub sent_at: DateTime<Utc>,
}

pub struct RoomBroadcaster {
    registry: Arc<ConnectionRegistry>,
    /// room -> members
    rooms: HashMap<RoomId, HashSet<ConnectionId>>,
    /// connection -> rooms it joined (reverse index)
    memberships: HashMap<ConnectionId, HashSet<RoomId>>,
}

impl RoomBroadcaster {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            registry,
            rooms: HashMap::new(),
            memberships: HashMap::new(),
        }
    }

    /// Add the connection to the room, creating the room if needed. Returns
    /// `false` if it was already a member. Members are not notified; the
    /// joiner's confirmation is the caller's reply.
    pub fn join(&mut self, room_id: RoomId, connection_id: ConnectionId) -> bool {
        let added = self
            .rooms
            .entry(room_id.clone())
            .or_default()
            .insert(connection_id);
        self.memberships
            .entry(connection_id)
            .or_default()
            .insert(room_id.clone());

        tracing::debug!(%connection_id, room_id = %room_id, added, "Joined room");
        added
    }

    /// Relay a chat message to every other member of the room, stamped with
    /// the room id and the server delivery time.
    pub fn relay_message(
        &self,
        room_id: &str,
        sender: ConnectionId,
        mut message: Map<String, Value>,
    ) -> RelayReceipt {
        let sent_at = Utc::now();
        message.insert("roomId".into(), Value::String(room_id.to_string()));
        message.insert(
            "timestamp".into(),
            Value::String(sent_at.to_rfc3339_opts(SecondsFormat::Millis, true)),
        );

        let delivered = self.fan_out(
            room_id,
            sender,
            ServerEvent::ReceiveMessage(message.clone()),
        );
        tracing::debug!(%sender, room_id, delivered, "Message relayed");

        RelayReceipt {
            delivered,
            message,
            sent_at,
        }
    }

    /// Relay a typing indicator to every other member of the room.
    pub fn relay_typing(
        &self,
        room_id: &str,
        sender: ConnectionId,
        mut payload: Map<String, Value>,
    ) -> usize {
        payload.insert("roomId".into(), Value::String(room_id.to_string()));
        self.fan_out(room_id, sender, ServerEvent::Typing(payload))
    }

    /// Drop the connection from every room it joined. Empty rooms are removed.
    pub fn leave_all(&mut self, connection_id: &ConnectionId) -> Vec<RoomId> {
        let Some(joined) = self.memberships.remove(connection_id) else {
            return Vec::new();
        };

        let mut left = Vec::with_capacity(joined.len());
        for room_id in joined {
            if let Some(members) = self.rooms.get_mut(&room_id) {
                members.remove(connection_id);
                if members.is_empty() {
                    self.rooms.remove(&room_id);
                    tracing::debug!(room_id = %room_id, "Room emptied");
                }
            }
            left.push(room_id);
        }
        left
    }

    pub fn members(&self, room_id: &str) -> Option<&HashSet<ConnectionId>> {
        self.rooms.get(room_id)
    }

    pub fn rooms_of(&self, connection_id: &ConnectionId) -> Option<&HashSet<RoomId>> {
        self.memberships.get(connection_id)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    fn fan_out(&self, room_id: &str, sender: ConnectionId, event: ServerEvent) -> usize {
        let Some(members) = self.rooms.get(room_id) else {
            return 0;
        };

        let mut delivered = 0;
        for peer in members.iter().filter(|peer| **peer != sender) {
            match self.registry.deliver(peer, event.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => tracing::warn!(
                    connection_id = %peer,
                    room_id,
                    event = event.name(),
                    error = %e,
                    "Dropped room event for peer"
                ),
            }
        }
        delivered
    }
}
