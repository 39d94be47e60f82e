//! Channel Coordinator
//!
//! Multi-party call channels: which connection currently speaks for each
//! participant, and point-to-point relay of signaling envelopes between them.
//! The coordinator never interprets a signal; it only routes it.
//!
//! A later join for the same (channel, participant) replaces the earlier
//! mapping without notifying the replaced connection.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use serde_json::Value;

use super::connection_registry::ConnectionRegistry;
use crate::domain::{ChannelId, ConnectionId, ParticipantId, ServerEvent};
use crate::shared::error::SignalError;

pub struct ChannelCoordinator {
    registry: Arc<ConnectionRegistry>,
    /// channel -> participant -> connection
    channels: HashMap<ChannelId, BTreeMap<ParticipantId, ConnectionId>>,
    /// connection -> (channel, participant) pairs it currently holds
    memberships: HashMap<ConnectionId, HashSet<(ChannelId, ParticipantId)>>,
}

impl ChannelCoordinator {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            registry,
            channels: HashMap::new(),
            memberships: HashMap::new(),
        }
    }

    /// Map `participant_id` to `connection_id` in the channel and tell everyone
    /// else who arrived. Returns the full participant list for the joiner.
    pub fn join_channel(
        &mut self,
        channel_id: ChannelId,
        participant_id: ParticipantId,
        connection_id: ConnectionId,
    ) -> Vec<ParticipantId> {
        let participants = self.channels.entry(channel_id.clone()).or_default();
        let replaced = participants.insert(participant_id.clone(), connection_id);

        if let Some(previous) = replaced.filter(|previous| *previous != connection_id) {
            tracing::debug!(
                channel_id = %channel_id,
                participant_id = %participant_id,
                previous = %previous,
                current = %connection_id,
                "Participant mapping replaced"
            );
            let key = (channel_id.clone(), participant_id.clone());
            if let Some(held) = self.memberships.get_mut(&previous) {
                held.remove(&key);
                if held.is_empty() {
                    self.memberships.remove(&previous);
                }
            }
        }

        let roster: Vec<ParticipantId> = participants.keys().cloned().collect();
        let others: Vec<ConnectionId> = participants
            .iter()
            .filter(|(participant, _)| **participant != participant_id)
            .map(|(_, connection)| *connection)
            .collect();

        self.memberships
            .entry(connection_id)
            .or_default()
            .insert((channel_id.clone(), participant_id.clone()));

        for peer in others {
            self.send(
                &peer,
                &channel_id,
                ServerEvent::UserJoined {
                    user_id: participant_id.clone(),
                },
            );
        }

        tracing::debug!(
            %connection_id,
            channel_id = %channel_id,
            participant_id = %participant_id,
            participants = roster.len(),
            "Joined channel"
        );
        roster
    }

    /// Forward a signaling envelope to whichever connection currently holds
    /// `target_id`. The sender is never told about an absent or unreachable
    /// target; the error is for the caller's logs only.
    pub fn relay_signal(
        &self,
        channel_id: &str,
        target_id: &str,
        signal_type: String,
        payload: Value,
        sender: ConnectionId,
    ) -> Result<(), SignalError> {
        let target = self
            .channels
            .get(channel_id)
            .and_then(|participants| participants.get(target_id))
            .ok_or_else(|| SignalError::TargetUnavailable(target_id.to_string()))?;

        let sender_id = self.sender_id(&sender, channel_id);
        let event = ServerEvent::CallSignal {
            signal_type,
            payload,
            sender_id,
        };
        if self.send(target, channel_id, event) {
            Ok(())
        } else {
            Err(SignalError::TargetUnavailable(target_id.to_string()))
        }
    }

    /// Remove every mapping the connection still holds and tell the remaining
    /// participants who left. Channels left without participants are removed.
    pub fn leave_all(
        &mut self,
        connection_id: &ConnectionId,
    ) -> Vec<(ChannelId, ParticipantId)> {
        let Some(held) = self.memberships.remove(connection_id) else {
            return Vec::new();
        };

        let mut left = Vec::with_capacity(held.len());
        for (channel_id, participant_id) in held {
            let Some(participants) = self.channels.get_mut(&channel_id) else {
                continue;
            };
            if participants.get(&participant_id) != Some(connection_id) {
                continue;
            }
            participants.remove(&participant_id);

            let remaining: Vec<ConnectionId> = participants
                .values()
                .filter(|peer| *peer != connection_id)
                .copied()
                .collect();
            if participants.is_empty() {
                self.channels.remove(&channel_id);
                tracing::debug!(channel_id = %channel_id, "Channel closed");
            }

            for peer in remaining {
                self.send(
                    &peer,
                    &channel_id,
                    ServerEvent::UserLeft {
                        user_id: participant_id.clone(),
                    },
                );
            }
            left.push((channel_id, participant_id));
        }
        left
    }

    pub fn participants(&self, channel_id: &str) -> Option<Vec<ParticipantId>> {
        self.channels
            .get(channel_id)
            .map(|participants| participants.keys().cloned().collect())
    }

    pub fn connection_for(&self, channel_id: &str, participant_id: &str) -> Option<ConnectionId> {
        self.channels
            .get(channel_id)
            .and_then(|participants| participants.get(participant_id))
            .copied()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Participant id the sender joined `channel_id` under, else its subject id.
    fn sender_id(&self, sender: &ConnectionId, channel_id: &str) -> ParticipantId {
        self.memberships
            .get(sender)
            .and_then(|held| {
                held.iter()
                    .filter(|(channel, _)| channel == channel_id)
                    .map(|(_, participant)| participant)
                    .min()
                    .cloned()
            })
            .or_else(|| self.registry.identity(sender).map(|identity| identity.user_id))
            .unwrap_or_else(|| sender.to_string())
    }

    fn send(&self, connection_id: &ConnectionId, channel_id: &str, event: ServerEvent) -> bool {
        match self.registry.deliver(connection_id, event) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    %connection_id,
                    channel_id,
                    error = %e,
                    "Dropped channel event for peer"
                );
                false
            }
        }
    }
}
