//! Signaling Hub
//!
//! A single task owns the room and channel tables. Everything that reads or
//! mutates them is sent to that task as a [`HubCommand`]; callers hold a
//! cheap [`SignalingHub`] handle.
//!
//! Join confirmations travel back on the command's reply channel so the
//! joiner's own socket loop delivers them; only peers are reached through
//! their outbound queues.

use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::channel_coordinator::ChannelCoordinator;
use super::connection_registry::ConnectionRegistry;
use super::room_broadcaster::{RelayReceipt, RoomBroadcaster};
use crate::domain::{ChannelId, ConnectionId, ParticipantId, RoomId, ServerEvent};
use crate::shared::error::SignalError;

/// What a connection was removed from on disconnect.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisconnectSummary {
    pub rooms: Vec<RoomId>,
    pub channels: Vec<(ChannelId, ParticipantId)>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HubStats {
    pub rooms: usize,
    pub channels: usize,
}

#[derive(Debug)]
pub enum HubCommand {
    JoinRoom {
        room_id: RoomId,
        connection_id: ConnectionId,
        reply: oneshot::Sender<ServerEvent>,
    },
    RelayMessage {
        room_id: RoomId,
        sender: ConnectionId,
        message: Map<String, Value>,
        reply: oneshot::Sender<RelayReceipt>,
    },
    RelayTyping {
        room_id: RoomId,
        sender: ConnectionId,
        payload: Map<String, Value>,
    },
    JoinChannel {
        channel_id: ChannelId,
        participant_id: ParticipantId,
        connection_id: ConnectionId,
        reply: oneshot::Sender<ServerEvent>,
    },
    RelaySignal {
        channel_id: ChannelId,
        target_id: ParticipantId,
        signal_type: String,
        payload: Value,
        sender: ConnectionId,
    },
    Disconnect {
        connection_id: ConnectionId,
        reply: oneshot::Sender<DisconnectSummary>,
    },
    Stats {
        reply: oneshot::Sender<HubStats>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Handle to the hub task.
#[derive(Clone)]
pub struct SignalingHub {
    commands: mpsc::Sender<HubCommand>,
}

impl SignalingHub {
    /// Start the hub task. The returned handle is the only way to reach it.
    pub fn spawn(
        registry: Arc<ConnectionRegistry>,
        capacity: usize,
    ) -> (SignalingHub, JoinHandle<()>) {
        let (commands, inbox) = mpsc::channel(capacity);
        let worker = HubWorker {
            rooms: RoomBroadcaster::new(registry.clone()),
            channels: ChannelCoordinator::new(registry),
            inbox,
        };
        let task = tokio::spawn(worker.run());
        (SignalingHub { commands }, task)
    }

    /// Returns the `room_joined` confirmation for the joiner.
    pub async fn join_room(
        &self,
        room_id: RoomId,
        connection_id: ConnectionId,
    ) -> Result<ServerEvent, SignalError> {
        self.request(|reply| HubCommand::JoinRoom {
            room_id,
            connection_id,
            reply,
        })
        .await
    }

    pub async fn relay_message(
        &self,
        room_id: RoomId,
        sender: ConnectionId,
        message: Map<String, Value>,
    ) -> Result<RelayReceipt, SignalError> {
        self.request(|reply| HubCommand::RelayMessage {
            room_id,
            sender,
            message,
            reply,
        })
        .await
    }

    pub async fn relay_typing(
        &self,
        room_id: RoomId,
        sender: ConnectionId,
        payload: Map<String, Value>,
    ) -> Result<(), SignalError> {
        self.send(HubCommand::RelayTyping {
            room_id,
            sender,
            payload,
        })
        .await
    }

    /// Returns the `channel_joined` roster for the joiner.
    pub async fn join_channel(
        &self,
        channel_id: ChannelId,
        participant_id: ParticipantId,
        connection_id: ConnectionId,
    ) -> Result<ServerEvent, SignalError> {
        self.request(|reply| HubCommand::JoinChannel {
            channel_id,
            participant_id,
            connection_id,
            reply,
        })
        .await
    }

    pub async fn relay_signal(
        &self,
        channel_id: ChannelId,
        target_id: ParticipantId,
        signal_type: String,
        payload: Value,
        sender: ConnectionId,
    ) -> Result<(), SignalError> {
        self.send(HubCommand::RelaySignal {
            channel_id,
            target_id,
            signal_type,
            payload,
            sender,
        })
        .await
    }

    /// Remove the connection from every room, then every channel.
    pub async fn disconnect(
        &self,
        connection_id: ConnectionId,
    ) -> Result<DisconnectSummary, SignalError> {
        self.request(|reply| HubCommand::Disconnect {
            connection_id,
            reply,
        })
        .await
    }

    pub async fn stats(&self) -> Result<HubStats, SignalError> {
        self.request(|reply| HubCommand::Stats { reply }).await
    }

    /// Drop all tables and stop the task. Later calls fail with `InternalFailure`.
    pub async fn shutdown(&self) -> Result<(), SignalError> {
        self.request(|reply| HubCommand::Shutdown { reply }).await
    }

    async fn send(&self, command: HubCommand) -> Result<(), SignalError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| hub_stopped())
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> HubCommand,
    ) -> Result<T, SignalError> {
        let (reply, response) = oneshot::channel();
        self.send(command(reply)).await?;
        response.await.map_err(|_| hub_stopped())
    }
}

fn hub_stopped() -> SignalError {
    SignalError::InternalFailure("signaling hub stopped".into())
}

struct HubWorker {
    rooms: RoomBroadcaster,
    channels: ChannelCoordinator,
    inbox: mpsc::Receiver<HubCommand>,
}

impl HubWorker {
    async fn run(mut self) {
        tracing::debug!("Signaling hub started");

        while let Some(command) = self.inbox.recv().await {
            match command {
                HubCommand::JoinRoom {
                    room_id,
                    connection_id,
                    reply,
                } => {
                    self.rooms.join(room_id.clone(), connection_id);
                    let _ = reply.send(ServerEvent::room_joined(room_id));
                }
                HubCommand::RelayMessage {
                    room_id,
                    sender,
                    message,
                    reply,
                } => {
                    let receipt = self.rooms.relay_message(&room_id, sender, message);
                    let _ = reply.send(receipt);
                }
                HubCommand::RelayTyping {
                    room_id,
                    sender,
                    payload,
                } => {
                    self.rooms.relay_typing(&room_id, sender, payload);
                }
                HubCommand::JoinChannel {
                    channel_id,
                    participant_id,
                    connection_id,
                    reply,
                } => {
                    let participants =
                        self.channels
                            .join_channel(channel_id, participant_id, connection_id);
                    let _ = reply.send(ServerEvent::ChannelJoined { participants });
                }
                HubCommand::RelaySignal {
                    channel_id,
                    target_id,
                    signal_type,
                    payload,
                    sender,
                } => {
                    if let Err(e) = self.channels.relay_signal(
                        &channel_id,
                        &target_id,
                        signal_type,
                        payload,
                        sender,
                    ) {
                        tracing::trace!(
                            %sender,
                            channel_id = %channel_id,
                            error = %e,
                            "Signal dropped"
                        );
                    }
                }
                HubCommand::Disconnect {
                    connection_id,
                    reply,
                } => {
                    let rooms = self.rooms.leave_all(&connection_id);
                    let channels = self.channels.leave_all(&connection_id);
                    tracing::debug!(
                        %connection_id,
                        rooms = rooms.len(),
                        channels = channels.len(),
                        "Connection removed from hub"
                    );
                    let _ = reply.send(DisconnectSummary { rooms, channels });
                }
                HubCommand::Stats { reply } => {
                    let _ = reply.send(HubStats {
                        rooms: self.rooms.room_count(),
                        channels: self.channels.channel_count(),
                    });
                }
                HubCommand::Shutdown { reply } => {
                    tracing::info!(
                        rooms = self.rooms.room_count(),
                        channels = self.channels.channel_count(),
                        "Signaling hub shutting down"
                    );
                    let _ = reply.send(());
                    break;
                }
            }
        }

        tracing::debug!("Signaling hub stopped");
    }
}
