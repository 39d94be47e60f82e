//! Signaling Gateway
//!
//! Turns inbound frames into hub operations for one connection and decides
//! what, if anything, goes straight back to the sender.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::messages::{
    ClientEvent, ClientFrame, CALL_SIGNAL, JOIN_CALL, JOIN_ROOM, SEND_MESSAGE, TYPING,
};
use super::session::SessionState;
use crate::application::services::{ConnectionRegistry, HubStats, SignalingHub};
use crate::domain::{ChatMessage, ConnectionId, Identity, MessageSink, ServerEvent};
use crate::infrastructure::metrics;
use crate::shared::error::SignalError;

pub const SEND_FAILED: &str = "Failed to send message";

pub struct SignalingGateway {
    registry: Arc<ConnectionRegistry>,
    hub: SignalingHub,
    writes: mpsc::Sender<ChatMessage>,
}

impl SignalingGateway {
    /// Must be called inside a Tokio runtime: starts the message writer task.
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        hub: SignalingHub,
        sink: Arc<dyn MessageSink>,
        write_queue_capacity: usize,
    ) -> Self {
        Self {
            registry,
            hub,
            writes: spawn_writer(sink, write_queue_capacity),
        }
    }

    /// Verify the handshake credential and register the connection.
    pub async fn authenticate(
        &self,
        session: &mut SessionState,
        credential: Option<&str>,
        sender: mpsc::Sender<ServerEvent>,
    ) -> Result<Identity, SignalError> {
        let identity = self
            .registry
            .register(session.connection_id, credential, sender)
            .await?;
        session.authenticate(identity.clone());
        Ok(identity)
    }

    /// Handle one text frame. Returns the event to send straight back to the
    /// sender, if any.
    pub async fn dispatch(&self, connection_id: ConnectionId, text: &str) -> Option<ServerEvent> {
        if !self.registry.is_live(&connection_id) {
            metrics::record_event("unknown", "rejected");
            return Some(ServerEvent::error("Not authenticated"));
        }

        let frame: ClientFrame = match serde_json::from_str(text) {
            Ok(frame) => frame,
            Err(e) => {
                metrics::record_event("unknown", "malformed");
                tracing::debug!(%connection_id, error = %e, "Unparseable frame");
                return Some(ServerEvent::error(format!("Invalid message: {e}")));
            }
        };

        let label = metric_label(&frame.event);
        let ack_id = frame.id;
        match ClientEvent::parse(&frame.event, frame.data) {
            Ok(event) => self.handle(connection_id, event, ack_id).await,
            Err(e) => {
                metrics::record_event(label, "malformed");
                self.reject(connection_id, &frame.event, ack_id, e)
            }
        }
    }

    async fn handle(
        &self,
        connection_id: ConnectionId,
        event: ClientEvent,
        ack_id: Option<u64>,
    ) -> Option<ServerEvent> {
        match event {
            ClientEvent::JoinRoom(payload) => {
                let result = self.hub.join_room(payload.room_id, connection_id).await;
                self.record(JOIN_ROOM, &result);
                Some(result.unwrap_or_else(|e| self.failure(connection_id, JOIN_ROOM, e)))
            }

            ClientEvent::SendMessage(payload) => {
                let room_id = payload.room_id;
                let result = self
                    .hub
                    .relay_message(room_id.clone(), connection_id, payload.fields)
                    .await;
                self.record(SEND_MESSAGE, &result);

                match result {
                    Ok(receipt) => {
                        self.persist(ChatMessage::new(
                            room_id,
                            self.sender_id(&connection_id),
                            receipt.message,
                            receipt.sent_at,
                        ));
                        Some(ServerEvent::ack_success(ack_id))
                    }
                    Err(e) => {
                        tracing::error!(%connection_id, error = %e, "Message relay failed");
                        Some(ServerEvent::ack_failure(ack_id, SEND_FAILED))
                    }
                }
            }

            ClientEvent::Typing(payload) => {
                let result = self
                    .hub
                    .relay_typing(payload.room_id, connection_id, payload.fields)
                    .await;
                self.record(TYPING, &result);
                if let Err(e) = result {
                    tracing::warn!(%connection_id, error = %e, "Typing relay failed");
                }
                None
            }

            ClientEvent::JoinCall(payload) => {
                let result = self
                    .hub
                    .join_channel(payload.channel_id, payload.user_id, connection_id)
                    .await;
                self.record(JOIN_CALL, &result);
                Some(result.unwrap_or_else(|e| self.failure(connection_id, JOIN_CALL, e)))
            }

            ClientEvent::CallSignal(payload) => {
                let result = self
                    .hub
                    .relay_signal(
                        payload.channel_id,
                        payload.target_id,
                        payload.signal_type,
                        payload.payload,
                        connection_id,
                    )
                    .await;
                self.record(CALL_SIGNAL, &result);
                if let Err(e) = result {
                    tracing::warn!(%connection_id, error = %e, "Signal relay failed");
                }
                None
            }
        }
    }

    /// Reply for a frame that named an event but failed to parse.
    fn reject(
        &self,
        connection_id: ConnectionId,
        event: &str,
        ack_id: Option<u64>,
        error: SignalError,
    ) -> Option<ServerEvent> {
        tracing::debug!(%connection_id, event, error = %error, "Malformed event");
        match event {
            SEND_MESSAGE => Some(ServerEvent::ack_failure(ack_id, SEND_FAILED)),
            TYPING | CALL_SIGNAL => None,
            _ => Some(ServerEvent::error(error.to_string())),
        }
    }

    fn failure(&self, connection_id: ConnectionId, event: &str, error: SignalError) -> ServerEvent {
        tracing::error!(%connection_id, event, error = %error, "Hub operation failed");
        ServerEvent::error(error.to_string())
    }

    fn record<T>(&self, event: &'static str, result: &Result<T, SignalError>) {
        let outcome = if result.is_ok() { "ok" } else { "failed" };
        metrics::record_event(event, outcome);
    }

    fn sender_id(&self, connection_id: &ConnectionId) -> String {
        self.registry
            .identity(connection_id)
            .map(|identity| identity.user_id)
            .unwrap_or_else(|| connection_id.to_string())
    }

    /// Queue the relayed message for the writer task. The sender's
    /// acknowledgment never waits on or reflects the outcome; a full queue
    /// drops the message.
    fn persist(&self, message: ChatMessage) {
        match self.writes.try_send(message) {
            Ok(()) => {}
            Err(TrySendError::Full(message)) => {
                metrics::record_persist_dropped();
                tracing::warn!(message_id = %message.id, "Write queue full, message not stored");
            }
            Err(TrySendError::Closed(message)) => {
                metrics::record_persist_dropped();
                tracing::error!(
                    message_id = %message.id,
                    "Message writer stopped, message not stored"
                );
            }
        }
    }

    /// Remove the connection from the hub, then from the registry.
    ///
    /// Returns `false` if the connection was already torn down.
    pub async fn teardown(&self, connection_id: ConnectionId) -> bool {
        if !self.registry.is_live(&connection_id) {
            return false;
        }

        match self.hub.disconnect(connection_id).await {
            Ok(summary) => tracing::debug!(
                %connection_id,
                rooms = summary.rooms.len(),
                channels = summary.channels.len(),
                "Connection left rooms and channels"
            ),
            Err(e) => tracing::warn!(%connection_id, error = %e, "Hub disconnect failed"),
        }

        self.registry.unregister(&connection_id).is_some()
    }

    pub async fn stats(&self) -> Result<HubStats, SignalError> {
        self.hub.stats().await
    }

    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }
}

/// One task drains queued messages into the sink, so at most one write is in
/// flight and at most `capacity` wait behind it.
fn spawn_writer(sink: Arc<dyn MessageSink>, capacity: usize) -> mpsc::Sender<ChatMessage> {
    let (writes, mut queue) = mpsc::channel::<ChatMessage>(capacity);
    tokio::spawn(async move {
        while let Some(message) = queue.recv().await {
            let message_id = message.id;
            if let Err(e) = sink.persist(message).await {
                tracing::warn!(%message_id, error = %e, "Failed to persist message");
            }
        }
        tracing::debug!("Message writer stopped");
    });
    writes
}

fn metric_label(event: &str) -> &'static str {
    match event {
        JOIN_ROOM => JOIN_ROOM,
        SEND_MESSAGE => SEND_MESSAGE,
        TYPING => TYPING,
        JOIN_CALL => JOIN_CALL,
        CALL_SIGNAL => CALL_SIGNAL,
        _ => "unknown",
    }
}
