//! Connection Registry
//!
//! Owns every live, authenticated connection together with the sending half of
//! its outbound queue. Rooms and channels refer to connections by id only.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::domain::{ConnectionId, CredentialVerifier, Identity, ServerEvent};
use crate::infrastructure::metrics;
use crate::shared::error::SignalError;

/// One registered connection.
#[derive(Debug)]
pub struct ConnectionEntry {
    pub identity: Identity,
    pub connected_at: DateTime<Utc>,
    sender: mpsc::Sender<ServerEvent>,
}

/// Why an outbound event did not reach a connection's queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    #[error("connection is not registered")]
    Stale,

    #[error("outbound queue is full")]
    Full,

    #[error("connection writer has stopped")]
    Closed,
}

impl DeliveryError {
    fn label(&self) -> &'static str {
        match self {
            DeliveryError::Stale => "stale",
            DeliveryError::Full => "full",
            DeliveryError::Closed => "closed",
        }
    }
}

/// Registry of live connections keyed by connection id.
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, ConnectionEntry>,
    verifier: Arc<dyn CredentialVerifier>,
}

impl ConnectionRegistry {
    pub fn new(verifier: Arc<dyn CredentialVerifier>) -> Self {
        Self {
            connections: DashMap::new(),
            verifier,
        }
    }

    /// Verify `credential` and record the connection as live.
    ///
    /// The verifier is awaited before the table is touched; a rejected
    /// connection is never recorded.
    pub async fn register(
        &self,
        connection_id: ConnectionId,
        credential: Option<&str>,
        sender: mpsc::Sender<ServerEvent>,
    ) -> Result<Identity, SignalError> {
        let token = credential
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| SignalError::AuthRejected("missing credential".into()))?;

        let identity = self.verifier.verify(token).await.map_err(|e| {
            tracing::debug!(%connection_id, error = %e, "Credential rejected");
            SignalError::AuthRejected(e.to_string())
        })?;

        self.connections.insert(
            connection_id,
            ConnectionEntry {
                identity: identity.clone(),
                connected_at: Utc::now(),
                sender,
            },
        );
        metrics::set_connections(self.connections.len());

        tracing::info!(
            %connection_id,
            user_id = %identity.user_id,
            "Connection registered"
        );

        Ok(identity)
    }

    /// Remove a connection. Returns the entry the first time, `None` after.
    pub fn unregister(&self, connection_id: &ConnectionId) -> Option<ConnectionEntry> {
        let removed = self.connections.remove(connection_id).map(|(_, entry)| entry);
        if let Some(entry) = &removed {
            metrics::set_connections(self.connections.len());
            tracing::info!(
                %connection_id,
                user_id = %entry.identity.user_id,
                connected_secs = (Utc::now() - entry.connected_at).num_seconds(),
                "Connection unregistered"
            );
        }
        removed
    }

    pub fn is_live(&self, connection_id: &ConnectionId) -> bool {
        self.connections.contains_key(connection_id)
    }

    pub fn identity(&self, connection_id: &ConnectionId) -> Option<Identity> {
        self.connections
            .get(connection_id)
            .map(|entry| entry.identity.clone())
    }

    /// Hand `event` to the connection's outbound queue without waiting.
    pub fn deliver(
        &self,
        connection_id: &ConnectionId,
        event: ServerEvent,
    ) -> Result<(), DeliveryError> {
        let result = match self.connections.get(connection_id) {
            None => Err(DeliveryError::Stale),
            Some(entry) => entry.sender.try_send(event).map_err(|e| match e {
                TrySendError::Full(_) => DeliveryError::Full,
                TrySendError::Closed(_) => DeliveryError::Closed,
            }),
        };

        if let Err(e) = &result {
            metrics::record_delivery_failure(e.label());
        }
        result
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
