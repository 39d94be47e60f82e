//! WebSocket Connection Handler
//!
//! Authenticates the handshake, upgrades, then runs one reader loop and one
//! writer task per connection until the transport goes away.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant};

use super::gateway::SignalingGateway;
use super::session::SessionState;
use crate::config::WebSocketSettings;
use crate::domain::{ConnectionId, ServerEvent};
use crate::shared::error::AppError;
use crate::startup::AppState;

/// Handshake query parameters
#[derive(Debug, Default, Deserialize)]
pub struct HandshakeQuery {
    pub token: Option<String>,
}

/// WebSocket upgrade handler.
///
/// The credential is taken from `Authorization: Bearer` or, failing that, the
/// `token` query parameter. A rejected credential answers 401 and no socket is
/// ever opened.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<HandshakeQuery>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
) -> Result<Response, AppError> {
    let credential = bearer
        .map(|TypedHeader(auth)| auth.token().to_string())
        .or(query.token);

    let settings = state.settings.websocket.clone();
    let (tx, rx) = mpsc::channel(settings.outbound_queue_capacity);
    let mut session = SessionState::new(ConnectionId::new());
    let connection_id = session.connection_id;

    state
        .gateway
        .authenticate(&mut session, credential.as_deref(), tx.clone())
        .await?;

    let gateway = state.gateway.clone();
    let failed = state.gateway.clone();

    Ok(ws
        .max_message_size(settings.max_message_size)
        .max_frame_size(settings.max_frame_size)
        .on_failed_upgrade(move |error| {
            tracing::warn!(%connection_id, %error, "WebSocket upgrade failed");
            tokio::spawn(async move {
                failed.teardown(connection_id).await;
            });
        })
        .on_upgrade(move |socket| handle_socket(socket, session, gateway, tx, rx, settings)))
}

/// Handle individual WebSocket connection
async fn handle_socket(
    socket: WebSocket,
    mut session: SessionState,
    gateway: Arc<SignalingGateway>,
    tx: mpsc::Sender<ServerEvent>,
    mut rx: mpsc::Receiver<ServerEvent>,
    settings: WebSocketSettings,
) {
    let connection_id = session.connection_id;
    session.activate();
    tracing::debug!(%connection_id, "WebSocket session active");

    let ping_every = Duration::from_millis(settings.ping_interval_ms);
    let idle_timeout = Duration::from_millis(settings.idle_timeout_ms);

    // Split socket for concurrent read/write
    let (mut sender, mut receiver) = socket.split();

    let writer = tokio::spawn(async move {
        let mut ping = interval_at(Instant::now() + ping_every, ping_every);
        loop {
            tokio::select! {
                event = rx.recv() => {
                    let Some(event) = event else { break };
                    let text = match serde_json::to_string(&event) {
                        Ok(text) => text,
                        Err(e) => {
                            tracing::error!(%connection_id, error = %e, "Failed to serialize event");
                            continue;
                        }
                    };
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                _ = ping.tick() => {
                    if sender.send(Message::Ping(Bytes::new())).await.is_err() {
                        break;
                    }
                }
            }
        }
        let _ = sender.close().await;
    });

    let mut idle_check = interval_at(Instant::now() + ping_every, ping_every);

    loop {
        tokio::select! {
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        session.touch();
                        if let Some(reply) = gateway.dispatch(connection_id, text.as_str()).await {
                            if tx.send(reply).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Binary(_))) => {
                        session.touch();
                        let reply = ServerEvent::error("Binary frames are not supported");
                        if tx.send(reply).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                        // Pong replies are sent by axum
                        session.touch();
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::debug!(%connection_id, "Connection closed");
                        break;
                    }
                    Some(Err(e)) => {
                        tracing::debug!(%connection_id, error = %e, "WebSocket error");
                        break;
                    }
                }
            }

            _ = idle_check.tick() => {
                if !session.is_alive(idle_timeout) {
                    tracing::info!(%connection_id, "Idle timeout, closing connection");
                    break;
                }
            }
        }
    }

    session.close();
    gateway.teardown(connection_id).await;
    drop(tx);
    writer.abort();

    tracing::info!(
        %connection_id,
        user_id = session.identity.as_ref().map(|i| i.user_id.as_str()).unwrap_or_default(),
        "User disconnected"
    );
}
