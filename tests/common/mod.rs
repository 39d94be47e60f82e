//! Common Test Utilities
//!
//! Shared helpers, fixtures, and test infrastructure.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use futures::{SinkExt, StreamExt};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use signal_server::application::services::{ConnectionRegistry, SignalingHub};
use signal_server::config::{
    CorsSettings, DatabaseSettings, HubSettings, JwtSettings, ServerSettings, Settings,
    WebSocketSettings,
};
use signal_server::infrastructure::auth::JwtCredentialVerifier;
use signal_server::infrastructure::repositories::LoggingMessageSink;
use signal_server::presentation::http::routes;
use signal_server::presentation::websocket::SignalingGateway;
use signal_server::startup::{AppState, Application};

pub const TEST_SECRET: &str = "integration-test-secret-at-least-32-chars";

pub fn test_settings() -> Settings {
    Settings {
        server: ServerSettings {
            host: "127.0.0.1".into(),
            port: 0,
        },
        database: DatabaseSettings {
            url: None,
            max_connections: 1,
            min_connections: 0,
            acquire_timeout: 1,
            write_queue_capacity: 16,
        },
        jwt: JwtSettings {
            secret: TEST_SECRET.into(),
        },
        cors: CorsSettings {
            allowed_origins: vec![],
        },
        websocket: WebSocketSettings {
            max_message_size: 1_000_000,
            max_frame_size: 1_000_000,
            ping_interval_ms: 25_000,
            idle_timeout_ms: 60_000,
            outbound_queue_capacity: 64,
        },
        hub: HubSettings {
            command_queue_capacity: 64,
        },
        environment: "test".into(),
    }
}

/// Signed token for `user_id`, valid for an hour.
pub fn token_for(user_id: &str) -> String {
    token_with_exp(user_id, chrono::Utc::now().timestamp() + 3600)
}

pub fn token_with_exp(user_id: &str, exp: i64) -> String {
    encode(
        &Header::default(),
        &json!({"id": user_id, "email": format!("{user_id}@example.com"), "exp": exp}),
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .unwrap()
}

/// Router over a fresh hub, for in-process HTTP tests.
pub fn test_router() -> Router {
    let settings = test_settings();
    let registry = Arc::new(ConnectionRegistry::new(Arc::new(
        JwtCredentialVerifier::new(&settings.jwt),
    )));
    let (hub, _task) = SignalingHub::spawn(registry.clone(), settings.hub.command_queue_capacity);
    let gateway = Arc::new(SignalingGateway::new(
        registry,
        hub,
        Arc::new(LoggingMessageSink),
        settings.database.write_queue_capacity,
    ));

    routes::create_router(AppState {
        gateway,
        settings: Arc::new(settings),
    })
}

/// A real server bound to an ephemeral port.
pub struct TestApp {
    pub addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(test_settings()).await
    }

    pub async fn spawn_with(settings: Settings) -> Self {
        let app = Application::build_with(
            settings,
            Arc::new(JwtCredentialVerifier::new(&JwtSettings {
                secret: TEST_SECRET.into(),
            })),
            Arc::new(LoggingMessageSink),
        )
        .await
        .expect("application builds");
        let addr = app.local_addr().unwrap();

        let (shutdown, stopped) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            app.run_until(async {
                let _ = stopped.await;
            })
            .await
            .expect("server runs");
        });

        Self {
            addr,
            shutdown: Some(shutdown),
            task,
        }
    }

    pub fn socket_url(&self) -> String {
        format!("ws://{}/socket", self.addr)
    }

    /// Connect with the token in the `Authorization` header.
    pub async fn connect(&self, user_id: &str) -> TestClient {
        let mut request = self.socket_url().into_client_request().unwrap();
        request.headers_mut().insert(
            "Authorization",
            HeaderValue::from_str(&format!("Bearer {}", token_for(user_id))).unwrap(),
        );
        let (stream, _) = connect_async(request).await.expect("handshake succeeds");
        TestClient { stream }
    }

    /// Connect with the token in the query string.
    pub async fn connect_with_query(&self, user_id: &str) -> TestClient {
        let url = format!("{}?token={}", self.socket_url(), token_for(user_id));
        let (stream, _) = connect_async(url).await.expect("handshake succeeds");
        TestClient { stream }
    }

    /// Trigger graceful shutdown and wait for the server and hub to stop.
    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        let _ = self.task.await;
    }
}

pub struct TestClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TestClient {
    pub async fn emit(&mut self, event: &str, data: Value) {
        self.send(json!({"event": event, "data": data})).await;
    }

    pub async fn emit_with_ack(&mut self, event: &str, data: Value, id: u64) {
        self.send(json!({"event": event, "data": data, "id": id}))
            .await;
    }

    pub async fn send(&mut self, frame: Value) {
        self.stream
            .send(Message::Text(frame.to_string().into()))
            .await
            .unwrap();
    }

    /// Next JSON event, skipping control frames. Panics after two seconds.
    pub async fn next_event(&mut self) -> Value {
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                match self.stream.next().await {
                    Some(Ok(Message::Text(text))) => {
                        return serde_json::from_str::<Value>(text.as_str()).unwrap()
                    }
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                    other => panic!("unexpected frame: {other:?}"),
                }
            }
        })
        .await
        .expect("event arrives in time")
    }

    /// Next event with the given name, skipping others.
    pub async fn expect_event(&mut self, name: &str) -> Value {
        loop {
            let event = self.next_event().await;
            if event["event"] == name {
                return event["data"].clone();
            }
        }
    }

    /// Assert nothing arrives for a short while.
    pub async fn expect_silence(&mut self) {
        let result = tokio::time::timeout(Duration::from_millis(200), self.stream.next()).await;
        assert!(result.is_err(), "unexpected frame: {result:?}");
    }

    pub async fn close(mut self) {
        let _ = self.stream.close(None).await;
    }
}
