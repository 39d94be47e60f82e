//! Application Startup
//!
//! Application building and server initialization.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;

use crate::application::services::{ConnectionRegistry, SignalingHub};
use crate::config::Settings;
use crate::domain::{CredentialVerifier, MessageSink};
use crate::infrastructure::auth::JwtCredentialVerifier;
use crate::infrastructure::database;
use crate::infrastructure::repositories::{LoggingMessageSink, PgMessageSink};
use crate::presentation::http::{handlers, routes};
use crate::presentation::middleware::{create_cors_layer, create_trace_layer};
use crate::presentation::websocket::SignalingGateway;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<SignalingGateway>,
    pub settings: Arc<Settings>,
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
    hub: SignalingHub,
    hub_task: JoinHandle<()>,
}

impl Application {
    /// Build the application from settings
    pub async fn build(settings: Settings) -> Result<Self> {
        let verifier: Arc<dyn CredentialVerifier> =
            Arc::new(JwtCredentialVerifier::new(&settings.jwt));

        let sink: Arc<dyn MessageSink> = match settings.database.url.as_deref() {
            Some(url) => {
                let pool = database::create_pool(&settings.database, url).await?;
                database::run_migrations(&pool).await?;
                tracing::info!("Database connection pool created");
                Arc::new(PgMessageSink::new(pool))
            }
            None => {
                tracing::info!("No database configured, relayed messages are not stored");
                Arc::new(LoggingMessageSink)
            }
        };

        Self::build_with(settings, verifier, sink).await
    }

    /// Build the application around the given collaborators.
    pub async fn build_with(
        settings: Settings,
        verifier: Arc<dyn CredentialVerifier>,
        sink: Arc<dyn MessageSink>,
    ) -> Result<Self> {
        handlers::health::init_server_start();

        let registry = Arc::new(ConnectionRegistry::new(verifier));
        let (hub, hub_task) =
            SignalingHub::spawn(registry.clone(), settings.hub.command_queue_capacity);
        let gateway = Arc::new(SignalingGateway::new(
            registry,
            hub.clone(),
            sink,
            settings.database.write_queue_capacity,
        ));

        let state = AppState {
            gateway,
            settings: Arc::new(settings.clone()),
        };

        // Build router with middleware
        let router = routes::create_router(state).layer(
            ServiceBuilder::new()
                .layer(create_trace_layer())
                .layer(create_cors_layer(&settings.cors)),
        );

        // Bind to address
        let addr = settings.server.socket_addr()?;
        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            router,
            hub,
            hub_task,
        })
    }

    /// Run the server until Ctrl-C or SIGTERM, then stop the hub.
    pub async fn run_until_stopped(self) -> Result<()> {
        self.run_until(shutdown_signal()).await
    }

    /// Run the server until `signal` resolves, then stop the hub.
    pub async fn run_until<F>(self, signal: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(signal)
            .await?;

        tracing::info!("HTTP server stopped, shutting down signaling hub");
        if let Err(e) = self.hub.shutdown().await {
            tracing::warn!(error = %e, "Signaling hub already stopped");
        }
        self.hub_task.await?;
        Ok(())
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
