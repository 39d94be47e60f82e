//! # Signal Server
//!
//! Entry point. Initializes:
//! - Tracing/logging subsystem
//! - Configuration loading
//! - Optional message database
//! - HTTP/WebSocket server

use anyhow::Result;
use tracing::info;

use signal_server::config::Settings;
use signal_server::startup::Application;

#[tokio::main]
async fn main() -> Result<()> {
    signal_server::telemetry::init_tracing();

    info!("Starting Signal Server...");

    // Load configuration from environment and config files
    let settings = Settings::load()?;
    info!(
        host = %settings.server.host,
        port = %settings.server.port,
        environment = %settings.environment,
        persistence = settings.database.url.is_some(),
        "Configuration loaded"
    );

    let application = Application::build(settings).await?;

    info!("Server ready to accept connections");
    application.run_until_stopped().await?;

    info!("Server stopped");
    Ok(())
}
