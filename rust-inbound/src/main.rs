//! Mailgun inbound web server.
//!
//! Receives Mailgun inbound-route webhooks, downloads stored attachments,
//! and answers with the normalized message record.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use reqwest::Client;
use tokio::{net::TcpListener, signal};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mailgun_inbound::web::{health, mailgun_webhook, AppState};
use mailgun_inbound::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("web_server_starting");

    // Load configuration
    let config = Config::from_env();
    info!(
        port = config.port,
        mailgun_api_key_configured = config.mailgun_api_key.is_some(),
        request_timeout_ms = config.request_timeout_ms,
        attachment_dir = ?config.attachment_dir,
        allow_insecure_attachment_urls = config.allow_insecure_attachment_urls,
        "config_loaded"
    );

    if config.mailgun_api_key.is_none() {
        warn!("mailgun_api_key_not_configured");
    }

    let client = Client::builder()
        .build()
        .context("Failed to build HTTP client")?;

    let state = AppState::new(&config, client);

    // Build the router
    let app = Router::new()
        .route("/health", get(health))
        .route("/webhooks/mailgun", post(mailgun_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "web_server_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("web_server_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("web_server_shutting_down");
}
