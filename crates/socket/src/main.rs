//! Draughts socket - command line client
//!
//! Connects to the endpoint configured through `DRAUGHTS_SOCKET_*` variables
//! and logs everything the server pushes until Ctrl+C.

use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use draughts_socket::{
    create_socket, topics, DesktopStorageProvider, EventBus, SocketHandlers, SocketSettings,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "draughts_socket=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = SocketSettings::from_env()?;
    tracing::info!(
        path = %settings.path,
        base_urls = ?settings.options.base_urls,
        version = ?settings.version,
        "Starting draughts socket"
    );

    let bus = EventBus::new();
    bus.subscribe(topics::OPEN, |payload| {
        tracing::info!(%payload, "Online");
    });
    bus.subscribe(topics::OFFLINE, |_| {
        tracing::warn!("Offline, reconnecting");
    });
    bus.subscribe(topics::REDIRECT, |payload| {
        tracing::info!(%payload, "Redirect");
    });
    bus.subscribe(topics::RESYNC, |payload| {
        tracing::warn!(%payload, "Server state lost, a full reload is required");
    });

    let handlers = SocketHandlers::new().with_receive(|kind, data| {
        tracing::info!(kind, %data, "Event");
        true
    });

    let socket = create_socket(
        settings,
        handlers,
        bus,
        Arc::new(DesktopStorageProvider::new()),
    )?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("Received Ctrl+C, shutting down");

    let status = socket.observer.snapshot();
    tracing::info!(
        state = status.state.as_str(),
        average_lag = status.average_lag,
        connects = status.connect_count,
        "Final status"
    );
    socket.handle.destroy();
    Ok(())
}
