//! Chat Relay - Entry Point
//!
//! Loads configuration, starts the store actor and runs the supervisor
//! until Ctrl-C.

use std::env;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use chat_relay::{ChatStore, ServerConfig, StoreHandle, Supervisor};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=chat_relay=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chat_relay=info")),
        )
        .init();

    let mut config = ServerConfig::load()?;

    // Bind address from command line overrides everything else
    if let Some(addr) = env::args().nth(1) {
        config.bind_addr = addr;
    }
    let config = Arc::new(config);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!("Chat relay listening on {}", config.bind_addr);

    let store =
        ChatStore::with_welcome_room(&config.welcome_room).with_cursor_mode(config.cursor_mode);
    let handle = StoreHandle::spawn(store, config.command_channel_size);
    info!(
        "ChatServer actor started (cursor mode {:?}, unknown commands {:?})",
        config.cursor_mode, config.unknown_command
    );

    let supervisor = Supervisor::new(listener, handle, config);
    supervisor
        .run(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Received Ctrl-C"),
                Err(e) => {
                    error!("Failed to listen for Ctrl-C: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        })
        .await?;

    Ok(())
}
