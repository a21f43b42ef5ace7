//! Chat Relay - Interactive Client
//!
//! Connects to a relay and sends one command per line typed on stdin.
//! Usage: `chat_relay_client [ADDR]`, default `127.0.0.1:8000`.

use std::env;

use tokio::io::{self, BufReader};
use tokio::net::TcpStream;
use tracing::info;
use tracing_subscriber::EnvFilter;

use chat_relay::client::Client;
use chat_relay::config::DEFAULT_ADDR;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs on stderr, replies on stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chat_relay=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let addr = env::args().nth(1).unwrap_or_else(|| DEFAULT_ADDR.to_string());
    let stream = TcpStream::connect(&addr).await?;
    info!("Connected to {}", addr);

    let mut client = Client::new(stream);
    client.run(BufReader::new(io::stdin()), io::stdout()).await?;

    info!("Disconnected from {}", addr);
    Ok(())
}
