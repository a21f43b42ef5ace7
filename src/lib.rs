//! Multi-room TCP Chat Relay Library
//!
//! A plain-text chat server where clients register a name, move between
//! named rooms, post to the current room and exchange private messages.
//! Delivery is pull-based: clients poll with `/msgs` and `/pmsgs`.
//!
//! # Features
//! - Unique display names, freed when the session ends
//! - Rooms with append-only message logs (never deleted)
//! - Per-user or shared room read cursors
//! - Private mailboxes drained on read
//! - Graceful shutdown that deregisters every open session
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `ChatServer` owns the `ChatStore` and runs one command at a time
//! - Each connection has a `handler` task holding a cloned `StoreHandle`
//! - `Supervisor` accepts connections and tracks session tasks
//! - `client::Client` drives the interactive `chat_relay_client` binary
//!
//! # Example
//! ```ignore
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//! use chat_relay::{ChatStore, ServerConfig, StoreHandle, Supervisor};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), chat_relay::AppError> {
//!     let config = Arc::new(ServerConfig::default());
//!     let listener = TcpListener::bind(&config.bind_addr).await?;
//!     let store = StoreHandle::spawn(ChatStore::new(), config.command_channel_size);
//!
//!     Supervisor::new(listener, store, config)
//!         .run(async { let _ = tokio::signal::ctrl_c().await; })
//!         .await
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod handler;
pub mod message;
pub mod room;
pub mod server;
pub mod store;
pub mod supervisor;
pub mod types;
pub mod user;

// Re-export main types for convenience
pub use client::Client;
pub use config::ServerConfig;
pub use error::{AppError, StoreError};
pub use handler::{handle_connection, Session, SessionState};
pub use message::{Command, Response};
pub use room::Room;
pub use server::{ChatServer, ServerCommand, StoreHandle};
pub use store::ChatStore;
pub use supervisor::Supervisor;
pub use types::{CursorMode, SessionId, UnknownCommandPolicy};
pub use user::User;
