//! Error types for the chat relay
//!
//! Defines application-level errors and chat state (domain) errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Application-level errors
///
/// These end a session (or the whole server, for configuration). Domain
/// failures never show up here; they travel as `StoreError`.
#[derive(Debug, Error)]
pub enum AppError {
    /// IO error (fatal for the affected connection)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("JSON configuration error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// Channel send error (fatal - store actor is gone)
    #[error("Channel send error")]
    ChannelSend,

    /// Reply channel dropped before answering (fatal - store actor is gone)
    #[error("Channel receive error")]
    ChannelRecv,

    /// Command delivered to a session that has already ended
    #[error("Session already terminated")]
    SessionTerminated,
}

/// Chat state errors
///
/// Reported back to the client as a textual sentinel; the connection
/// stays open.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Display name already registered
    #[error("Name taken: {0}")]
    NameTaken(String),

    /// Room name already exists
    #[error("Room already exists: {0}")]
    RoomExists(String),

    /// No room with the given name
    #[error("Room not found: {0}")]
    NoSuchRoom(String),

    /// No registered user with the given name
    #[error("User not found: {0}")]
    NoSuchUser(String),
}
