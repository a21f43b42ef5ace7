//! Server configuration
//!
//! Layered, later wins: built-in defaults, an optional JSON file named by
//! `CHAT_RELAY_CONFIG`, then individual environment variables. The binary
//! additionally accepts the bind address as its first argument.

use std::path::Path;

use serde::Deserialize;

use crate::error::AppError;
use crate::message::DEFAULT_READ_BUFFER_SIZE;
use crate::store::DEFAULT_WELCOME_ROOM;
use crate::types::{CursorMode, UnknownCommandPolicy};

/// Default server address
pub const DEFAULT_ADDR: &str = "127.0.0.1:8000";

/// Channel buffer size for store commands
pub const DEFAULT_COMMAND_CHANNEL_SIZE: usize = 256;

/// Environment variable naming a JSON config file
pub const ENV_CONFIG_FILE: &str = "CHAT_RELAY_CONFIG";
pub const ENV_ADDR: &str = "CHAT_RELAY_ADDR";
pub const ENV_READ_BUFFER: &str = "CHAT_RELAY_READ_BUFFER";
pub const ENV_CURSOR_MODE: &str = "CHAT_RELAY_CURSOR_MODE";
pub const ENV_UNKNOWN_COMMAND: &str = "CHAT_RELAY_UNKNOWN_COMMAND";

/// Runtime settings for the relay
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Listen address, e.g. `0.0.0.0:8000`
    pub bind_addr: String,
    /// Bytes read per command; longer commands are split
    pub read_buffer_size: usize,
    /// Name of the room every user starts in
    pub welcome_room: String,
    pub cursor_mode: CursorMode,
    pub unknown_command: UnknownCommandPolicy,
    /// Capacity of the store command channel
    pub command_channel_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_ADDR.to_string(),
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            welcome_room: DEFAULT_WELCOME_ROOM.to_string(),
            cursor_mode: CursorMode::default(),
            unknown_command: UnknownCommandPolicy::default(),
            command_channel_size: DEFAULT_COMMAND_CHANNEL_SIZE,
        }
    }
}

impl ServerConfig {
    /// Load from the process environment
    pub fn load() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` in place of the environment
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup(ENV_CONFIG_FILE) {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(&lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON config file; missing fields keep their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Parse JSON config text
    pub fn from_json(text: &str) -> Result<Self, AppError> {
        Ok(serde_json::from_str(text)?)
    }

    fn apply_env<F>(&mut self, lookup: &F) -> Result<(), AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup(ENV_ADDR) {
            self.bind_addr = addr;
        }
        if let Some(size) = lookup(ENV_READ_BUFFER) {
            self.read_buffer_size = size
                .parse()
                .map_err(|e| AppError::Config(format!("{}: {}", ENV_READ_BUFFER, e)))?;
        }
        if let Some(mode) = lookup(ENV_CURSOR_MODE) {
            self.cursor_mode = mode.parse().map_err(AppError::Config)?;
        }
        if let Some(policy) = lookup(ENV_UNKNOWN_COMMAND) {
            self.unknown_command = policy.parse().map_err(AppError::Config)?;
        }
        Ok(())
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> Result<(), AppError> {
        if self.read_buffer_size == 0 {
            return Err(AppError::Config("read_buffer_size must be positive".into()));
        }
        if self.command_channel_size == 0 {
            return Err(AppError::Config("command_channel_size must be positive".into()));
        }
        if self.welcome_room.is_empty() {
            return Err(AppError::Config("welcome_room must not be empty".into()));
        }
        Ok(())
    }
}
