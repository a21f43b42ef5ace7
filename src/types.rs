//! Basic type definitions for the chat relay
//!
//! Provides:
//! - `SessionId`: UUID-based identifier for one client connection
//! - `CursorMode`: how room read cursors are tracked
//! - `UnknownCommandPolicy`: how unrecognized commands are answered

use serde::Deserialize;
use uuid::Uuid;

/// Unique session identifier (newtype pattern)
///
/// Wraps a UUID v4. Assigned on accept, before the client has a name,
/// so log lines from one connection can be correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Create a new random session ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Room read cursor tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CursorMode {
    /// One cursor per (user, room) pair
    #[default]
    PerUser,
    /// One cursor per room, shared by whoever fetches from it
    SharedRoom,
}

impl std::str::FromStr for CursorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "per_user" => Ok(Self::PerUser),
            "shared_room" => Ok(Self::SharedRoom),
            other => Err(format!("unknown cursor mode '{}'", other)),
        }
    }
}

/// Reply policy for commands outside the command table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownCommandPolicy {
    /// Always reply `Unknown Command`
    #[default]
    Explicit,
    /// Repeat the previous response sent on this session
    Legacy,
}

impl std::str::FromStr for UnknownCommandPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "explicit" => Ok(Self::Explicit),
            "legacy" => Ok(Self::Legacy),
            other => Err(format!("unknown command policy '{}'", other)),
        }
    }
}
