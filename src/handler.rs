//! Client session handler
//!
//! Drives one connection through its lifecycle:
//! `Unauthenticated → Active → Terminated`. Every command read from the
//! client gets exactly one response. However the session ends (`/exit`,
//! peer close, read error or server shutdown) the user is deregistered
//! before the stream is closed.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::error::AppError;
use crate::message::{self, Command, Response, UNKNOWN_COMMAND};
use crate::server::StoreHandle;
use crate::types::{SessionId, UnknownCommandPolicy};

/// Connection state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for a valid `/username`
    Unauthenticated,
    /// Registered under `username`
    Active { username: String },
    /// Finished; no further commands are processed
    Terminated,
}

/// Per-connection protocol state machine
///
/// Holds no socket: feed it commands, write back what it returns.
#[derive(Debug)]
pub struct Session {
    /// Connection identifier for logging
    pub id: SessionId,
    state: SessionState,
    store: StoreHandle,
    unknown_command: UnknownCommandPolicy,
    /// Last reply sent, repeated for unknown commands under the legacy policy
    last_reply: String,
}

impl Session {
    /// Create an unauthenticated session
    pub fn new(id: SessionId, store: StoreHandle, unknown_command: UnknownCommandPolicy) -> Self {
        Self {
            id,
            state: SessionState::Unauthenticated,
            store,
            unknown_command,
            last_reply: UNKNOWN_COMMAND.to_string(),
        }
    }

    /// Current state
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Registered name, if any
    pub fn username(&self) -> Option<&str> {
        match &self.state {
            SessionState::Active { username } => Some(username),
            _ => None,
        }
    }

    /// Whether the session has ended
    pub fn is_terminated(&self) -> bool {
        self.state == SessionState::Terminated
    }

    /// Handle one command and produce the reply text
    pub async fn on_command(&mut self, command: Command) -> Result<String, AppError> {
        let reply = match self.state.clone() {
            SessionState::Unauthenticated => self.authenticate(command).await?.to_string(),
            SessionState::Active { username } => match command {
                Command::Exit => {
                    self.terminate().await?;
                    Response::ExitOk.to_string()
                }
                Command::Unknown(_) | Command::Username(_) => self.unknown_reply(),
                command => self.store.execute(&username, command).await?.to_string(),
            },
            SessionState::Terminated => return Err(AppError::SessionTerminated),
        };

        self.last_reply.clone_from(&reply);
        Ok(reply)
    }

    /// End the session, deregistering the user if there is one
    ///
    /// Safe to call more than once.
    pub async fn terminate(&mut self) -> Result<(), AppError> {
        let previous = std::mem::replace(&mut self.state, SessionState::Terminated);
        if let SessionState::Active { username } = previous {
            self.store.deregister(&username).await?;
            debug!("Session {} released '{}'", self.id, username);
        }
        Ok(())
    }

    async fn authenticate(&mut self, command: Command) -> Result<Response, AppError> {
        let Command::Username(name) = command else {
            return Ok(Response::UsernameRequired);
        };

        match self.store.register(&name).await? {
            Ok(()) => {
                info!("Session {} registered as '{}'", self.id, name);
                self.state = SessionState::Active { username: name };
                Ok(Response::UsernameOk)
            }
            Err(e) => {
                debug!("Session {}: {}", self.id, e);
                Ok(Response::UsernameTaken)
            }
        }
    }

    fn unknown_reply(&self) -> String {
        match self.unknown_command {
            UnknownCommandPolicy::Explicit => Response::UnknownCommand.to_string(),
            UnknownCommandPolicy::Legacy => self.last_reply.clone(),
        }
    }
}

/// Serve one client connection until it ends
///
/// Works over any byte stream. `shutdown` flips to `true` when the server
/// is stopping; the session then ends at its next wait on the socket,
/// whether reading a command or writing a reply.
pub async fn handle_connection<S>(
    mut stream: S,
    id: SessionId,
    store: StoreHandle,
    config: Arc<ServerConfig>,
    shutdown: watch::Receiver<bool>,
) -> Result<(), AppError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut session = Session::new(id, store, config.unknown_command);

    let result = serve(&mut stream, &mut session, config.read_buffer_size, shutdown).await;

    // Release the name on every exit path, then close the stream
    if let Err(e) = session.terminate().await {
        warn!("Session {} could not deregister: {}", id, e);
    }
    if let Err(e) = stream.shutdown().await {
        debug!("Session {} close failed: {}", id, e);
    }

    info!("Session {} closed", id);
    result
}

async fn serve<S>(
    stream: &mut S,
    session: &mut Session,
    buffer_size: usize,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), AppError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; buffer_size];

    while !session.is_terminated() {
        if *shutdown.borrow() {
            debug!("Session {} stopping for shutdown", session.id);
            break;
        }

        let frame = tokio::select! {
            frame = message::read_frame(&mut *stream, &mut buf) => frame?,
            changed = shutdown.changed() => {
                if changed.is_err() {
                    debug!("Session {} lost its supervisor", session.id);
                    break;
                }
                continue;
            }
        };

        let Some(frame) = frame else {
            debug!("Session {} peer closed", session.id);
            break;
        };

        let reply = session.on_command(Command::parse(&frame)).await?;

        // A peer that stops reading must not hold up shutdown
        tokio::select! {
            written = message::write_frame(&mut *stream, &reply) => written?,
            _ = shutdown.changed() => {
                debug!("Session {} dropped a reply for shutdown", session.id);
                break;
            }
        }
    }

    Ok(())
}
