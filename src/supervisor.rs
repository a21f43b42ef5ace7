//! Session supervisor
//!
//! Owns the accept loop. Each accepted connection gets its own session
//! task; the supervisor keeps track of them so shutdown can close every
//! open session and wait for their users to be deregistered.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::{self, Duration};
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::error::AppError;
use crate::handler::handle_connection;
use crate::server::StoreHandle;
use crate::types::SessionId;

/// How long open sessions get to finish once shutdown is signalled
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Accept loop plus live session tracking
pub struct Supervisor {
    listener: TcpListener,
    store: StoreHandle,
    config: Arc<ServerConfig>,
    sessions: JoinSet<()>,
    shutdown_tx: watch::Sender<bool>,
}

impl Supervisor {
    /// Create a supervisor over a bound listener
    pub fn new(listener: TcpListener, store: StoreHandle, config: Arc<ServerConfig>) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            listener,
            store,
            config,
            sessions: JoinSet::new(),
            shutdown_tx,
        }
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until `shutdown` resolves
    ///
    /// On return every session has ended and the listening socket is
    /// closed. A non-transient accept failure also stops the loop, after
    /// closing the open sessions, and is returned as the error.
    pub async fn run<F>(mut self, shutdown: F) -> Result<(), AppError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!("Accepting connections on {}", self.local_addr()?);

        let result = loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break Ok(());
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => self.spawn_session(stream, addr),
                    Err(e) if is_transient(&e) => {
                        warn!("Failed to accept connection: {}", e);
                    }
                    Err(e) => {
                        error!("Listener failed: {}", e);
                        break Err(AppError::Io(e));
                    }
                },
                Some(joined) = self.sessions.join_next(), if !self.sessions.is_empty() => {
                    if let Err(e) = joined {
                        error!("Session task failed: {}", e);
                    }
                }
            }
        };

        self.close_sessions().await;
        drop(self.listener);
        info!("Supervisor stopped");
        result
    }

    fn spawn_session(&mut self, stream: tokio::net::TcpStream, addr: SocketAddr) {
        let id = SessionId::new();
        info!("Session {} connected from {}", id, addr);

        let store = self.store.clone();
        let config = Arc::clone(&self.config);
        let shutdown = self.shutdown_tx.subscribe();

        self.sessions.spawn(async move {
            if let Err(e) = handle_connection(stream, id, store, config, shutdown).await {
                error!("Session {} handler error: {}", id, e);
            }
        });
        debug!("Live sessions: {}", self.sessions.len());
    }

    async fn close_sessions(&mut self) {
        let open = self.sessions.len();
        if open > 0 {
            info!("Closing {} open sessions", open);
        }
        // Sessions hold receivers, so this only fails when none are left
        let _ = self.shutdown_tx.send(true);

        if time::timeout(SHUTDOWN_GRACE, self.reap_all()).await.is_err() {
            warn!(
                "Aborting {} sessions still open after {:?}",
                self.sessions.len(),
                SHUTDOWN_GRACE
            );
            self.sessions.abort_all();
            self.reap_all().await;
        }
    }

    async fn reap_all(&mut self) {
        while let Some(joined) = self.sessions.join_next().await {
            match joined {
                Err(e) if e.is_cancelled() => debug!("Session task aborted"),
                Err(e) => error!("Session task failed: {}", e),
                Ok(()) => {}
            }
        }
    }
}

// Errors tied to one half-open connection rather than the listener itself
fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
    )
}
