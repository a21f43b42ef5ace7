//! Interactive line client
//!
//! Reads one command per input line, sends it as a single write and prints
//! the single reply read back. Stops after `/exit`, at end of input, or
//! when the server closes the connection.

use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

use crate::error::AppError;
use crate::message::{self, DEFAULT_READ_BUFFER_SIZE};

/// Prompt shown before the first command
pub const FIRST_PROMPT: &str = "Command > ";
/// Prompt shown before every later command
pub const PROMPT: &str = "> ";

/// One connection to a relay
pub struct Client<S> {
    stream: S,
    buf: Vec<u8>,
}

impl<S> Client<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap a connected stream
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            buf: vec![0u8; DEFAULT_READ_BUFFER_SIZE],
        }
    }

    /// Send `input` and wait for its reply
    ///
    /// Returns None once the server has closed the connection.
    pub async fn command(&mut self, input: &str) -> Result<Option<String>, AppError> {
        match message::write_frame(&mut self.stream, input).await {
            Ok(()) => {}
            Err(e) if is_closed(&e) => return Ok(None),
            Err(e) => return Err(e.into()),
        }
        Ok(message::read_frame(&mut self.stream, &mut self.buf).await?)
    }

    /// Drive the prompt loop over `input`, printing replies to `output`
    pub async fn run<I, O>(&mut self, input: I, mut output: O) -> Result<(), AppError>
    where
        I: AsyncBufRead + Unpin,
        O: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();
        let mut prompt = FIRST_PROMPT;

        loop {
            output.write_all(prompt.as_bytes()).await?;
            output.flush().await?;

            let Some(line) = lines.next_line().await? else {
                debug!("Input closed");
                break;
            };
            let line = line.trim_end_matches('\r');
            // An empty write would leave us waiting on a reply that never comes
            if line.is_empty() {
                continue;
            }
            prompt = PROMPT;

            let Some(reply) = self.command(line).await? else {
                info!("Server closed the connection");
                break;
            };
            output.write_all(reply.as_bytes()).await?;
            output.write_all(b"\n").await?;

            if line == "/exit" {
                break;
            }
        }

        output.flush().await?;
        Ok(())
    }
}

fn is_closed(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::BrokenPipe | io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use tokio::sync::watch;
    use tokio::task::JoinHandle;

    use crate::config::ServerConfig;
    use crate::handler::handle_connection;
    use crate::server::StoreHandle;
    use crate::store::ChatStore;
    use crate::types::SessionId;

    type Served = (
        tokio::io::DuplexStream,
        watch::Sender<bool>,
        JoinHandle<Result<(), AppError>>,
    );

    fn serve(store: &StoreHandle) -> Served {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (client, server) = tokio::io::duplex(1024);
        let task = tokio::spawn(handle_connection(
            server,
            SessionId::new(),
            store.clone(),
            Arc::new(ServerConfig::default()),
            shutdown_rx,
        ));
        (client, shutdown_tx, task)
    }

    #[tokio::test]
    async fn test_prompt_loop() {
        let store = StoreHandle::spawn(ChatStore::new(), 8);
        let (stream, _shutdown, _task) = serve(&store);
        let input = &b"/username alice\n\n/room\r\n/exit\n/rooms\n"[..];
        let mut output = Vec::new();

        Client::new(stream).run(input, &mut output).await.unwrap();

        let printed = String::from_utf8(output).unwrap();
        assert_eq!(
            printed,
            "Command > /username ok\n> > /room #welcome\n> /exit ok\n"
        );
    }

    #[tokio::test]
    async fn test_stops_at_end_of_input() {
        let store = StoreHandle::spawn(ChatStore::new(), 8);
        let (stream, _shutdown, _task) = serve(&store);
        let mut output = Vec::new();

        Client::new(stream)
            .run(&b"/rooms\n"[..], &mut output)
            .await
            .unwrap();

        let printed = String::from_utf8(output).unwrap();
        assert_eq!(printed, "Command > /username required\n> ");
    }

    #[tokio::test]
    async fn test_stops_when_server_closes() {
        let store = StoreHandle::spawn(ChatStore::new(), 8);
        let (stream, shutdown, task) = serve(&store);
        let mut client = Client::new(stream);

        assert_eq!(
            client.command("/username bob").await.unwrap().as_deref(),
            Some("/username ok")
        );
        shutdown.send(true).unwrap();
        task.await.unwrap().unwrap();

        let mut output = Vec::new();
        client.run(&b"/room\n"[..], &mut output).await.unwrap();
        let printed = String::from_utf8(output).unwrap();
        assert_eq!(printed, "Command > ");
    }
}
