//! ChatServer Actor implementation
//!
//! The central actor that owns the `ChatStore`. Sessions never touch the
//! store directly: every operation is a `ServerCommand` processed one at a
//! time, which makes each command atomic with respect to all others.

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::error::{AppError, StoreError};
use crate::message::{Command, Response};
use crate::store::ChatStore;

/// Commands sent from sessions to the ChatServer actor
#[derive(Debug)]
pub enum ServerCommand {
    /// Claim a display name
    Register {
        username: String,
        reply: oneshot::Sender<Result<(), StoreError>>,
    },
    /// Release a display name and its mailbox
    Deregister {
        username: String,
    },
    /// Run one protocol command on behalf of a registered user
    Execute {
        username: String,
        command: Command,
        reply: oneshot::Sender<Response>,
    },
}

/// The main ChatServer actor
pub struct ChatServer {
    /// All chat state
    store: ChatStore,
    /// Command receiver channel
    receiver: mpsc::Receiver<ServerCommand>,
}

impl ChatServer {
    /// Create a new ChatServer over the given store
    pub fn new(store: ChatStore, receiver: mpsc::Receiver<ServerCommand>) -> Self {
        Self { store, receiver }
    }

    /// Run the ChatServer event loop
    ///
    /// Continuously receives and processes commands until all senders are dropped.
    pub async fn run(mut self) {
        info!("ChatServer started");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        info!("ChatServer shutting down");
    }

    /// Process a single command
    fn handle_command(&mut self, cmd: ServerCommand) {
        match cmd {
            ServerCommand::Register { username, reply } => {
                let result = self.store.register_user(&username);
                match &result {
                    Ok(()) => info!("User '{}' registered", username),
                    Err(e) => debug!("Registration rejected: {}", e),
                }
                self.log_totals();
                let _ = reply.send(result);
            }
            ServerCommand::Deregister { username } => {
                if self.store.deregister_user(&username) {
                    info!("User '{}' deregistered", username);
                    self.log_totals();
                }
            }
            ServerCommand::Execute {
                username,
                command,
                reply,
            } => {
                let response = self.execute(&username, command);
                // Receiver gone means the session already ended
                let _ = reply.send(response);
            }
        }
    }

    /// Dispatch one command against the store
    fn execute(&mut self, username: &str, command: Command) -> Response {
        debug!("{} -> {:?}", username, command);
        let store = &mut self.store;

        let result = match command {
            Command::Rooms => Ok(Response::Rooms(store.list_rooms())),
            Command::Room => store
                .current_room(username)
                .map(|room| Response::Room(room.to_string())),
            Command::Create(name) => store.create_room(&name).map(|()| {
                info!("User '{}' created room '{}'", username, name);
                Response::CreateOk
            }),
            Command::Join(name) => store.join_room(username, &name).map(|()| Response::JoinOk),
            Command::Users => store.users_in_room(username).map(Response::Users),
            Command::AllUsers => Ok(Response::AllUsers(store.all_users())),
            Command::Msg(body) => store
                .post_room_message(username, &body)
                .map(|()| Response::MsgSent),
            Command::Msgs => store.fetch_new_room_messages(username).map(Response::Msgs),
            Command::Pmsg { to, body } => match store.send_private_message(username, &to, &body) {
                Ok(()) => Ok(Response::PmsgSent),
                Err(StoreError::NoSuchUser(_)) => Ok(Response::PmsgNoUser),
                Err(e) => Err(e),
            },
            Command::Pmsgs => store.drain_private_mailbox(username).map(Response::Pmsgs),
            Command::Exit => Ok(Response::ExitOk),
            Command::Invalid(keyword) => Ok(Response::Invalid(keyword)),
            // Registration goes through `Register`; sessions never forward these
            Command::Username(_) | Command::Unknown(_) => Ok(Response::UnknownCommand),
        };

        result.unwrap_or_else(|e| {
            warn!("Command from '{}' failed: {}", username, e);
            Response::from(e)
        })
    }

    fn log_totals(&self) {
        debug!(
            "Total users: {}, Total rooms: {}",
            self.store.user_count(),
            self.store.room_count()
        );
    }
}

/// Cloneable handle to a running ChatServer
///
/// This is what sessions receive. The actor stops once every handle has
/// been dropped.
#[derive(Debug, Clone)]
pub struct StoreHandle {
    sender: mpsc::Sender<ServerCommand>,
}

impl StoreHandle {
    /// Spawn a ChatServer over `store` and return a handle to it
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(store: ChatStore, buffer: usize) -> Self {
        let (sender, receiver) = mpsc::channel(buffer);
        tokio::spawn(ChatServer::new(store, receiver).run());
        Self { sender }
    }

    /// Claim `username`
    ///
    /// The outer error means the actor is gone; the inner one is a
    /// domain rejection.
    pub async fn register(&self, username: &str) -> Result<Result<(), StoreError>, AppError> {
        let (reply, rx) = oneshot::channel();
        self.send(ServerCommand::Register {
            username: username.to_string(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| AppError::ChannelRecv)
    }

    /// Release `username`; a no-op if it is not registered
    pub async fn deregister(&self, username: &str) -> Result<(), AppError> {
        self.send(ServerCommand::Deregister {
            username: username.to_string(),
        })
        .await
    }

    /// Run `command` as `username` and return the response to send
    pub async fn execute(&self, username: &str, command: Command) -> Result<Response, AppError> {
        let (reply, rx) = oneshot::channel();
        self.send(ServerCommand::Execute {
            username: username.to_string(),
            command,
            reply,
        })
        .await?;
        rx.await.map_err(|_| AppError::ChannelRecv)
    }

    async fn send(&self, cmd: ServerCommand) -> Result<(), AppError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| AppError::ChannelSend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server() -> ChatServer {
        let (_tx, rx) = mpsc::channel(1);
        ChatServer::new(ChatStore::new(), rx)
    }

    fn run(server: &mut ChatServer, user: &str, input: &str) -> String {
        server.execute(user, Command::parse(input)).to_string()
    }

    #[test]
    fn test_execute_scenario() {
        let mut server = server();
        server.store.register_user("alice").unwrap();
        server.store.register_user("bob").unwrap();

        assert_eq!(run(&mut server, "alice", "/create dev"), "/create ok");
        assert_eq!(run(&mut server, "bob", "/join dev"), "/join ok");
        assert_eq!(run(&mut server, "alice", "/join dev"), "/join ok");
        assert_eq!(run(&mut server, "alice", "/msg hello"), "/msg sent");
        assert_eq!(run(&mut server, "bob", "/msgs"), "/msgs (alice@#dev) hello");
        assert_eq!(run(&mut server, "bob", "/msgs"), "/msgs none");
        assert_eq!(run(&mut server, "bob", "/pmsg alice hey"), "/pmsg sent");
        assert_eq!(run(&mut server, "alice", "/pmsgs"), "/pmsgs (bob@private) hey");
        assert_eq!(run(&mut server, "alice", "/pmsgs"), "/pmsgs none");
    }

    #[test]
    fn test_execute_listings() {
        let mut server = server();
        server.store.register_user("alice").unwrap();
        server.store.register_user("bob").unwrap();
        server.store.create_room("dev").unwrap();

        assert_eq!(run(&mut server, "alice", "/rooms"), "/rooms #welcome #dev");
        assert_eq!(run(&mut server, "alice", "/room"), "/room #welcome");
        assert_eq!(run(&mut server, "alice", "/users"), "/users alicebob");
        run(&mut server, "bob", "/join dev");
        assert_eq!(
            run(&mut server, "alice", "/allusers"),
            "/allusers alice@#welcomebob@#dev"
        );
    }

    #[test]
    fn test_execute_domain_failures() {
        let mut server = server();
        server.store.register_user("alice").unwrap();

        assert_eq!(run(&mut server, "alice", "/create welcome"), "/create room_exists");
        assert_eq!(run(&mut server, "alice", "/join nowhere"), "/join no_room");
        assert_eq!(run(&mut server, "alice", "/room"), "/room #welcome");
        assert_eq!(run(&mut server, "alice", "/pmsg ghost boo"), "/pmsg no_user");
        assert_eq!(run(&mut server, "alice", "/create "), "/create invalid");
    }

    #[tokio::test]
    async fn test_handle_round_trip() {
        let handle = StoreHandle::spawn(ChatStore::new(), 8);

        assert_eq!(handle.register("alice").await.unwrap(), Ok(()));
        assert!(matches!(
            handle.register("alice").await.unwrap(),
            Err(StoreError::NameTaken(_))
        ));

        let response = handle.execute("alice", Command::Room).await.unwrap();
        assert_eq!(response, Response::Room("welcome".to_string()));

        handle.deregister("alice").await.unwrap();
        assert_eq!(handle.register("alice").await.unwrap(), Ok(()));
    }

    #[tokio::test]
    async fn test_concurrent_registration() {
        let handle = StoreHandle::spawn(ChatStore::new(), 8);
        let mut tasks = tokio::task::JoinSet::new();

        for i in 0..32 {
            let handle = handle.clone();
            tasks.spawn(async move { handle.register(&format!("user{}", i)).await });
        }
        while let Some(result) = tasks.join_next().await {
            assert_eq!(result.unwrap().unwrap(), Ok(()));
        }

        let Response::AllUsers(all) = handle.execute("user0", Command::AllUsers).await.unwrap()
        else {
            panic!("Wrong variant");
        };
        assert_eq!(all.len(), 32);
        let mut unique = all.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 32);
    }

    #[tokio::test]
    async fn test_concurrent_registration_same_name() {
        let handle = StoreHandle::spawn(ChatStore::new(), 8);
        let mut tasks = tokio::task::JoinSet::new();

        for _ in 0..32 {
            let handle = handle.clone();
            tasks.spawn(async move { handle.register("popular").await });
        }

        let mut won = 0;
        let mut taken = 0;
        while let Some(result) = tasks.join_next().await {
            match result.unwrap().unwrap() {
                Ok(()) => won += 1,
                Err(StoreError::NameTaken(name)) => {
                    assert_eq!(name, "popular");
                    taken += 1;
                }
                Err(e) => panic!("Unexpected error: {}", e),
            }
        }
        assert_eq!(won, 1);
        assert_eq!(taken, 31);

        let response = handle.execute("popular", Command::AllUsers).await.unwrap();
        assert_eq!(response, Response::AllUsers(vec!["popular@#welcome".to_string()]));
    }
}
