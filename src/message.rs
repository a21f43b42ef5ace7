//! Protocol definitions
//!
//! Plain-text command/response protocol. Each client write is one command
//! and each server write is one response; there is no delimiter beyond the
//! read itself. Commands decode into a tagged enum so the full command set
//! is visible in one place.

use std::fmt;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::StoreError;

/// Default size of the per-connection read buffer
pub const DEFAULT_READ_BUFFER_SIZE: usize = 1024;

/// Every keyword the protocol knows, in table order
pub const COMMAND_NAMES: [&str; 12] = [
    "/username",
    "/rooms",
    "/room",
    "/create",
    "/join",
    "/users",
    "/allusers",
    "/msg",
    "/msgs",
    "/pmsg",
    "/pmsgs",
    "/exit",
];

/// Client → Server command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Register a display name (must come first)
    Username(String),
    /// List all rooms
    Rooms,
    /// Show the current room
    Room,
    /// Create a room
    Create(String),
    /// Move to another room
    Join(String),
    /// List users in the current room
    Users,
    /// List every user with their room
    AllUsers,
    /// Post to the current room
    Msg(String),
    /// Fetch unseen room messages
    Msgs,
    /// Send a private message
    Pmsg { to: String, body: String },
    /// Drain the private mailbox
    Pmsgs,
    /// Close the session
    Exit,
    /// Known keyword with a malformed argument
    Invalid(&'static str),
    /// Anything not in the command table
    Unknown(String),
}

impl Command {
    /// Decode one command
    ///
    /// Keywords match exactly. Arguments are everything after the first
    /// space, kept verbatim; `/pmsg` additionally splits on whitespace.
    pub fn parse(input: &str) -> Self {
        let (keyword, arg) = match input.split_once(' ') {
            Some((keyword, arg)) => (keyword, Some(arg)),
            None => (input, None),
        };
        if !COMMAND_NAMES.contains(&keyword) {
            return Command::Unknown(input.to_string());
        }

        match (keyword, arg) {
            ("/username", Some(name)) if !name.is_empty() => Command::Username(name.to_string()),
            ("/username", _) => Command::Invalid("/username"),
            ("/rooms", None) => Command::Rooms,
            ("/room", None) => Command::Room,
            ("/create", Some(name)) if !name.is_empty() => Command::Create(name.to_string()),
            ("/create", _) => Command::Invalid("/create"),
            ("/join", Some(name)) if !name.is_empty() => Command::Join(name.to_string()),
            ("/join", _) => Command::Invalid("/join"),
            ("/users", None) => Command::Users,
            ("/allusers", None) => Command::AllUsers,
            ("/msg", Some(body)) if !body.is_empty() => Command::Msg(body.to_string()),
            ("/msg", _) => Command::Invalid("/msg"),
            ("/msgs", None) => Command::Msgs,
            ("/pmsg", Some(rest)) => {
                let mut parts = rest.split_whitespace();
                match (parts.next(), parts.next()) {
                    (Some(to), Some(body)) => Command::Pmsg {
                        to: to.to_string(),
                        body: body.to_string(),
                    },
                    _ => Command::Invalid("/pmsg"),
                }
            }
            ("/pmsg", None) => Command::Invalid("/pmsg"),
            ("/pmsgs", None) => Command::Pmsgs,
            ("/exit", None) => Command::Exit,
            _ => Command::Unknown(input.to_string()),
        }
    }

    /// Keyword of a recognized command
    pub fn keyword(&self) -> Option<&'static str> {
        let keyword = match self {
            Command::Username(_) => "/username",
            Command::Rooms => "/rooms",
            Command::Room => "/room",
            Command::Create(_) => "/create",
            Command::Join(_) => "/join",
            Command::Users => "/users",
            Command::AllUsers => "/allusers",
            Command::Msg(_) => "/msg",
            Command::Msgs => "/msgs",
            Command::Pmsg { .. } => "/pmsg",
            Command::Pmsgs => "/pmsgs",
            Command::Exit => "/exit",
            Command::Invalid(keyword) => *keyword,
            Command::Unknown(_) => return None,
        };
        Some(keyword)
    }
}

/// Server → Client response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    UsernameOk,
    UsernameTaken,
    /// Sent for anything but a valid `/username` before registration
    UsernameRequired,
    Rooms(Vec<String>),
    Room(String),
    CreateOk,
    CreateRoomExists,
    JoinOk,
    JoinNoRoom,
    Users(Vec<String>),
    /// Entries are already formatted as `name@#room`
    AllUsers(Vec<String>),
    MsgSent,
    Msgs(Option<String>),
    PmsgSent,
    PmsgNoUser,
    Pmsgs(Option<String>),
    ExitOk,
    /// Malformed argument for the given keyword
    Invalid(&'static str),
    UnknownCommand,
}

/// Literal reply for commands outside the table
pub const UNKNOWN_COMMAND: &str = "Unknown Command";

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::UsernameOk => f.write_str("/username ok"),
            Response::UsernameTaken => f.write_str("/username taken"),
            Response::UsernameRequired => f.write_str("/username required"),
            Response::Rooms(rooms) => {
                f.write_str("/rooms")?;
                for room in rooms {
                    write!(f, " #{}", room)?;
                }
                Ok(())
            }
            Response::Room(room) => write!(f, "/room #{}", room),
            Response::CreateOk => f.write_str("/create ok"),
            Response::CreateRoomExists => f.write_str("/create room_exists"),
            Response::JoinOk => f.write_str("/join ok"),
            Response::JoinNoRoom => f.write_str("/join no_room"),
            Response::Users(names) => write!(f, "/users {}", names.concat()),
            Response::AllUsers(entries) => write!(f, "/allusers {}", entries.concat()),
            Response::MsgSent => f.write_str("/msg sent"),
            Response::Msgs(Some(log)) => write!(f, "/msgs {}", log),
            Response::Msgs(None) => f.write_str("/msgs none"),
            Response::PmsgSent => f.write_str("/pmsg sent"),
            Response::PmsgNoUser => f.write_str("/pmsg no_user"),
            Response::Pmsgs(Some(mail)) => write!(f, "/pmsgs {}", mail),
            Response::Pmsgs(None) => f.write_str("/pmsgs none"),
            Response::ExitOk => f.write_str("/exit ok"),
            Response::Invalid(keyword) => write!(f, "{} invalid", keyword),
            Response::UnknownCommand => f.write_str(UNKNOWN_COMMAND),
        }
    }
}

/// Convert StoreError to the sentinel response the client sees
impl From<StoreError> for Response {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NameTaken(_) => Response::UsernameTaken,
            StoreError::RoomExists(_) => Response::CreateRoomExists,
            StoreError::NoSuchRoom(_) => Response::JoinNoRoom,
            StoreError::NoSuchUser(_) => Response::UsernameRequired,
        }
    }
}

/// Read one command frame
///
/// Performs a single read into `buf`. Returns None when the peer has
/// closed the stream. One trailing `\n` or `\r\n` is dropped; invalid
/// UTF-8 is replaced rather than rejected.
pub async fn read_frame<R>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<Option<String>>
where
    R: AsyncRead + Unpin,
{
    let n = reader.read(buf).await?;
    if n == 0 {
        return Ok(None);
    }
    let raw = String::from_utf8_lossy(&buf[..n]);
    let line = raw
        .strip_suffix("\r\n")
        .or_else(|| raw.strip_suffix('\n'))
        .unwrap_or(raw.as_ref());
    Ok(Some(line.to_string()))
}

/// Write one response frame
pub async fn write_frame<W>(writer: &mut W, response: &str) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(response.as_bytes()).await?;
    writer.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_argument_free_commands() {
        assert_eq!(Command::parse("/rooms"), Command::Rooms);
        assert_eq!(Command::parse("/room"), Command::Room);
        assert_eq!(Command::parse("/users"), Command::Users);
        assert_eq!(Command::parse("/allusers"), Command::AllUsers);
        assert_eq!(Command::parse("/msgs"), Command::Msgs);
        assert_eq!(Command::parse("/pmsgs"), Command::Pmsgs);
        assert_eq!(Command::parse("/exit"), Command::Exit);
    }

    #[test]
    fn test_parse_keeps_arguments_verbatim() {
        assert_eq!(
            Command::parse("/username Mary Ann"),
            Command::Username("Mary Ann".to_string())
        );
        assert_eq!(
            Command::parse("/create dev ops"),
            Command::Create("dev ops".to_string())
        );
        assert_eq!(
            Command::parse("/msg hello  world "),
            Command::Msg("hello  world ".to_string())
        );
    }

    #[test]
    fn test_parse_pmsg_tokenizes() {
        assert_eq!(
            Command::parse("/pmsg bob hi there"),
            Command::Pmsg {
                to: "bob".to_string(),
                body: "hi".to_string(),
            }
        );
        assert_eq!(Command::parse("/pmsg bob"), Command::Invalid("/pmsg"));
        assert_eq!(Command::parse("/pmsg"), Command::Invalid("/pmsg"));
    }

    #[test]
    fn test_parse_does_not_prefix_match() {
        // "/msgs" must not become "/msg" with body "s"
        assert_eq!(Command::parse("/msgs"), Command::Msgs);
        assert_eq!(
            Command::parse("/rooms now"),
            Command::Unknown("/rooms now".to_string())
        );
        assert_eq!(
            Command::parse("/dance"),
            Command::Unknown("/dance".to_string())
        );
    }

    #[test]
    fn test_parse_empty_arguments() {
        assert_eq!(Command::parse("/username "), Command::Invalid("/username"));
        assert_eq!(Command::parse("/username"), Command::Invalid("/username"));
        assert_eq!(Command::parse("/create "), Command::Invalid("/create"));
        assert_eq!(Command::parse("/join "), Command::Invalid("/join"));
        assert_eq!(Command::parse("/join"), Command::Invalid("/join"));
        assert_eq!(Command::parse("/msg"), Command::Invalid("/msg"));
    }

    #[test]
    fn test_keyword_table_covers_commands() {
        for name in COMMAND_NAMES {
            let sample = match name {
                "/username" | "/create" | "/join" | "/msg" => format!("{} x", name),
                "/pmsg" => format!("{} x y", name),
                _ => name.to_string(),
            };
            assert_eq!(Command::parse(&sample).keyword(), Some(name));
        }
        assert_eq!(Command::parse("/nope").keyword(), None);
    }

    #[test]
    fn test_response_encoding() {
        assert_eq!(
            Response::Rooms(vec!["welcome".to_string(), "dev".to_string()]).to_string(),
            "/rooms #welcome #dev"
        );
        assert_eq!(Response::Room("dev".to_string()).to_string(), "/room #dev");
        assert_eq!(
            Response::Users(vec!["alice".to_string(), "bob".to_string()]).to_string(),
            "/users alicebob"
        );
        assert_eq!(Response::Msgs(None).to_string(), "/msgs none");
        assert_eq!(Response::Pmsgs(None).to_string(), "/pmsgs none");
        assert_eq!(Response::Invalid("/create").to_string(), "/create invalid");
        assert_eq!(Response::UnknownCommand.to_string(), "Unknown Command");
    }

    #[test]
    fn test_store_error_sentinels() {
        assert_eq!(
            Response::from(StoreError::NoSuchRoom("x".to_string())),
            Response::JoinNoRoom
        );
        assert_eq!(
            Response::from(StoreError::RoomExists("x".to_string())).to_string(),
            "/create room_exists"
        );
    }

    #[tokio::test]
    async fn test_read_frame_strips_line_ending() {
        let (mut client, mut server) = tokio::io::duplex(64);
        let mut buf = [0u8; 64];

        client.write_all(b"/rooms\r\n").await.unwrap();
        let frame = read_frame(&mut server, &mut buf).await.unwrap();
        assert_eq!(frame.as_deref(), Some("/rooms"));

        drop(client);
        assert_eq!(read_frame(&mut server, &mut buf).await.unwrap(), None);
    }
}
