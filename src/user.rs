//! User struct definition
//!
//! Represents a registered user with their room membership, private
//! mailbox and per-room read cursors.

use std::collections::HashMap;

/// Registered user
///
/// Exists from a successful `/username` until the session ends.
#[derive(Debug)]
pub struct User {
    /// Display name (unique among registered users)
    pub name: String,
    /// Index of the current room in the store's room list
    pub room: usize,
    /// Registration sequence number, used for listing order
    pub seq: u64,
    /// Pending private messages
    mailbox: Vec<String>,
    /// Per-room read offsets (room index -> log offset)
    cursors: HashMap<usize, usize>,
}

impl User {
    /// Create a user in `room` with an empty mailbox
    pub fn new(name: impl Into<String>, room: usize, seq: u64) -> Self {
        Self {
            name: name.into(),
            room,
            seq,
            mailbox: Vec::new(),
            cursors: HashMap::new(),
        }
    }

    /// Queue a private message, formatted as `(<sender>@private) <body>`
    pub fn deliver(&mut self, sender: &str, body: &str) {
        self.mailbox.push(format!("({}@private) {}", sender, body));
    }

    /// Take everything in the mailbox, leaving it empty
    ///
    /// Returns None if the mailbox was already empty.
    pub fn drain_mailbox(&mut self) -> Option<String> {
        if self.mailbox.is_empty() {
            return None;
        }
        let contents = self.mailbox.concat();
        self.mailbox.clear();
        Some(contents)
    }

    /// Read offset for a room (0 if never fetched)
    pub fn cursor(&self, room: usize) -> usize {
        self.cursors.get(&room).copied().unwrap_or(0)
    }

    /// Record a new read offset for a room
    pub fn set_cursor(&mut self, room: usize, offset: usize) {
        self.cursors.insert(room, offset);
    }
}
