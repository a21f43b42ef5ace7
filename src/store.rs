//! Chat state store
//!
//! Users, rooms, room logs, read cursors and private mailboxes. The store
//! is a plain synchronous structure; `ChatServer` owns the only instance
//! and serializes every operation through its command channel.

use std::collections::HashMap;

use crate::error::StoreError;
use crate::room::Room;
use crate::types::CursorMode;
use crate::user::User;

/// Name of the room every user starts in
pub const DEFAULT_WELCOME_ROOM: &str = "welcome";

/// Shared chat state
///
/// Invariants:
/// - `rooms[0]` is the welcome room and rooms are never removed
/// - every `User::room` is a valid index into `rooms`
/// - `room_index` maps each room name to its position in `rooms`
#[derive(Debug)]
pub struct ChatStore {
    /// Registered users: name -> User
    users: HashMap<String, User>,
    /// Rooms in creation order
    rooms: Vec<Room>,
    /// Room name -> index into `rooms`
    room_index: HashMap<String, usize>,
    /// How room read cursors are tracked
    cursor_mode: CursorMode,
    /// Next registration sequence number
    next_seq: u64,
}

impl Default for ChatStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatStore {
    /// Create a store holding only the `welcome` room
    pub fn new() -> Self {
        Self::with_welcome_room(DEFAULT_WELCOME_ROOM)
    }

    /// Create a store whose default room has the given name
    pub fn with_welcome_room(name: &str) -> Self {
        let mut room_index = HashMap::new();
        room_index.insert(name.to_string(), 0);
        Self {
            users: HashMap::new(),
            rooms: vec![Room::new(name)],
            room_index,
            cursor_mode: CursorMode::default(),
            next_seq: 0,
        }
    }

    /// Select how read cursors are tracked
    pub fn with_cursor_mode(mut self, mode: CursorMode) -> Self {
        self.cursor_mode = mode;
        self
    }

    /// Number of registered users
    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// Number of rooms, welcome room included
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Register a new user in the welcome room
    pub fn register_user(&mut self, name: &str) -> Result<(), StoreError> {
        if self.users.contains_key(name) {
            return Err(StoreError::NameTaken(name.to_string()));
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.users.insert(name.to_string(), User::new(name, 0, seq));
        Ok(())
    }

    /// Remove a user and their mailbox
    ///
    /// Returns false if no such user was registered.
    pub fn deregister_user(&mut self, name: &str) -> bool {
        self.users.remove(name).is_some()
    }

    /// Room names in creation order
    pub fn list_rooms(&self) -> Vec<String> {
        self.rooms.iter().map(|r| r.name.clone()).collect()
    }

    /// Name of the room the user is currently in
    pub fn current_room(&self, user: &str) -> Result<&str, StoreError> {
        let user = self.user(user)?;
        Ok(&self.rooms[user.room].name)
    }

    /// Check whether a room exists (exact, case-sensitive)
    pub fn room_exists(&self, name: &str) -> bool {
        self.room_index.contains_key(name)
    }

    /// Create a room with an empty log
    pub fn create_room(&mut self, name: &str) -> Result<(), StoreError> {
        if self.room_exists(name) {
            return Err(StoreError::RoomExists(name.to_string()));
        }
        self.room_index.insert(name.to_string(), self.rooms.len());
        self.rooms.push(Room::new(name));
        Ok(())
    }

    /// Move a user into another room
    ///
    /// The target room's cursors are left as they are.
    pub fn join_room(&mut self, user: &str, room: &str) -> Result<(), StoreError> {
        let Some(&index) = self.room_index.get(room) else {
            return Err(StoreError::NoSuchRoom(room.to_string()));
        };
        self.user_mut(user)?.room = index;
        Ok(())
    }

    /// Names of users sharing the caller's room, in registration order
    ///
    /// The caller is included.
    pub fn users_in_room(&self, user: &str) -> Result<Vec<String>, StoreError> {
        let room = self.user(user)?.room;
        Ok(self
            .users_by_registration()
            .into_iter()
            .filter(|u| u.room == room)
            .map(|u| u.name.clone())
            .collect())
    }

    /// Every registered user as `name@#room`, in registration order
    pub fn all_users(&self) -> Vec<String> {
        self.users_by_registration()
            .into_iter()
            .map(|u| format!("{}@#{}", u.name, self.rooms[u.room].name))
            .collect()
    }

    /// Append a message to the user's current room
    pub fn post_room_message(&mut self, user: &str, body: &str) -> Result<(), StoreError> {
        let room = self.user(user)?.room;
        self.rooms[room].post(user, body);
        Ok(())
    }

    /// Messages in the user's current room not yet fetched
    ///
    /// Advances the relevant cursor to the end of the log. Returns None if
    /// there is nothing new.
    pub fn fetch_new_room_messages(&mut self, user: &str) -> Result<Option<String>, StoreError> {
        let member = self.user(user)?;
        let room_idx = member.room;
        match self.cursor_mode {
            CursorMode::SharedRoom => Ok(self.rooms[room_idx].fetch_shared()),
            CursorMode::PerUser => {
                let cursor = member.cursor(room_idx);
                let room = &self.rooms[room_idx];
                let unseen = room.since(cursor);
                let log_len = room.len();
                self.user_mut(user)?.set_cursor(room_idx, log_len);
                Ok(unseen)
            }
        }
    }

    /// Queue a private message for a registered recipient
    pub fn send_private_message(
        &mut self,
        from: &str,
        to: &str,
        body: &str,
    ) -> Result<(), StoreError> {
        let Some(recipient) = self.users.get_mut(to) else {
            return Err(StoreError::NoSuchUser(to.to_string()));
        };
        recipient.deliver(from, body);
        Ok(())
    }

    /// Take and clear the user's private mailbox
    pub fn drain_private_mailbox(&mut self, user: &str) -> Result<Option<String>, StoreError> {
        Ok(self.user_mut(user)?.drain_mailbox())
    }

    fn user(&self, name: &str) -> Result<&User, StoreError> {
        self.users
            .get(name)
            .ok_or_else(|| StoreError::NoSuchUser(name.to_string()))
    }

    fn user_mut(&mut self, name: &str) -> Result<&mut User, StoreError> {
        self.users
            .get_mut(name)
            .ok_or_else(|| StoreError::NoSuchUser(name.to_string()))
    }

    fn users_by_registration(&self) -> Vec<&User> {
        let mut users: Vec<&User> = self.users.values().collect();
        users.sort_by_key(|u| u.seq);
        users
    }
}
