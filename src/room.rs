//! Room struct definition
//!
//! Represents a named chat room with an append-only message log.

/// Chat room
///
/// Rooms are never deleted. The log only grows; `cursor` is the shared
/// read offset used in `CursorMode::SharedRoom`.
#[derive(Debug)]
pub struct Room {
    /// Unique room name
    pub name: String,
    /// Formatted messages in posting order
    log: Vec<String>,
    /// Shared read offset into `log`
    cursor: usize,
}

impl Room {
    /// Create an empty room with the cursor at 0
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            log: Vec::new(),
            cursor: 0,
        }
    }

    /// Append a message from `sender`, formatted as `(<sender>@#<room>) <body>`
    pub fn post(&mut self, sender: &str, body: &str) {
        let line = format!("({}@#{}) {}", sender, self.name, body);
        self.log.push(line);
    }

    /// Number of messages in the log
    pub fn len(&self) -> usize {
        self.log.len()
    }

    /// Whether nothing has been posted yet
    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    /// Concatenate every message from `from` onward
    ///
    /// Returns None when there is nothing past `from`.
    pub fn since(&self, from: usize) -> Option<String> {
        let from = from.min(self.log.len());
        if from == self.log.len() {
            return None;
        }
        Some(self.log[from..].concat())
    }

    /// Fetch unseen messages through the shared cursor and advance it
    pub fn fetch_shared(&mut self) -> Option<String> {
        let unseen = self.since(self.cursor);
        self.cursor = self.log.len();
        unseen
    }
}
