use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Title given to sessions that have no user message yet
pub const DEFAULT_TITLE: &str = "New chat";

/// Maximum number of code points kept from the first user message as title
pub const TITLE_MAX_CHARS: usize = 20;

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System prompt
    System,
    /// Message typed by the user
    User,
    /// Reply produced by the completion endpoint
    Assistant,
}

impl Role {
    /// Wire name of the role as used by chat-completion APIs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single message inside a chat session
///
/// Content is only mutated while an assistant reply is streaming in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message identifier (ULID)
    pub id: String,
    /// Author of the message
    pub role: Role,
    /// Text content
    pub content: String,
    /// When the message was created
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Creates a message with a fresh id and the current time
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Creates a new user message
    ///
    /// # Examples
    ///
    /// ```
    /// use parley::session::{Message, Role};
    ///
    /// let msg = Message::user("Hello!");
    /// assert_eq!(msg.role, Role::User);
    /// ```
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Creates a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// One persisted conversation thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    /// Unique, time-ordered session identifier (ULID)
    pub id: String,
    /// Display title, derived from the first user message
    pub title: String,
    /// Messages in the order they were added
    pub messages: Vec<Message>,
    /// When the session was created
    pub created_at: DateTime<Utc>,
}

impl ChatSession {
    /// Creates an empty session with the given title
    ///
    /// # Examples
    ///
    /// ```
    /// use parley::session::ChatSession;
    ///
    /// let session = ChatSession::new("New chat");
    /// assert!(session.messages.is_empty());
    /// assert_eq!(session.id.len(), 26);
    /// ```
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            title: title.into(),
            messages: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Finds a message by id
    pub fn message(&self, message_id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == message_id)
    }
}

/// Derives a session title from user input
///
/// The input is trimmed and cut to at most `max_chars` code points. Blank
/// input yields [`DEFAULT_TITLE`].
///
/// # Examples
///
/// ```
/// use parley::session::derive_title;
///
/// assert_eq!(derive_title("  Hi  ", 20), "Hi");
/// assert_eq!(derive_title("abcdefghijklmnopqrstuvwxyz", 20), "abcdefghijklmnopqrst");
/// assert_eq!(derive_title("   ", 20), "New chat");
/// ```
pub fn derive_title(text: &str, max_chars: usize) -> String {
    let title: String = text.trim().chars().take(max_chars).collect();
    if title.is_empty() {
        DEFAULT_TITLE.to_string()
    } else {
        title
    }
}

/// Generates a new time-derived identifier
pub fn new_id() -> String {
    Ulid::new().to_string()
}
