//! Thread and message types shared by the store, the reactor and persistence

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Title every thread starts with until auto-titling replaces it
pub const NEW_THREAD_TITLE: &str = "New Thread";

/// Metadata key holding the display text of the last completed reply
pub const LAST_MESSAGE_KEY: &str = "lastMessage";

/// A conversation container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Thread {
    /// Create a thread carrying the placeholder title
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            title: NEW_THREAD_TITLE.to_string(),
            metadata: Map::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// True while auto-titling is still allowed to overwrite the title
    pub fn has_placeholder_title(&self, placeholder: &str) -> bool {
        self.title == placeholder
    }

    pub fn last_message(&self) -> Option<&str> {
        self.metadata.get(LAST_MESSAGE_KEY).and_then(Value::as_str)
    }
}

/// Message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            "system" => Some(Role::System),
            _ => None,
        }
    }
}

/// Generation status of a message
///
/// `Pending` is the only non-terminal status. Once a message is `Ready` or
/// `Error` it never goes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Pending,
    Ready,
    Error,
}

impl MessageStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, MessageStatus::Pending)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MessageStatus::Pending => "pending",
            MessageStatus::Ready => "ready",
            MessageStatus::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(MessageStatus::Pending),
            "ready" => Some(MessageStatus::Ready),
            "error" => Some(MessageStatus::Error),
            _ => None,
        }
    }
}

/// Distinguishes visible conversation turns from the internal title turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    #[default]
    Thread,
    Summary,
}

impl MessageType {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageType::Thread => "thread",
            MessageType::Summary => "summary",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "thread" => Some(MessageType::Thread),
            "summary" => Some(MessageType::Summary),
            _ => None,
        }
    }
}

/// One part of a message body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { url: String },
}

impl ContentPart {
    pub fn text(s: impl Into<String>) -> Self {
        ContentPart::Text { text: s.into() }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentPart::Text { text } => Some(text),
            ContentPart::ImageUrl { .. } => None,
        }
    }
}

/// One turn within a thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadMessage {
    pub id: String,
    pub thread_id: String,
    pub role: Role,
    pub status: MessageStatus,
    #[serde(default)]
    pub content: Vec<ContentPart>,
    #[serde(rename = "type", default)]
    pub message_type: MessageType,
    pub created_at: DateTime<Utc>,
}

impl ThreadMessage {
    pub fn new(
        id: impl Into<String>,
        thread_id: impl Into<String>,
        role: Role,
        status: MessageStatus,
    ) -> Self {
        Self {
            id: id.into(),
            thread_id: thread_id.into(),
            role,
            status,
            content: Vec::new(),
            message_type: MessageType::Thread,
            created_at: Utc::now(),
        }
    }

    /// Assistant turn with a single text part
    pub fn assistant(
        id: impl Into<String>,
        thread_id: impl Into<String>,
        status: MessageStatus,
        text: &str,
    ) -> Self {
        Self::new(id, thread_id, Role::Assistant, status).with_text(text)
    }

    pub fn user(id: impl Into<String>, thread_id: impl Into<String>, text: &str) -> Self {
        Self::new(id, thread_id, Role::User, MessageStatus::Ready).with_text(text)
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.content = if text.is_empty() {
            Vec::new()
        } else {
            vec![ContentPart::text(text)]
        };
        self
    }

    pub fn with_type(mut self, message_type: MessageType) -> Self {
        self.message_type = message_type;
        self
    }

    /// Canonical display string: the value of the first content part, when it is text
    pub fn text(&self) -> Option<&str> {
        self.content.first().and_then(ContentPart::as_text)
    }

    /// First text part, empty when there is none
    pub fn text_or_empty(&self) -> &str {
        self.text().unwrap_or_default()
    }

    pub fn has_text(&self) -> bool {
        self.text().is_some_and(|t| !t.is_empty())
    }

    pub fn is_summary(&self) -> bool {
        self.message_type == MessageType::Summary
    }
}
