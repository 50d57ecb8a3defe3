//! Database schema and row types

use super::{DbError, DbResult};
use crate::conversation::{ContentPart, MessageStatus, MessageType, Role, Thread, ThreadMessage};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

/// SQL schema for initialization
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS threads (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    metadata TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_threads_updated ON threads(updated_at DESC);

CREATE TABLE IF NOT EXISTS messages (
    id TEXT PRIMARY KEY,
    thread_id TEXT NOT NULL,
    role TEXT NOT NULL,
    status TEXT NOT NULL,
    message_type TEXT NOT NULL DEFAULT 'thread',
    content TEXT NOT NULL,
    created_at TEXT NOT NULL,

    FOREIGN KEY (thread_id) REFERENCES threads(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_messages_thread ON messages(thread_id, created_at);
";

/// Timestamps are stored with a fixed width so text order matches time order
pub(super) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(super) fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}

/// A `threads` row as stored
pub(super) struct ThreadRow {
    pub id: String,
    pub title: String,
    pub metadata: String,
    pub created_at: String,
    pub updated_at: String,
}

impl ThreadRow {
    pub fn into_thread(self) -> DbResult<Thread> {
        let metadata: Map<String, Value> = serde_json::from_str(&self.metadata)?;
        Ok(Thread {
            id: self.id,
            title: self.title,
            metadata,
            created_at: parse_datetime(&self.created_at),
            updated_at: parse_datetime(&self.updated_at),
        })
    }
}

/// A `messages` row as stored
pub(super) struct MessageRow {
    pub id: String,
    pub thread_id: String,
    pub role: String,
    pub status: String,
    pub message_type: String,
    pub content: String,
    pub created_at: String,
}

impl MessageRow {
    pub fn into_message(self) -> DbResult<ThreadMessage> {
        let role = Role::parse(&self.role).ok_or_else(|| invalid("role", &self.role))?;
        let status = MessageStatus::parse(&self.status).ok_or_else(|| invalid("status", &self.status))?;
        let message_type =
            MessageType::parse(&self.message_type).ok_or_else(|| invalid("message_type", &self.message_type))?;
        let content: Vec<ContentPart> = serde_json::from_str(&self.content)?;

        Ok(ThreadMessage {
            id: self.id,
            thread_id: self.thread_id,
            role,
            status,
            content,
            message_type,
            created_at: parse_datetime(&self.created_at),
        })
    }
}

fn invalid(column: &'static str, value: &str) -> DbError {
    DbError::InvalidColumn {
        column,
        value: value.to_string(),
    }
}
