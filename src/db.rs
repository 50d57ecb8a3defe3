//! Database module for thread persistence
//!
//! Stores threads and their completed messages in SQLite.

mod schema;

pub use schema::SCHEMA;
use schema::{format_datetime, MessageRow, ThreadRow};

use crate::conversation::{Thread, ThreadMessage};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Thread not found: {0}")]
    ThreadNotFound(String),
    #[error("Invalid {column} value: {value}")]
    InvalidColumn { column: &'static str, value: String },
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        Self::init(Connection::open(path)?)
    }

    /// Open an in-memory database
    pub fn open_in_memory() -> DbResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> DbResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ==================== Thread Operations ====================

    /// Create the thread or replace its title, metadata and update time
    pub fn upsert_thread(&self, thread: &Thread) -> DbResult<()> {
        let metadata = serde_json::to_string(&thread.metadata)?;
        self.conn().execute(
            "INSERT INTO threads (id, title, metadata, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                metadata = excluded.metadata,
                updated_at = excluded.updated_at",
            params![
                thread.id,
                thread.title,
                metadata,
                format_datetime(&thread.created_at),
                format_datetime(&thread.updated_at),
            ],
        )?;
        Ok(())
    }

    pub fn get_thread(&self, id: &str) -> DbResult<Thread> {
        let row = self
            .conn()
            .query_row(
                "SELECT id, title, metadata, created_at, updated_at FROM threads WHERE id = ?1",
                params![id],
                |row| {
                    Ok(ThreadRow {
                        id: row.get(0)?,
                        title: row.get(1)?,
                        metadata: row.get(2)?,
                        created_at: row.get(3)?,
                        updated_at: row.get(4)?,
                    })
                },
            )
            .optional()?;

        row.ok_or_else(|| DbError::ThreadNotFound(id.to_string()))?
            .into_thread()
    }

    /// All threads, most recently updated first
    pub fn list_threads(&self) -> DbResult<Vec<Thread>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, title, metadata, created_at, updated_at FROM threads
             ORDER BY updated_at DESC, id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(ThreadRow {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    metadata: row.get(2)?,
                    created_at: row.get(3)?,
                    updated_at: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(ThreadRow::into_thread).collect()
    }

    // ==================== Message Operations ====================

    /// Insert the message, or replace its status and content if already stored
    pub fn upsert_message(&self, message: &ThreadMessage) -> DbResult<()> {
        let content = serde_json::to_string(&message.content)?;
        let conn = self.conn();

        let thread_exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM threads WHERE id = ?1)",
            params![message.thread_id],
            |row| row.get(0),
        )?;
        if !thread_exists {
            return Err(DbError::ThreadNotFound(message.thread_id.clone()));
        }

        conn.execute(
            "INSERT INTO messages (id, thread_id, role, status, message_type, content, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
                status = excluded.status,
                message_type = excluded.message_type,
                content = excluded.content",
            params![
                message.id,
                message.thread_id,
                message.role.as_str(),
                message.status.as_str(),
                message.message_type.as_str(),
                content,
                format_datetime(&message.created_at),
            ],
        )?;
        Ok(())
    }

    /// Messages of a thread in the order they were first stored
    pub fn get_messages(&self, thread_id: &str) -> DbResult<Vec<ThreadMessage>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, thread_id, role, status, message_type, content, created_at
             FROM messages WHERE thread_id = ?1 ORDER BY created_at, rowid",
        )?;
        let rows = stmt
            .query_map(params![thread_id], |row| {
                Ok(MessageRow {
                    id: row.get(0)?,
                    thread_id: row.get(1)?,
                    role: row.get(2)?,
                    status: row.get(3)?,
                    message_type: row.get(4)?,
                    content: row.get(5)?,
                    created_at: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(MessageRow::into_message).collect()
    }
}
