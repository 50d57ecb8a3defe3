//! Trait abstractions for the reactor's collaborators
//!
//! These traits enable testing the executor with mock implementations.

use crate::conversation::{Thread, ThreadMessage};
use crate::engine::{Model, ModelLoadStatus};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

/// Messages of every known thread, keyed by thread id
pub type MessagesByThread = HashMap<String, Vec<ThreadMessage>>;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("Thread not found: {0}")]
    ThreadNotFound(String),
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Durable storage for threads and messages
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Create or replace a thread record
    async fn save_thread(&self, thread: &Thread) -> Result<(), PersistError>;

    /// Record a completed message
    async fn append_message(&self, message: &ThreadMessage) -> Result<(), PersistError>;
}

/// Severity of a user-facing notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub kind: NotificationKind,
}

impl Notification {
    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            kind: NotificationKind::Success,
        }
    }
}

/// Fire-and-forget user notifications
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Application state cells written by the reactor and read by everything else
///
/// The reactor is the only writer of the flags and the model cells. Readers
/// that need to follow changes use the `watch_*` observers.
pub trait StateStore: Send + Sync {
    fn active_model(&self) -> Option<Model>;
    fn set_active_model(&self, model: Option<Model>);

    fn model_load_status(&self) -> ModelLoadStatus;
    fn set_model_load_status(&self, status: ModelLoadStatus);

    fn is_waiting_for_response(&self, thread_id: &str) -> bool;
    fn set_waiting_for_response(&self, thread_id: &str, waiting: bool);

    fn is_generating(&self) -> bool;
    fn set_generating(&self, generating: bool);

    fn has_queued_message(&self) -> bool;
    fn set_queued_message(&self, queued: bool);

    fn load_error(&self) -> Option<String>;
    fn set_load_error(&self, error: Option<String>);

    /// Add a message to the end of its thread's list
    fn append_message(&self, message: ThreadMessage);

    /// Replace content and status of the message with the same id and thread id.
    /// Returns false when no such message exists or it is already terminal
    /// and the update is `Pending`.
    fn update_message(&self, message: &ThreadMessage) -> bool;

    /// Create or replace the thread with the same id
    fn update_thread(&self, thread: Thread);

    fn watch_threads(&self) -> watch::Receiver<Vec<Thread>>;
    fn watch_messages(&self) -> watch::Receiver<MessagesByThread>;
    fn watch_active_model(&self) -> watch::Receiver<Option<Model>>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: ConversationStore + ?Sized> ConversationStore for Arc<T> {
    async fn save_thread(&self, thread: &Thread) -> Result<(), PersistError> {
        (**self).save_thread(thread).await
    }

    async fn append_message(&self, message: &ThreadMessage) -> Result<(), PersistError> {
        (**self).append_message(message).await
    }
}

impl<T: StateStore + ?Sized> StateStore for Arc<T> {
    fn active_model(&self) -> Option<Model> {
        (**self).active_model()
    }

    fn set_active_model(&self, model: Option<Model>) {
        (**self).set_active_model(model);
    }

    fn model_load_status(&self) -> ModelLoadStatus {
        (**self).model_load_status()
    }

    fn set_model_load_status(&self, status: ModelLoadStatus) {
        (**self).set_model_load_status(status);
    }

    fn is_waiting_for_response(&self, thread_id: &str) -> bool {
        (**self).is_waiting_for_response(thread_id)
    }

    fn set_waiting_for_response(&self, thread_id: &str, waiting: bool) {
        (**self).set_waiting_for_response(thread_id, waiting);
    }

    fn is_generating(&self) -> bool {
        (**self).is_generating()
    }

    fn set_generating(&self, generating: bool) {
        (**self).set_generating(generating);
    }

    fn has_queued_message(&self) -> bool {
        (**self).has_queued_message()
    }

    fn set_queued_message(&self, queued: bool) {
        (**self).set_queued_message(queued);
    }

    fn load_error(&self) -> Option<String> {
        (**self).load_error()
    }

    fn set_load_error(&self, error: Option<String>) {
        (**self).set_load_error(error);
    }

    fn append_message(&self, message: ThreadMessage) {
        (**self).append_message(message);
    }

    fn update_message(&self, message: &ThreadMessage) -> bool {
        (**self).update_message(message)
    }

    fn update_thread(&self, thread: Thread) {
        (**self).update_thread(thread);
    }

    fn watch_threads(&self) -> watch::Receiver<Vec<Thread>> {
        (**self).watch_threads()
    }

    fn watch_messages(&self) -> watch::Receiver<MessagesByThread> {
        (**self).watch_messages()
    }

    fn watch_active_model(&self) -> watch::Receiver<Option<Model>> {
        (**self).watch_active_model()
    }
}

impl<T: Notifier + ?Sized> Notifier for Arc<T> {
    fn notify(&self, notification: Notification) {
        (**self).notify(notification);
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

use crate::db::{Database, DbError};

impl From<DbError> for PersistError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::ThreadNotFound(id) => PersistError::ThreadNotFound(id),
            other => PersistError::Storage(other.to_string()),
        }
    }
}

/// Adapter to use Database as the conversation store
#[derive(Clone)]
pub struct DatabaseStore {
    db: Database,
}

impl DatabaseStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn inner(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl ConversationStore for DatabaseStore {
    async fn save_thread(&self, thread: &Thread) -> Result<(), PersistError> {
        let db = self.db.clone();
        let thread = thread.clone();
        tokio::task::spawn_blocking(move || db.upsert_thread(&thread))
            .await
            .map_err(|e| PersistError::Storage(e.to_string()))?
            .map_err(PersistError::from)
    }

    async fn append_message(&self, message: &ThreadMessage) -> Result<(), PersistError> {
        let db = self.db.clone();
        let message = message.clone();
        tokio::task::spawn_blocking(move || db.upsert_message(&message))
            .await
            .map_err(|e| PersistError::Storage(e.to_string()))?
            .map_err(PersistError::from)
    }
}

/// Notifier that writes notifications to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.kind {
            NotificationKind::Error => tracing::error!(
                title = %notification.title,
                description = %notification.description,
                "Notification"
            ),
            NotificationKind::Warning => tracing::warn!(
                title = %notification.title,
                description = %notification.description,
                "Notification"
            ),
            NotificationKind::Success | NotificationKind::Info => tracing::info!(
                title = %notification.title,
                description = %notification.description,
                "Notification"
            ),
        }
    }
}
