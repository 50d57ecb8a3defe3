//! Latest-value view of the state the reactor decides on
//!
//! A `Snapshot` holds observers, not copies. Every read returns whatever the
//! store holds at that moment, so a handler that runs long after the reactor
//! was activated still sees current threads, messages and model.

use crate::conversation::{Thread, ThreadMessage};
use crate::engine::Model;
use crate::runtime::{MessagesByThread, StateStore};
use tokio::sync::watch;

#[derive(Clone)]
pub struct Snapshot {
    threads: watch::Receiver<Vec<Thread>>,
    messages: watch::Receiver<MessagesByThread>,
    active_model: watch::Receiver<Option<Model>>,
}

impl Snapshot {
    /// Follow the cells of a state store
    pub fn observe<S: StateStore + ?Sized>(store: &S) -> Self {
        Self {
            threads: store.watch_threads(),
            messages: store.watch_messages(),
            active_model: store.watch_active_model(),
        }
    }

    /// A snapshot frozen at the given values
    pub fn fixed(threads: Vec<Thread>, messages: MessagesByThread, active_model: Option<Model>) -> Self {
        // Receivers keep the last value after their sender is dropped
        Self {
            threads: watch::channel(threads).1,
            messages: watch::channel(messages).1,
            active_model: watch::channel(active_model).1,
        }
    }

    pub fn thread(&self, thread_id: &str) -> Option<Thread> {
        self.threads
            .borrow()
            .iter()
            .find(|t| t.id == thread_id)
            .cloned()
    }

    pub fn thread_messages(&self, thread_id: &str) -> Vec<ThreadMessage> {
        self.messages
            .borrow()
            .get(thread_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn active_model(&self) -> Option<Model> {
        self.active_model.borrow().clone()
    }

    pub fn active_model_id(&self) -> Option<String> {
        self.active_model.borrow().as_ref().map(|m| m.id.clone())
    }
}

impl std::fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Snapshot")
            .field("threads", &self.threads.borrow().len())
            .field("active_model", &self.active_model_id())
            .finish_non_exhaustive()
    }
}
