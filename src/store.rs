//! In-memory state store built from observable cells
//!
//! Every cell is a `tokio::sync::watch` channel: writers replace the value,
//! readers either read the latest value or hold a receiver and get told when
//! it changes. Writes that don't change a value don't wake observers.

use crate::conversation::{MessageStatus, Thread, ThreadMessage};
use crate::engine::{Model, ModelLoadStatus};
use crate::runtime::{MessagesByThread, StateStore};
use std::collections::HashSet;
use tokio::sync::watch;

pub struct ReactiveStore {
    threads: watch::Sender<Vec<Thread>>,
    messages: watch::Sender<MessagesByThread>,
    active_model: watch::Sender<Option<Model>>,
    load_status: watch::Sender<ModelLoadStatus>,
    waiting: watch::Sender<HashSet<String>>,
    generating: watch::Sender<bool>,
    queued: watch::Sender<bool>,
    load_error: watch::Sender<Option<String>>,
}

impl Default for ReactiveStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ReactiveStore {
    pub fn new() -> Self {
        Self {
            threads: watch::channel(Vec::new()).0,
            messages: watch::channel(MessagesByThread::new()).0,
            active_model: watch::channel(None).0,
            load_status: watch::channel(ModelLoadStatus::default()).0,
            waiting: watch::channel(HashSet::new()).0,
            generating: watch::channel(false).0,
            queued: watch::channel(false).0,
            load_error: watch::channel(None).0,
        }
    }

    /// Seed the store with known threads and their messages
    pub fn hydrate(&self, threads: Vec<Thread>, messages: MessagesByThread) {
        self.threads.send_replace(threads);
        self.messages.send_replace(messages);
    }

    pub fn thread(&self, thread_id: &str) -> Option<Thread> {
        self.threads
            .borrow()
            .iter()
            .find(|t| t.id == thread_id)
            .cloned()
    }

    pub fn threads(&self) -> Vec<Thread> {
        self.threads.borrow().clone()
    }

    pub fn messages(&self, thread_id: &str) -> Vec<ThreadMessage> {
        self.messages
            .borrow()
            .get(thread_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn watch_load_status(&self) -> watch::Receiver<ModelLoadStatus> {
        self.load_status.subscribe()
    }

    pub fn watch_generating(&self) -> watch::Receiver<bool> {
        self.generating.subscribe()
    }

    pub fn watch_waiting(&self) -> watch::Receiver<HashSet<String>> {
        self.waiting.subscribe()
    }
}

fn replace_if_changed<T: PartialEq>(cell: &watch::Sender<T>, value: T) {
    cell.send_if_modified(|current| {
        if *current == value {
            false
        } else {
            *current = value;
            true
        }
    });
}

impl StateStore for ReactiveStore {
    fn active_model(&self) -> Option<Model> {
        self.active_model.borrow().clone()
    }

    fn set_active_model(&self, model: Option<Model>) {
        replace_if_changed(&self.active_model, model);
    }

    fn model_load_status(&self) -> ModelLoadStatus {
        self.load_status.borrow().clone()
    }

    fn set_model_load_status(&self, status: ModelLoadStatus) {
        replace_if_changed(&self.load_status, status);
    }

    fn is_waiting_for_response(&self, thread_id: &str) -> bool {
        self.waiting.borrow().contains(thread_id)
    }

    fn set_waiting_for_response(&self, thread_id: &str, waiting: bool) {
        self.waiting.send_if_modified(|set| {
            if waiting {
                set.insert(thread_id.to_string())
            } else {
                set.remove(thread_id)
            }
        });
    }

    fn is_generating(&self) -> bool {
        *self.generating.borrow()
    }

    fn set_generating(&self, generating: bool) {
        replace_if_changed(&self.generating, generating);
    }

    fn has_queued_message(&self) -> bool {
        *self.queued.borrow()
    }

    fn set_queued_message(&self, queued: bool) {
        replace_if_changed(&self.queued, queued);
    }

    fn load_error(&self) -> Option<String> {
        self.load_error.borrow().clone()
    }

    fn set_load_error(&self, error: Option<String>) {
        replace_if_changed(&self.load_error, error);
    }

    fn append_message(&self, message: ThreadMessage) {
        self.messages.send_modify(|all| {
            all.entry(message.thread_id.clone()).or_default().push(message);
        });
    }

    fn update_message(&self, message: &ThreadMessage) -> bool {
        self.messages.send_if_modified(|all| {
            let Some(existing) = all
                .get_mut(&message.thread_id)
                .and_then(|list| list.iter_mut().find(|m| m.id == message.id))
            else {
                return false;
            };
            // Terminal messages are immutable; a late stream chunk must not reopen them
            if existing.status.is_terminal() && message.status == MessageStatus::Pending {
                return false;
            }
            existing.content.clone_from(&message.content);
            existing.status = message.status;
            true
        })
    }

    fn update_thread(&self, thread: Thread) {
        self.threads.send_modify(|threads| {
            match threads.iter_mut().find(|t| t.id == thread.id) {
                Some(existing) => *existing = thread,
                None => threads.push(thread),
            }
        });
    }

    fn watch_threads(&self) -> watch::Receiver<Vec<Thread>> {
        self.threads.subscribe()
    }

    fn watch_messages(&self) -> watch::Receiver<MessagesByThread> {
        self.messages.subscribe()
    }

    fn watch_active_model(&self) -> watch::Receiver<Option<Model>> {
        self.active_model.subscribe()
    }
}
