//! Process-wide publish/subscribe channel for lifecycle events
//!
//! Delivery is synchronous: `publish` invokes every handler registered for
//! the event's kind, inline, before returning. Handlers are identified by
//! their `Arc` allocation, so subscribing the same handler twice is a no-op.

pub mod event;

pub use event::{BusEvent, EventKind};

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Receives events delivered by the bus
///
/// Runs inline on the publisher's stack; keep it short and never publish
/// from inside it.
pub trait EventHandler: Send + Sync {
    fn handle(&self, event: &BusEvent);
}

impl<F> EventHandler for F
where
    F: Fn(&BusEvent) + Send + Sync,
{
    fn handle(&self, event: &BusEvent) {
        self(event);
    }
}

/// Shared handler reference; its allocation is the handler's identity
pub type HandlerRef = Arc<dyn EventHandler>;

/// Wrap a closure as a handler reference
pub fn handler<F>(f: F) -> HandlerRef
where
    F: Fn(&BusEvent) + Send + Sync + 'static,
{
    Arc::new(f)
}

fn same_handler(a: &HandlerRef, b: &HandlerRef) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a).cast::<()>(),
        Arc::as_ptr(b).cast::<()>(),
    )
}

#[derive(Default)]
pub struct EventBus {
    handlers: RwLock<HashMap<EventKind, Vec<HandlerRef>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `kind`. Returns false if it was already registered.
    pub fn subscribe(&self, kind: EventKind, handler: &HandlerRef) -> bool {
        let mut handlers = self
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let entry = handlers.entry(kind).or_default();
        if entry.iter().any(|h| same_handler(h, handler)) {
            return false;
        }
        entry.push(Arc::clone(handler));
        tracing::trace!(kind = %kind, count = entry.len(), "Handler subscribed");
        true
    }

    /// Remove `handler` from `kind`. Returns false if it was not registered.
    pub fn unsubscribe(&self, kind: EventKind, handler: &HandlerRef) -> bool {
        let mut handlers = self
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(entry) = handlers.get_mut(&kind) else {
            return false;
        };
        let before = entry.len();
        entry.retain(|h| !same_handler(h, handler));
        let removed = entry.len() != before;
        if entry.is_empty() {
            handlers.remove(&kind);
        }
        removed
    }

    /// Deliver `event` to every handler of its kind. Returns the number of handlers invoked.
    pub fn publish(&self, event: &BusEvent) -> usize {
        let kind = event.kind();
        // Snapshot the list so handlers may (un)subscribe without deadlocking
        let targets: Vec<HandlerRef> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .cloned()
            .unwrap_or_default();

        tracing::trace!(kind = %kind, handlers = targets.len(), "Publishing event");
        for target in &targets {
            target.handle(event);
        }
        targets.len()
    }

    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .map_or(0, Vec::len)
    }
}
