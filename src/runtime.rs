//! Runtime for the reactor
//!
//! Wires the pure transition function to the bus, the state store, durable
//! storage and notifications.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::Reactor;
pub use traits::*;

use crate::bus::EventBus;
use crate::config::ReactorConfig;
use crate::db::Database;
use crate::store::ReactiveStore;
use std::sync::Arc;

/// Type alias for the production reactor with concrete implementations
pub type ProductionReactor = Reactor<Arc<ReactiveStore>, DatabaseStore, TracingNotifier>;

impl ProductionReactor {
    /// Build a reactor over a hydrated store that persists into `db`
    pub fn production(bus: Arc<EventBus>, store: Arc<ReactiveStore>, db: Database, config: ReactorConfig) -> Self {
        Reactor::new(bus, store, DatabaseStore::new(db), TracingNotifier, config)
    }
}

/// Load every persisted thread and its messages into the store
pub fn hydrate_store(store: &ReactiveStore, db: &Database) -> crate::db::DbResult<usize> {
    let threads = db.list_threads()?;
    let mut messages = MessagesByThread::new();
    for thread in &threads {
        let thread_messages = db.get_messages(&thread.id)?;
        if !thread_messages.is_empty() {
            messages.insert(thread.id.clone(), thread_messages);
        }
    }
    let count = threads.len();
    store.hydrate(threads, messages);
    tracing::info!(threads = count, "Hydrated state store");
    Ok(count)
}
