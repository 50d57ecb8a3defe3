//! Reactor executor
//!
//! Bus handlers only forward events into a channel. A single loop task drains
//! the channel, runs the transition and executes its effects, so events are
//! handled one at a time in arrival order and nothing is published back onto
//! the bus while a publish is still delivering.

use super::traits::{ConversationStore, Notifier, StateStore};
use crate::bus::{BusEvent, EventBus, EventHandler, EventKind, HandlerRef};
use crate::config::ReactorConfig;
use crate::state_machine::{transition, Effect, Event, Snapshot};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Bus kinds the reactor listens to
const SUBSCRIBED_KINDS: [EventKind; 5] = [
    EventKind::MessageResponseArrived,
    EventKind::MessageResponseUpdated,
    EventKind::ModelReady,
    EventKind::ModelLoadFailed,
    EventKind::ModelStopped,
];

/// Event coordinator between the inference engine and the state store
pub struct Reactor<S, C, N>
where
    S: StateStore + 'static,
    C: ConversationStore + 'static,
    N: Notifier + 'static,
{
    bus: Arc<EventBus>,
    core: Arc<ReactorCore<S, C, N>>,
    inlet: Arc<Inlet>,
    /// Created once so unsubscribe removes exactly what subscribe added
    handler: HandlerRef,
    session: Mutex<Option<Session>>,
}

/// Everything the loop task needs to execute effects
struct ReactorCore<S, C, N> {
    config: ReactorConfig,
    store: S,
    conversations: C,
    notifier: N,
    snapshot: Snapshot,
    processed: watch::Sender<u64>,
}

/// State of one activation
struct Session {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Per-loop handles shared with deferred tasks
#[derive(Clone)]
struct LoopContext {
    bus: Arc<EventBus>,
    event_tx: mpsc::UnboundedSender<Event>,
    cancel: CancellationToken,
}

/// Entry point of the loop channel. Closed while the reactor is inactive.
#[derive(Default)]
struct Inlet {
    tx: Mutex<Option<mpsc::UnboundedSender<Event>>>,
}

impl Inlet {
    fn open(&self, tx: mpsc::UnboundedSender<Event>) {
        *self.tx.lock().unwrap_or_else(PoisonError::into_inner) = Some(tx);
    }

    fn close(&self) {
        self.tx.lock().unwrap_or_else(PoisonError::into_inner).take();
    }

    fn forward(&self, event: Event) -> bool {
        let guard = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }
}

struct ForwardingHandler {
    inlet: Arc<Inlet>,
}

impl EventHandler for ForwardingHandler {
    fn handle(&self, event: &BusEvent) {
        let Some(event) = Event::from_bus(event) else {
            return;
        };
        let name = event.name();
        if !self.inlet.forward(event) {
            tracing::debug!(event = name, "Dropped event, reactor inactive");
        }
    }
}

impl<S, C, N> Reactor<S, C, N>
where
    S: StateStore + 'static,
    C: ConversationStore + 'static,
    N: Notifier + 'static,
{
    pub fn new(bus: Arc<EventBus>, store: S, conversations: C, notifier: N, config: ReactorConfig) -> Self {
        let snapshot = Snapshot::observe(&store);
        let inlet = Arc::new(Inlet::default());
        let handler: HandlerRef = Arc::new(ForwardingHandler {
            inlet: Arc::clone(&inlet),
        });
        Self {
            bus,
            core: Arc::new(ReactorCore {
                config,
                store,
                conversations,
                notifier,
                snapshot,
                processed: watch::channel(0).0,
            }),
            inlet,
            handler,
            session: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ReactorConfig {
        &self.core.config
    }

    pub fn store(&self) -> &S {
        &self.core.store
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Number of events the loop has finished processing since creation
    pub fn watch_processed(&self) -> watch::Receiver<u64> {
        self.core.processed.subscribe()
    }

    pub fn is_active(&self) -> bool {
        self.session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Subscribe to the bus and start the event loop.
    ///
    /// Must be called inside a tokio runtime. Returns false if already active.
    pub fn activate(&self) -> bool {
        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        if session.is_some() {
            tracing::debug!("Reactor already active");
            return false;
        }

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        self.inlet.open(event_tx.clone());
        for kind in SUBSCRIBED_KINDS {
            self.bus.subscribe(kind, &self.handler);
        }

        let cancel = CancellationToken::new();
        let ctx = LoopContext {
            bus: Arc::clone(&self.bus),
            event_tx,
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(Arc::clone(&self.core).run(event_rx, ctx));

        *session = Some(Session { cancel, task });
        tracing::info!("Reactor activated");
        true
    }

    /// Unsubscribe every handler and cancel the loop and all deferred work.
    ///
    /// Returns false if the reactor was not active.
    pub fn deactivate(&self) -> bool {
        self.end_session().is_some()
    }

    /// Deactivate and wait for the loop task to finish.
    ///
    /// Events delivered before the call are applied before this returns.
    pub async fn shutdown(&self) {
        if let Some(task) = self.end_session() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Reactor loop ended abnormally");
            }
        }
    }

    fn end_session(&self) -> Option<JoinHandle<()>> {
        let session = self
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()?;

        for kind in SUBSCRIBED_KINDS {
            self.bus.unsubscribe(kind, &self.handler);
        }
        self.inlet.close();
        session.cancel.cancel();
        tracing::info!("Reactor deactivated");
        Some(session.task)
    }
}

impl<S, C, N> Drop for Reactor<S, C, N>
where
    S: StateStore + 'static,
    C: ConversationStore + 'static,
    N: Notifier + 'static,
{
    fn drop(&mut self) {
        self.end_session();
    }
}

impl<S, C, N> ReactorCore<S, C, N>
where
    S: StateStore + 'static,
    C: ConversationStore + 'static,
    N: Notifier + 'static,
{
    async fn run(self: Arc<Self>, mut event_rx: mpsc::UnboundedReceiver<Event>, ctx: LoopContext) {
        tracing::debug!("Reactor loop started");

        loop {
            tokio::select! {
                biased;

                () = ctx.cancel.cancelled() => break,

                Some(event) = event_rx.recv() => self.process_event(event, &ctx).await,

                else => break,
            }
        }

        // The inlet closes before cancellation; apply what was already delivered
        let mut drained = 0usize;
        while let Ok(event) = event_rx.try_recv() {
            self.process_event(event, &ctx).await;
            drained += 1;
        }

        tracing::debug!(drained, "Reactor loop stopped");
    }

    async fn process_event(&self, event: Event, ctx: &LoopContext) {
        let name = event.name();
        if let Event::MessageArrived(msg) | Event::MessageUpdated(msg) = &event {
            if !msg.is_summary() && self.snapshot.thread(&msg.thread_id).is_none() {
                tracing::debug!(thread_id = %msg.thread_id, message_id = %msg.id, "Thread not in store");
            }
        }

        let result = transition(&self.snapshot, &self.config, event);
        tracing::debug!(event = name, effects = result.effects.len(), "Reactor transition");

        for effect in result.effects {
            self.execute_effect(effect, ctx).await;
        }
        self.processed.send_modify(|n| *n += 1);
    }

    async fn execute_effect(&self, effect: Effect, ctx: &LoopContext) {
        match effect {
            Effect::AppendMessage(msg) => self.store.append_message(msg),

            Effect::UpdateMessage(msg) => {
                if !self.store.update_message(&msg) {
                    tracing::debug!(
                        thread_id = %msg.thread_id,
                        message_id = %msg.id,
                        status = msg.status.as_str(),
                        "Message update not applied"
                    );
                }
            }

            Effect::ClearWaiting { thread_id } => {
                self.store.set_waiting_for_response(&thread_id, false);
            }

            Effect::ClearGenerating => self.store.set_generating(false),

            Effect::UpdateThread(thread) => self.store.update_thread(thread),

            Effect::SaveThread(thread) => {
                if let Err(e) = self.conversations.save_thread(&thread).await {
                    tracing::warn!(thread_id = %thread.id, error = %e, "Failed to persist thread");
                }
            }

            Effect::PersistMessage(msg) => {
                if let Err(e) = self.conversations.append_message(&msg).await {
                    tracing::warn!(
                        thread_id = %msg.thread_id,
                        message_id = %msg.id,
                        error = %e,
                        "Failed to persist message"
                    );
                }
            }

            Effect::ScheduleTitleRequest { request, delay } => {
                if ctx.cancel.is_cancelled() {
                    tracing::debug!(thread_id = %request.thread_id, "Reactor deactivated, not scheduling title request");
                    return;
                }
                tracing::debug!(thread_id = %request.thread_id, delay = ?delay, "Scheduling title request");
                let ctx = ctx.clone();
                tokio::spawn(async move {
                    tokio::select! {
                        biased;

                        () = ctx.cancel.cancelled() => {
                            tracing::debug!(thread_id = %request.thread_id, "Title request cancelled");
                        }

                        () = tokio::time::sleep(delay) => {
                            tracing::info!(
                                thread_id = %request.thread_id,
                                request_id = %request.id,
                                model = %request.model.id,
                                "Requesting thread title"
                            );
                            ctx.bus.publish(&BusEvent::MessageSendRequested(request));
                        }
                    }
                });
            }

            Effect::SetActiveModel(model) => self.store.set_active_model(model),

            Effect::SetModelLoadStatus(status) => self.store.set_model_load_status(status),

            Effect::SetLoadError(error) => {
                if let Some(error) = &error {
                    tracing::warn!(error = %error, "Model failed to load");
                }
                self.store.set_load_error(error);
            }

            Effect::ClearQueuedMessage => self.store.set_queued_message(false),

            Effect::Notify(notification) => self.notifier.notify(notification),

            Effect::ScheduleModelStopSettle { model_id, delay } => {
                if ctx.cancel.is_cancelled() {
                    tracing::debug!("Reactor deactivated, not scheduling model stop settle");
                    return;
                }
                let ctx = ctx.clone();
                tokio::spawn(async move {
                    tokio::select! {
                        biased;

                        () = ctx.cancel.cancelled() => {}

                        () = tokio::time::sleep(delay) => {
                            if ctx.event_tx.send(Event::ModelStopSettled { model_id }).is_err() {
                                tracing::debug!("Model stop settle dropped, reactor loop gone");
                            }
                        }
                    }
                });
            }
        }
    }
}
