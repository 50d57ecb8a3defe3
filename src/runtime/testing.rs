//! Mock implementations for testing
//!
//! These mocks enable integration testing of the reactor without real I/O.

use super::executor::Reactor;
use super::traits::*;
use crate::bus::{handler, BusEvent, EventBus, EventKind, HandlerRef};
use crate::config::ReactorConfig;
use crate::conversation::{Thread, ThreadMessage};
use crate::engine::{MessageRequest, Model};
use crate::store::ReactiveStore;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// Mock Conversation Store
// ============================================================================

/// Records everything the reactor persists. Can be switched to failing.
#[derive(Default)]
pub struct MockConversationStore {
    saved_threads: Mutex<Vec<Thread>>,
    appended: Mutex<Vec<ThreadMessage>>,
    failing: AtomicBool,
}

impl MockConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every write fails
    pub fn failing() -> Self {
        let store = Self::default();
        store.failing.store(true, Ordering::SeqCst);
        store
    }

    pub fn saved_threads(&self) -> Vec<Thread> {
        self.saved_threads.lock().unwrap().clone()
    }

    pub fn appended_messages(&self) -> Vec<ThreadMessage> {
        self.appended.lock().unwrap().clone()
    }

    fn check(&self) -> Result<(), PersistError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(PersistError::Storage("disk full".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ConversationStore for MockConversationStore {
    async fn save_thread(&self, thread: &Thread) -> Result<(), PersistError> {
        self.check()?;
        self.saved_threads.lock().unwrap().push(thread.clone());
        Ok(())
    }

    async fn append_message(&self, message: &ThreadMessage) -> Result<(), PersistError> {
        self.check()?;
        self.appended.lock().unwrap().push(message.clone());
        Ok(())
    }
}

// ============================================================================
// Recording Notifier
// ============================================================================

#[derive(Default)]
pub struct RecordingNotifier {
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.notifications.lock().unwrap().push(notification);
    }
}

// ============================================================================
// Test Harness
// ============================================================================

pub type MockReactor = Reactor<Arc<ReactiveStore>, Arc<MockConversationStore>, Arc<RecordingNotifier>>;

/// Reactor wired to an in-memory store, mock persistence and a bus listener
/// that captures title requests
pub struct TestReactor {
    pub bus: Arc<EventBus>,
    pub store: Arc<ReactiveStore>,
    pub conversations: Arc<MockConversationStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub reactor: MockReactor,
    title_requests: Arc<Mutex<Vec<MessageRequest>>>,
    _title_listener: HandlerRef,
    forwarded: AtomicU64,
}

impl TestReactor {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: ReactorConfig) -> Self {
        Self::build(config, MockConversationStore::new())
    }

    pub fn with_failing_persistence() -> Self {
        Self::build(test_config(), MockConversationStore::failing())
    }

    fn build(config: ReactorConfig, conversations: MockConversationStore) -> Self {
        let bus = Arc::new(EventBus::new());
        let store = Arc::new(ReactiveStore::new());
        let conversations = Arc::new(conversations);
        let notifier = Arc::new(RecordingNotifier::default());

        let title_requests = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&title_requests);
        let listener = handler(move |event| {
            if let BusEvent::MessageSendRequested(request) = event {
                captured.lock().unwrap().push(request.clone());
            }
        });
        bus.subscribe(EventKind::MessageSendRequested, &listener);

        let reactor = Reactor::new(
            Arc::clone(&bus),
            Arc::clone(&store),
            Arc::clone(&conversations),
            Arc::clone(&notifier),
            config,
        );

        Self {
            bus,
            store,
            conversations,
            notifier,
            reactor,
            title_requests,
            _title_listener: listener,
            forwarded: AtomicU64::new(0),
        }
    }

    /// Seed the store with a thread and its stored messages
    pub fn seed_thread(&self, thread: Thread, messages: Vec<ThreadMessage>) {
        self.store.update_thread(thread);
        for message in messages {
            self.store.append_message(message);
        }
    }

    pub fn seed_model(&self, model_id: &str) {
        self.store.set_active_model(Some(Model::new(model_id)));
    }

    /// Publish on the bus, counting events the reactor will process
    pub fn publish(&self, event: BusEvent) {
        let forwarded = self.reactor.is_active() && event.kind() != EventKind::MessageSendRequested;
        self.bus.publish(&event);
        if forwarded {
            self.forwarded.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Wait until the loop has processed every event published so far
    pub async fn settle(&self) {
        let target = self.forwarded.load(Ordering::SeqCst);
        self.wait_for_processed(target).await;
    }

    /// Wait until the loop has processed `target` events in total
    pub async fn wait_for_processed(&self, target: u64) {
        let mut processed = self.reactor.watch_processed();
        tokio::time::timeout(Duration::from_secs(2), processed.wait_for(|n| *n >= target))
            .await
            .expect("reactor did not process events in time")
            .expect("reactor dropped");
    }

    pub fn processed(&self) -> u64 {
        *self.reactor.watch_processed().borrow()
    }

    pub fn forwarded(&self) -> u64 {
        self.forwarded.load(Ordering::SeqCst)
    }

    pub fn title_requests(&self) -> Vec<MessageRequest> {
        self.title_requests.lock().unwrap().clone()
    }

    /// Poll until at least `count` title requests were published
    pub async fn wait_for_title_requests(&self, count: usize) -> Vec<MessageRequest> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        loop {
            let requests = self.title_requests();
            if requests.len() >= count || tokio::time::Instant::now() >= deadline {
                return requests;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

impl Default for TestReactor {
    fn default() -> Self {
        Self::new()
    }
}

pub fn test_config() -> ReactorConfig {
    ReactorConfig::default().with_delays(Duration::from_millis(50), Duration::from_millis(50))
}

// ============================================================================
// Integration Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{MessageStatus, MessageType, Role};
    use crate::engine::{ModelLoadFailure, ModelLoadStatus};

    const THREAD: &str = "t-1";

    fn pending(id: &str, text: &str) -> ThreadMessage {
        ThreadMessage::assistant(id, THREAD, MessageStatus::Pending, text)
    }

    fn ready(id: &str, text: &str) -> ThreadMessage {
        ThreadMessage::assistant(id, THREAD, MessageStatus::Ready, text)
    }

    fn summary(text: &str) -> ThreadMessage {
        ThreadMessage::assistant("s-1", THREAD, MessageStatus::Ready, text).with_type(MessageType::Summary)
    }

    fn title_of(harness: &TestReactor) -> String {
        harness.store.thread(THREAD).unwrap().title
    }

    const KINDS: [EventKind; 5] = [
        EventKind::MessageResponseArrived,
        EventKind::MessageResponseUpdated,
        EventKind::ModelReady,
        EventKind::ModelLoadFailed,
        EventKind::ModelStopped,
    ];

    #[tokio::test]
    async fn test_activation_is_idempotent_and_symmetric() {
        let harness = TestReactor::new();

        assert!(harness.reactor.activate());
        assert!(!harness.reactor.activate());
        for kind in KINDS {
            assert_eq!(harness.bus.handler_count(kind), 1, "{kind}");
        }

        assert!(harness.reactor.deactivate());
        assert!(!harness.reactor.deactivate());
        for kind in KINDS {
            assert_eq!(harness.bus.handler_count(kind), 0, "{kind}");
        }
        // The title listener is not the reactor's to remove
        assert_eq!(harness.bus.handler_count(EventKind::MessageSendRequested), 1);

        assert!(harness.reactor.activate());
        assert!(harness.reactor.is_active());
        for kind in KINDS {
            assert_eq!(harness.bus.handler_count(kind), 1, "{kind}");
        }
    }

    #[tokio::test]
    async fn test_streaming_turn_end_to_end() {
        let harness = TestReactor::new();
        harness.seed_thread(Thread::new(THREAD), vec![ThreadMessage::user("m-1", THREAD, "How do I prune tomatoes?")]);
        harness.seed_model("llama3");
        harness.store.set_waiting_for_response(THREAD, true);
        harness.store.set_generating(true);
        harness.reactor.activate();

        // Placeholder arrives empty: indicators stay on
        harness.publish(BusEvent::MessageResponseArrived(pending("m-2", "")));
        harness.settle().await;
        assert_eq!(harness.store.messages(THREAD).len(), 2);
        assert!(harness.store.is_waiting_for_response(THREAD));
        assert!(harness.store.is_generating());

        harness.publish(BusEvent::MessageResponseUpdated(pending("m-2", "")));
        harness.settle().await;
        assert!(harness.store.is_waiting_for_response(THREAD));
        assert!(harness.store.is_generating());

        // First token clears both indicators
        harness.publish(BusEvent::MessageResponseUpdated(pending("m-2", "Remove")));
        harness.settle().await;
        assert!(!harness.store.is_waiting_for_response(THREAD));
        assert!(!harness.store.is_generating());
        assert!(harness.conversations.appended_messages().is_empty());

        harness.publish(BusEvent::MessageResponseUpdated(ready("m-2", "Remove the suckers.")));
        harness.settle().await;

        let stored = harness.store.messages(THREAD);
        assert_eq!(stored[1].status, MessageStatus::Ready);
        assert_eq!(stored[1].text(), Some("Remove the suckers."));

        let thread = harness.store.thread(THREAD).unwrap();
        assert_eq!(thread.last_message(), Some("Remove the suckers."));
        assert_eq!(harness.conversations.appended_messages().len(), 1);
        assert_eq!(harness.conversations.saved_threads().len(), 1);

        // One delayed summary request
        let requests = harness.wait_for_title_requests(1).await;
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.thread_id, THREAD);
        assert_eq!(request.message_type, MessageType::Summary);
        assert!(!request.model.parameters.stream);
        assert_eq!(request.messages.len(), 3);
        assert_eq!(request.messages[1].content, "Remove the suckers.");
        assert_eq!(request.messages[2].role, Role::User);
        assert_eq!(request.messages[2].content, harness.reactor.config().summary_instruction);

        // The engine answers with a summary; the thread gets its title
        harness.publish(BusEvent::MessageResponseArrived(summary("")));
        harness.publish(BusEvent::MessageResponseUpdated(summary("\"Pruning Tomato Plants\"")));
        harness.settle().await;
        assert_eq!(title_of(&harness), "Pruning Tomato Plants");
        assert_eq!(harness.store.messages(THREAD).len(), 2);
        assert_eq!(harness.conversations.appended_messages().len(), 1);

        // Titled now: no further requests
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(harness.title_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_title_request_waits_for_delay() {
        let config = ReactorConfig::default().with_delays(Duration::from_millis(300), Duration::from_millis(50));
        let harness = TestReactor::with_config(config);
        harness.seed_thread(Thread::new(THREAD), vec![]);
        harness.seed_model("llama3");
        harness.reactor.activate();

        harness.publish(BusEvent::MessageResponseArrived(pending("m-1", "")));
        harness.publish(BusEvent::MessageResponseUpdated(ready("m-1", "Hi")));
        harness.settle().await;
        assert!(harness.title_requests().is_empty());

        let requests = harness.wait_for_title_requests(1).await;
        assert_eq!(requests.len(), 1);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(harness.title_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_no_title_request_for_titled_thread() {
        let harness = TestReactor::new();
        harness.seed_thread(Thread::new(THREAD).with_title("Garden planning"), vec![]);
        harness.seed_model("llama3");
        harness.reactor.activate();

        harness.publish(BusEvent::MessageResponseArrived(pending("m-1", "")));
        harness.publish(BusEvent::MessageResponseUpdated(ready("m-1", "Plant beans in May.")));
        harness.settle().await;
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(harness.title_requests().is_empty());
        let thread = harness.store.thread(THREAD).unwrap();
        assert_eq!(thread.title, "Garden planning");
        assert_eq!(thread.last_message(), Some("Plant beans in May."));
        assert_eq!(harness.conversations.appended_messages().len(), 1);
    }

    #[tokio::test]
    async fn test_no_title_request_without_model() {
        let harness = TestReactor::new();
        harness.seed_thread(Thread::new(THREAD), vec![]);
        harness.reactor.activate();

        harness.publish(BusEvent::MessageResponseArrived(pending("m-1", "")));
        harness.publish(BusEvent::MessageResponseUpdated(ready("m-1", "Hello")));
        harness.settle().await;
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(harness.title_requests().is_empty());
        assert_eq!(harness.conversations.appended_messages().len(), 1);
    }

    #[tokio::test]
    async fn test_summary_only_replaces_placeholder() {
        let harness = TestReactor::new();
        harness.seed_thread(Thread::new(THREAD), vec![]);
        harness.reactor.activate();

        harness.publish(BusEvent::MessageResponseUpdated(summary("Sourdough Basics")));
        harness.settle().await;
        assert_eq!(title_of(&harness), "Sourdough Basics");
        assert_eq!(harness.conversations.saved_threads().len(), 1);

        harness.publish(BusEvent::MessageResponseUpdated(summary("Something Else")));
        harness.settle().await;
        assert_eq!(title_of(&harness), "Sourdough Basics");
        assert_eq!(harness.conversations.saved_threads().len(), 1);
        assert!(harness.store.messages(THREAD).is_empty());
    }

    #[tokio::test]
    async fn test_error_turn_clears_indicators_without_last_message() {
        let harness = TestReactor::new();
        harness.seed_thread(Thread::new(THREAD).with_title("Taxes"), vec![]);
        harness.store.set_waiting_for_response(THREAD, true);
        harness.store.set_generating(true);
        harness.reactor.activate();

        harness.publish(BusEvent::MessageResponseArrived(pending("m-1", "")));
        let failed = ThreadMessage::assistant("m-1", THREAD, MessageStatus::Error, "");
        harness.publish(BusEvent::MessageResponseUpdated(failed));
        harness.settle().await;

        assert!(!harness.store.is_waiting_for_response(THREAD));
        assert!(!harness.store.is_generating());
        assert_eq!(harness.store.messages(THREAD)[0].status, MessageStatus::Error);
        assert!(harness.store.thread(THREAD).unwrap().last_message().is_none());
    }

    #[tokio::test]
    async fn test_update_for_unknown_thread_still_clears_indicators() {
        let harness = TestReactor::new();
        harness.store.set_waiting_for_response(THREAD, true);
        harness.store.set_generating(true);
        harness.reactor.activate();

        harness.publish(BusEvent::MessageResponseUpdated(ready("m-1", "Orphan")));
        harness.settle().await;

        assert!(!harness.store.is_waiting_for_response(THREAD));
        assert!(!harness.store.is_generating());
        assert!(harness.conversations.appended_messages().is_empty());
        assert!(harness.conversations.saved_threads().is_empty());
    }

    #[tokio::test]
    async fn test_persistence_failure_is_tolerated() {
        let harness = TestReactor::with_failing_persistence();
        harness.seed_thread(Thread::new(THREAD), vec![]);
        harness.seed_model("llama3");
        harness.reactor.activate();

        harness.publish(BusEvent::MessageResponseArrived(pending("m-1", "")));
        harness.publish(BusEvent::MessageResponseUpdated(ready("m-1", "Still here")));
        harness.settle().await;

        assert_eq!(harness.store.thread(THREAD).unwrap().last_message(), Some("Still here"));
        assert_eq!(harness.wait_for_title_requests(1).await.len(), 1);

        // The loop keeps going
        harness.publish(BusEvent::ModelStopped);
        harness.settle().await;
        assert!(harness.reactor.is_active());
    }

    #[tokio::test]
    async fn test_load_failure_then_ready() {
        let harness = TestReactor::new();
        harness.store.set_queued_message(true);
        harness.reactor.activate();

        harness.publish(BusEvent::ModelLoadFailed(ModelLoadFailure {
            error: "out of memory".to_string(),
            model_id: "big-model".to_string(),
        }));
        harness.settle().await;
        assert_eq!(
            harness.store.model_load_status(),
            ModelLoadStatus::Idle {
                model: Some("big-model".to_string())
            }
        );
        assert_eq!(harness.store.load_error().as_deref(), Some("out of memory"));
        assert!(!harness.store.has_queued_message());
        assert!(harness.notifier.notifications().is_empty());

        harness.publish(BusEvent::ModelReady(Model::new("small-model")));
        harness.settle().await;
        assert_eq!(harness.store.active_model().map(|m| m.id).as_deref(), Some("small-model"));
        assert_eq!(
            harness.store.model_load_status(),
            ModelLoadStatus::Running {
                model: "small-model".to_string()
            }
        );
        assert!(harness.store.load_error().is_none());

        let notifications = harness.notifier.notifications();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].kind, NotificationKind::Success);
        assert_eq!(notifications[0].title, "Model started");
    }

    #[tokio::test]
    async fn test_model_stop_clears_after_settle_delay() {
        let harness = TestReactor::new();
        harness.reactor.activate();

        harness.publish(BusEvent::ModelReady(Model::new("llama3")));
        harness.publish(BusEvent::ModelStopped);
        harness.settle().await;
        assert!(harness.store.active_model().is_some());

        // The settle event is processed by the loop after the delay
        harness.wait_for_processed(harness.forwarded() + 1).await;
        assert!(harness.store.active_model().is_none());
        assert_eq!(harness.store.model_load_status(), ModelLoadStatus::Idle { model: None });
    }

    #[tokio::test]
    async fn test_model_stop_keeps_newer_model() {
        let harness = TestReactor::new();
        harness.reactor.activate();

        harness.publish(BusEvent::ModelReady(Model::new("llama3")));
        harness.publish(BusEvent::ModelStopped);
        harness.publish(BusEvent::ModelReady(Model::new("mistral")));
        harness.settle().await;

        harness.wait_for_processed(harness.forwarded() + 1).await;
        assert_eq!(harness.store.active_model().map(|m| m.id).as_deref(), Some("mistral"));
        assert_eq!(
            harness.store.model_load_status(),
            ModelLoadStatus::Running {
                model: "mistral".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_no_mutation_after_deactivate() {
        let harness = TestReactor::new();
        harness.seed_thread(Thread::new(THREAD), vec![pending("m-0", "")]);
        harness.store.set_waiting_for_response(THREAD, true);
        harness.store.set_generating(true);
        harness.reactor.activate();
        harness.reactor.deactivate();

        harness.publish(BusEvent::MessageResponseArrived(pending("m-1", "")));
        harness.publish(BusEvent::MessageResponseUpdated(pending("m-0", "Hel")));
        harness.publish(BusEvent::MessageResponseUpdated(ready("m-0", "Hello")));
        harness.publish(BusEvent::ModelReady(Model::new("llama3")));
        harness.publish(BusEvent::ModelLoadFailed(ModelLoadFailure {
            error: "boom".to_string(),
            model_id: "llama3".to_string(),
        }));
        harness.publish(BusEvent::ModelStopped);
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(harness.processed(), 0);

        let stored = harness.store.messages(THREAD);
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].status, MessageStatus::Pending);
        assert!(stored[0].content.is_empty());
        assert!(harness.store.is_waiting_for_response(THREAD));
        assert!(harness.store.is_generating());
        assert!(harness.store.thread(THREAD).unwrap().last_message().is_none());

        assert!(harness.conversations.saved_threads().is_empty());
        assert!(harness.conversations.appended_messages().is_empty());
        assert!(harness.title_requests().is_empty());

        assert!(harness.store.active_model().is_none());
        assert!(harness.store.load_error().is_none());
        assert!(harness.notifier.notifications().is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_applies_events_already_delivered() {
        let harness = TestReactor::new();
        harness.seed_thread(Thread::new(THREAD), vec![pending("m-1", "")]);
        harness.seed_model("llama3");
        harness.store.set_waiting_for_response(THREAD, true);
        harness.store.set_generating(true);
        harness.reactor.activate();

        // Delivered while subscribed, still queued when teardown starts
        harness.publish(BusEvent::MessageResponseUpdated(ready("m-1", "done")));
        harness.reactor.shutdown().await;

        assert_eq!(harness.processed(), 1);
        assert!(!harness.store.is_waiting_for_response(THREAD));
        assert!(!harness.store.is_generating());
        let stored = harness.store.messages(THREAD);
        assert_eq!(stored[0].status, MessageStatus::Ready);
        assert_eq!(stored[0].text(), Some("done"));
        assert_eq!(harness.conversations.appended_messages().len(), 1);

        // No new deferred work once torn down
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(harness.title_requests().is_empty());
    }

    #[tokio::test]
    async fn test_streaming_clears_waiting_exactly_once() {
        let harness = TestReactor::new();
        harness.seed_thread(Thread::new(THREAD).with_title("Greetings"), vec![pending("m-1", "")]);
        harness.store.set_waiting_for_response(THREAD, true);
        harness.store.set_generating(true);

        // Fresh receivers count the seeded values as already seen
        let mut waiting = harness.store.watch_waiting();
        let mut generating = harness.store.watch_generating();
        harness.reactor.activate();

        let mut waiting_changes = 0;
        let mut generating_changes = 0;
        for update in [pending("m-1", "He"), pending("m-1", "Hello"), ready("m-1", "Hello world")] {
            harness.publish(BusEvent::MessageResponseUpdated(update));
            harness.settle().await;
            // Settled between steps, so each step changes a flag at most once
            if waiting.has_changed().unwrap() {
                waiting_changes += 1;
                assert!(!waiting.borrow_and_update().contains(THREAD));
            }
            if generating.has_changed().unwrap() {
                generating_changes += 1;
                assert!(!*generating.borrow_and_update());
            }
        }

        assert_eq!(waiting_changes, 1);
        assert_eq!(generating_changes, 1);
        let stored = harness.store.messages(THREAD);
        assert_eq!(stored[0].text(), Some("Hello world"));
        assert_eq!(stored[0].status, MessageStatus::Ready);
    }

    #[tokio::test]
    async fn test_deactivate_cancels_deferred_work() {
        let harness = TestReactor::new();
        harness.seed_thread(Thread::new(THREAD), vec![]);
        harness.reactor.activate();

        harness.publish(BusEvent::ModelReady(Model::new("llama3")));
        harness.publish(BusEvent::MessageResponseArrived(pending("m-1", "")));
        harness.publish(BusEvent::MessageResponseUpdated(ready("m-1", "Hello")));
        harness.publish(BusEvent::ModelStopped);
        harness.settle().await;
        harness.reactor.shutdown().await;

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(harness.title_requests().is_empty());
        assert_eq!(harness.store.active_model().map(|m| m.id).as_deref(), Some("llama3"));
    }

    #[tokio::test]
    async fn test_reactivation_resumes_processing() {
        let harness = TestReactor::new();
        harness.seed_thread(Thread::new(THREAD), vec![]);
        harness.reactor.activate();
        harness.reactor.shutdown().await;
        harness.reactor.activate();

        harness.publish(BusEvent::MessageResponseArrived(pending("m-1", "")));
        harness.settle().await;
        assert_eq!(harness.store.messages(THREAD).len(), 1);
    }

    #[tokio::test]
    async fn test_snapshot_sees_state_written_after_activation() {
        let harness = TestReactor::new();
        harness.reactor.activate();

        // Thread and model appear only after the reactor started
        harness.seed_thread(Thread::new(THREAD), vec![]);
        harness.seed_model("llama3");

        harness.publish(BusEvent::MessageResponseArrived(pending("m-1", "")));
        harness.publish(BusEvent::MessageResponseUpdated(ready("m-1", "Late but fine")));
        harness.settle().await;

        assert_eq!(harness.store.thread(THREAD).unwrap().last_message(), Some("Late but fine"));
        assert_eq!(harness.wait_for_title_requests(1).await.len(), 1);
    }
}
