//! Effects produced by transitions

use crate::conversation::{Thread, ThreadMessage};
use crate::engine::{MessageRequest, Model, ModelLoadStatus};
use crate::runtime::Notification;
use std::time::Duration;

/// Effects to be executed after a transition, in order
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Add a visible message to its thread in the state store
    AppendMessage(ThreadMessage),

    /// Replace stored content/status of an existing message
    UpdateMessage(ThreadMessage),

    /// Stop showing the thread as waiting for a response
    ClearWaiting { thread_id: String },

    /// Stop showing the global generating indicator
    ClearGenerating,

    /// Replace the thread record in the state store
    UpdateThread(Thread),

    /// Persist the thread through the conversation store
    SaveThread(Thread),

    /// Persist a completed message through the conversation store
    PersistMessage(ThreadMessage),

    /// Publish a title request once `delay` has elapsed
    ScheduleTitleRequest {
        request: MessageRequest,
        delay: Duration,
    },

    SetActiveModel(Option<Model>),
    SetModelLoadStatus(ModelLoadStatus),
    SetLoadError(Option<String>),

    /// Abandon any message queued behind a model load
    ClearQueuedMessage,

    Notify(Notification),

    /// Feed `ModelStopSettled` back into the reactor after `delay`
    ScheduleModelStopSettle {
        model_id: Option<String>,
        delay: Duration,
    },
}

impl Effect {
    pub fn clear_waiting(thread_id: impl Into<String>) -> Self {
        Effect::ClearWaiting {
            thread_id: thread_id.into(),
        }
    }
}
