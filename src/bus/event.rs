//! Events carried by the bus

use crate::conversation::ThreadMessage;
use crate::engine::{MessageRequest, Model, ModelLoadFailure};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Subscription key for bus handlers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    MessageResponseArrived,
    MessageResponseUpdated,
    ModelReady,
    ModelLoadFailed,
    ModelStopped,
    MessageSendRequested,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::MessageResponseArrived => "message-response-arrived",
            EventKind::MessageResponseUpdated => "message-response-updated",
            EventKind::ModelReady => "model-ready",
            EventKind::ModelLoadFailed => "model-load-failed",
            EventKind::ModelStopped => "model-stopped",
            EventKind::MessageSendRequested => "message-send-requested",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed lifecycle event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "kebab-case")]
pub enum BusEvent {
    /// A new message started on the engine side
    MessageResponseArrived(ThreadMessage),
    /// Streamed or final content for an existing message
    MessageResponseUpdated(ThreadMessage),
    ModelReady(Model),
    ModelLoadFailed(ModelLoadFailure),
    ModelStopped,
    MessageSendRequested(MessageRequest),
}

impl BusEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            BusEvent::MessageResponseArrived(_) => EventKind::MessageResponseArrived,
            BusEvent::MessageResponseUpdated(_) => EventKind::MessageResponseUpdated,
            BusEvent::ModelReady(_) => EventKind::ModelReady,
            BusEvent::ModelLoadFailed(_) => EventKind::ModelLoadFailed,
            BusEvent::ModelStopped => EventKind::ModelStopped,
            BusEvent::MessageSendRequested(_) => EventKind::MessageSendRequested,
        }
    }
}
