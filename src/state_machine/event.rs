//! Events the reactor reacts to

use crate::bus::BusEvent;
use crate::conversation::ThreadMessage;
use crate::engine::{Model, ModelLoadFailure};

/// Inputs to the transition function
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    // Message events
    MessageArrived(ThreadMessage),
    MessageUpdated(ThreadMessage),

    // Model events
    ModelReady(Model),
    ModelLoadFailed(ModelLoadFailure),
    ModelStopped,

    /// The settle delay after a stop has elapsed.
    /// `model_id` is the model that was active when the stop arrived.
    ModelStopSettled { model_id: Option<String> },
}

impl Event {
    /// Map a bus event to a reactor event. Events the reactor emits itself map to None.
    pub fn from_bus(event: &BusEvent) -> Option<Self> {
        match event {
            BusEvent::MessageResponseArrived(msg) => Some(Event::MessageArrived(msg.clone())),
            BusEvent::MessageResponseUpdated(msg) => Some(Event::MessageUpdated(msg.clone())),
            BusEvent::ModelReady(model) => Some(Event::ModelReady(model.clone())),
            BusEvent::ModelLoadFailed(failure) => Some(Event::ModelLoadFailed(failure.clone())),
            BusEvent::ModelStopped => Some(Event::ModelStopped),
            BusEvent::MessageSendRequested(_) => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Event::MessageArrived(_) => "message_arrived",
            Event::MessageUpdated(_) => "message_updated",
            Event::ModelReady(_) => "model_ready",
            Event::ModelLoadFailed(_) => "model_load_failed",
            Event::ModelStopped => "model_stopped",
            Event::ModelStopSettled { .. } => "model_stop_settled",
        }
    }
}
