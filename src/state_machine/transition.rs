//! Pure transition function
//!
//! Given the latest snapshot and one event, decide which effects to run.
//! No I/O happens here; the runtime executes the returned effects in order.

use super::{Effect, Event, Snapshot};
use crate::config::ReactorConfig;
use crate::conversation::{Role, ThreadMessage, LAST_MESSAGE_KEY};
use crate::engine::{Model, ModelLoadFailure, ModelLoadStatus};
use crate::runtime::Notification;
use crate::title_generator::{build_title_request, clean_title, should_generate_title};
use chrono::Utc;
use serde_json::Value;

/// Result of a transition
#[derive(Debug, Default)]
pub struct TransitionResult {
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}

/// Pure transition function
pub fn transition(snapshot: &Snapshot, config: &ReactorConfig, event: Event) -> TransitionResult {
    match event {
        // Summary turns never become visible conversation messages
        Event::MessageArrived(msg) => {
            if msg.is_summary() {
                TransitionResult::none()
            } else {
                TransitionResult::none().with_effect(Effect::AppendMessage(msg))
            }
        }

        Event::MessageUpdated(msg) if msg.is_summary() => title_update(snapshot, config, &msg),
        Event::MessageUpdated(msg) => message_update(snapshot, config, msg),

        Event::ModelReady(model) => model_ready(model),
        Event::ModelLoadFailed(failure) => model_load_failed(failure),

        Event::ModelStopped => TransitionResult::none().with_effect(Effect::ScheduleModelStopSettle {
            model_id: snapshot.active_model_id(),
            delay: config.model_stop_delay,
        }),

        Event::ModelStopSettled { model_id } => {
            let current = snapshot.active_model_id();
            // A different model came up while the stop was settling; leave it alone
            if current.is_some() && current != model_id {
                return TransitionResult::none();
            }
            TransitionResult::none()
                .with_effect(Effect::SetActiveModel(None))
                .with_effect(Effect::SetModelLoadStatus(ModelLoadStatus::Idle { model: None }))
        }
    }
}

/// Apply a completed summary as the thread title
fn title_update(snapshot: &Snapshot, config: &ReactorConfig, msg: &ThreadMessage) -> TransitionResult {
    // Still streaming
    if !msg.status.is_terminal() {
        return TransitionResult::none();
    }
    let Some(mut thread) = snapshot.thread(&msg.thread_id) else {
        return TransitionResult::none();
    };
    if !thread.has_placeholder_title(&config.placeholder_title) {
        return TransitionResult::none();
    }
    let Some(title) = clean_title(msg.text_or_empty(), config.max_title_len) else {
        return TransitionResult::none();
    };

    thread.title = title;
    thread.updated_at = Utc::now();
    TransitionResult::none()
        .with_effect(Effect::UpdateThread(thread.clone()))
        .with_effect(Effect::SaveThread(thread))
}

/// Streaming progress or completion of a visible message
fn message_update(snapshot: &Snapshot, config: &ReactorConfig, msg: ThreadMessage) -> TransitionResult {
    let mut result = TransitionResult::none().with_effect(Effect::UpdateMessage(msg.clone()));

    if !msg.status.is_terminal() {
        // First streamed token: swap the spinner for partial text
        if msg.has_text() {
            result = result
                .with_effect(Effect::clear_waiting(&msg.thread_id))
                .with_effect(Effect::ClearGenerating);
        }
        return result;
    }

    result = result
        .with_effect(Effect::clear_waiting(&msg.thread_id))
        .with_effect(Effect::ClearGenerating);

    let Some(mut thread) = snapshot.thread(&msg.thread_id) else {
        return result;
    };

    if msg.role == Role::Assistant {
        if let Some(text) = msg.text().filter(|t| !t.is_empty()) {
            thread
                .metadata
                .insert(LAST_MESSAGE_KEY.to_string(), Value::String(text.to_string()));
        }
    }
    thread.updated_at = Utc::now();

    result = result
        .with_effect(Effect::UpdateThread(thread.clone()))
        .with_effect(Effect::SaveThread(thread.clone()))
        .with_effect(Effect::PersistMessage(msg.clone()));

    let active_model = snapshot.active_model();
    if !should_generate_title(&thread, active_model.as_ref(), &config.placeholder_title) {
        return result;
    }
    let Some(model) = active_model else {
        return result;
    };

    let history = history_with(snapshot.thread_messages(&thread.id), msg);
    let request = build_title_request(&thread.id, &history, &model, &config.summary_instruction);
    result.with_effect(Effect::ScheduleTitleRequest {
        request,
        delay: config.title_delay,
    })
}

/// The thread's stored messages with `latest` in place of its stored copy
fn history_with(mut history: Vec<ThreadMessage>, latest: ThreadMessage) -> Vec<ThreadMessage> {
    match history.iter_mut().find(|m| m.id == latest.id) {
        Some(slot) => *slot = latest,
        None => history.push(latest),
    }
    history
}

fn model_ready(model: Model) -> TransitionResult {
    let label = if model.name.is_empty() {
        model.id.clone()
    } else {
        model.name.clone()
    };
    let status = ModelLoadStatus::Running {
        model: model.id.clone(),
    };
    TransitionResult::none()
        .with_effect(Effect::SetActiveModel(Some(model)))
        .with_effect(Effect::Notify(Notification::success(
            "Model started",
            format!("{label} has been started."),
        )))
        .with_effect(Effect::SetModelLoadStatus(status))
        .with_effect(Effect::SetLoadError(None))
}

fn model_load_failed(failure: ModelLoadFailure) -> TransitionResult {
    TransitionResult::none()
        .with_effect(Effect::SetModelLoadStatus(ModelLoadStatus::Idle {
            model: Some(failure.model_id),
        }))
        .with_effect(Effect::SetLoadError(Some(failure.error)))
        .with_effect(Effect::ClearQueuedMessage)
}
