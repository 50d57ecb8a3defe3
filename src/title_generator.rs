//! Thread title generation from the first completed exchange
//!
//! The reactor asks the active model to summarize the conversation and
//! writes the answer back as the thread title. The request goes out as a
//! `Summary` message so its reply never shows up as a conversation turn.

use crate::conversation::{MessageType, Role, Thread, ThreadMessage};
use crate::engine::{MessageRequest, Model, RequestMessage};

/// Whether a completed turn on `thread` should trigger a title request
pub fn should_generate_title(thread: &Thread, active_model: Option<&Model>, placeholder: &str) -> bool {
    active_model.is_some() && thread.has_placeholder_title(placeholder)
}

/// Build the summarization request for a thread.
///
/// The prompt is the thread's history followed by one user turn carrying
/// `instruction`. Streaming is forced off so the title arrives in one piece.
pub fn build_title_request(
    thread_id: &str,
    history: &[ThreadMessage],
    model: &Model,
    instruction: &str,
) -> MessageRequest {
    let mut messages: Vec<RequestMessage> = history
        .iter()
        .filter(|m| !m.is_summary())
        .map(|m| RequestMessage::new(m.role, m.text_or_empty()))
        .collect();
    messages.push(RequestMessage::new(Role::User, instruction));

    MessageRequest {
        id: uuid::Uuid::new_v4().to_string(),
        thread_id: thread_id.to_string(),
        message_type: MessageType::Summary,
        messages,
        model: model.without_streaming(),
    }
}

/// Turn a model's summary into a usable title
///
/// - Trim surrounding whitespace and quotes
/// - Collapse inner whitespace
/// - Truncate to `max_len` characters, preferring a word boundary
///
/// Returns None when nothing is left.
pub fn clean_title(raw: &str, max_len: usize) -> Option<String> {
    let stripped = raw
        .trim()
        .trim_matches(|c: char| matches!(c, '"' | '\'' | '`' | '“' | '”'))
        .trim();

    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return None;
    }

    if collapsed.chars().count() <= max_len {
        return Some(collapsed);
    }

    let truncated: String = collapsed.chars().take(max_len).collect();
    let cut = match truncated.rfind(' ') {
        Some(last_space) if last_space > 0 => truncated.split_at(last_space).0.to_string(),
        _ => truncated,
    };
    Some(cut)
}
