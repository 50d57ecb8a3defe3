//! Inference-engine facing types: models, load status and outbound requests

use crate::conversation::{MessageType, Role};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Engine parameters attached to a model
///
/// Only `stream` is interpreted here; everything else is carried through
/// untouched to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelParameters {
    #[serde(default = "default_stream")]
    pub stream: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_stream() -> bool {
    true
}

impl Default for ModelParameters {
    fn default() -> Self {
        Self {
            stream: true,
            extra: Map::new(),
        }
    }
}

/// A loaded (or loadable) inference model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub parameters: ModelParameters,
}

impl Model {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            parameters: ModelParameters::default(),
        }
    }

    /// Same model with streaming turned off
    #[must_use]
    pub fn without_streaming(&self) -> Self {
        let mut model = self.clone();
        model.parameters.stream = false;
        model
    }
}

/// Model lifecycle as seen by the rest of the application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ModelLoadStatus {
    /// Nothing running. `model` remembers the last attempted id after a failed load.
    Idle { model: Option<String> },
    Loading { model: String },
    Running { model: String },
}

impl Default for ModelLoadStatus {
    fn default() -> Self {
        ModelLoadStatus::Idle { model: None }
    }
}

impl ModelLoadStatus {
    pub fn model(&self) -> Option<&str> {
        match self {
            ModelLoadStatus::Idle { model } => model.as_deref(),
            ModelLoadStatus::Loading { model } | ModelLoadStatus::Running { model } => Some(model),
        }
    }
}

/// Payload of a failed model load
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelLoadFailure {
    pub error: String,
    pub model_id: String,
}

/// One role/content pair of a prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMessage {
    pub role: Role,
    pub content: String,
}

impl RequestMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Command asking the engine to generate a reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRequest {
    pub id: String,
    pub thread_id: String,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub messages: Vec<RequestMessage>,
    pub model: Model,
}
