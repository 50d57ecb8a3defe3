//! Thread reactor
//!
//! Bridges inference-engine lifecycle events with the conversation state
//! store: it mirrors streamed replies into threads, keeps the waiting and
//! generating indicators honest, tracks the active model, and names new
//! threads by asking the model for a short summary.

pub mod bus;
pub mod config;
pub mod conversation;
pub mod db;
pub mod engine;
pub mod runtime;
pub mod state_machine;
pub mod store;
pub mod title_generator;
