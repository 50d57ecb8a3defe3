//! Reactor configuration

use crate::conversation::NEW_THREAD_TITLE;
use std::time::Duration;
use thiserror::Error;

/// Instruction appended to the history when asking the model for a title
pub const SUMMARY_INSTRUCTION: &str =
    "Summarize the conversation above in five words as a title. Reply with the title only.";

const DEFAULT_TITLE_DELAY: Duration = Duration::from_millis(1000);
const DEFAULT_MODEL_STOP_DELAY: Duration = Duration::from_millis(500);
const DEFAULT_MAX_TITLE_LEN: usize = 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?} (expected milliseconds)")]
    InvalidDuration { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactorConfig {
    /// How long a completed turn settles before its title request is published
    pub title_delay: Duration,
    /// How long after a model stops before the active model is cleared
    pub model_stop_delay: Duration,
    /// Title that marks a thread as not yet auto-titled
    pub placeholder_title: String,
    pub summary_instruction: String,
    pub max_title_len: usize,
}

impl Default for ReactorConfig {
    fn default() -> Self {
        Self {
            title_delay: DEFAULT_TITLE_DELAY,
            model_stop_delay: DEFAULT_MODEL_STOP_DELAY,
            placeholder_title: NEW_THREAD_TITLE.to_string(),
            summary_instruction: SUMMARY_INSTRUCTION.to_string(),
            max_title_len: DEFAULT_MAX_TITLE_LEN,
        }
    }
}

impl ReactorConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(delay) = parse_millis(&lookup, "THREAD_REACTOR_TITLE_DELAY_MS")? {
            config.title_delay = delay;
        }
        if let Some(delay) = parse_millis(&lookup, "THREAD_REACTOR_MODEL_STOP_DELAY_MS")? {
            config.model_stop_delay = delay;
        }
        if let Some(instruction) = lookup("THREAD_REACTOR_SUMMARY_INSTRUCTION") {
            if !instruction.trim().is_empty() {
                config.summary_instruction = instruction;
            }
        }
        Ok(config)
    }

    #[must_use]
    pub fn with_delays(mut self, title_delay: Duration, model_stop_delay: Duration) -> Self {
        self.title_delay = title_delay;
        self.model_stop_delay = model_stop_delay;
        self
    }

    /// Upper bound on how long deferred work may still be pending
    pub fn settle_window(&self) -> Duration {
        self.title_delay.max(self.model_stop_delay)
    }
}

fn parse_millis<F>(lookup: &F, var: &'static str) -> Result<Option<Duration>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(value) = lookup(var) else {
        return Ok(None);
    };
    value
        .trim()
        .parse::<u64>()
        .map(|ms| Some(Duration::from_millis(ms)))
        .map_err(|_| ConfigError::InvalidDuration { var, value })
}
