//! Per-request settings: model coordinates, feedback knobs, the FSM.
//!
//! A `Setting` is immutable for the duration of a turn. Validation happens
//! once at the boundary; everything downstream may assume a valid setting.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::fsm::StateMachine;

/// Chat-completion model coordinates.
#[derive(Clone, Serialize, Deserialize)]
pub struct ChatModelConfig {
    #[serde(default)]
    pub base_url: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default)]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    /// History truncation window, in steps.
    #[serde(default = "default_max_history_len")]
    pub max_history_len: usize,
}

impl Default for ChatModelConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            model: String::new(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            max_history_len: default_max_history_len(),
        }
    }
}

/// Embedding model coordinates.
#[derive(Clone, Serialize, Deserialize)]
pub struct EmbeddingModelConfig {
    #[serde(default)]
    pub base_url: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default)]
    pub model: String,

    #[serde(default = "default_vector_dim")]
    pub vector_dim: usize,
}

impl Default for EmbeddingModelConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            model: String::new(),
            vector_dim: default_vector_dim(),
        }
    }
}

/// Per-request configuration, immutable during the turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Setting {
    /// Non-empty; keys the feedback collection and the token session.
    pub agent_name: String,

    #[serde(default)]
    pub chat_model: ChatModelConfig,

    #[serde(default)]
    pub embedding_model: EmbeddingModelConfig,

    /// Empty string disables feedback retrieval entirely.
    #[serde(default)]
    pub vector_db_url: String,

    /// Feedbacks retrieved per turn.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// System-level instructions prepended to every LLM call.
    #[serde(default)]
    pub global_prompt: String,

    #[serde(default)]
    pub state_machine: StateMachine,
}

impl Setting {
    /// Whether feedback retrieval is active for this request.
    pub fn feedback_enabled(&self) -> bool {
        !self.vector_db_url.is_empty()
    }

    /// Validate everything a turn relies on. Called once at the boundary.
    pub fn validate(&self) -> Result<()> {
        if self.agent_name.trim().is_empty() {
            return Err(Error::config("agent_name must be non-empty"));
        }
        if self.chat_model.api_key.is_empty() {
            return Err(Error::config("chat_model.api_key is required"));
        }
        if self.feedback_enabled() && self.embedding_model.vector_dim == 0 {
            return Err(Error::config("embedding_model.vector_dim must be >= 1"));
        }
        self.state_machine.validate()
    }
}

fn default_temperature() -> f32 {
    0.7
}
fn default_top_p() -> f32 {
    1.0
}
fn default_max_history_len() -> usize {
    128
}
fn default_vector_dim() -> usize {
    1536
}
fn default_top_k() -> usize {
    3
}

fn redact(s: &str) -> &'static str {
    if s.is_empty() {
        "None"
    } else {
        "[REDACTED]"
    }
}

// API keys never reach Debug output.
impl std::fmt::Debug for ChatModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatModelConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("top_p", &self.top_p)
            .field("max_history_len", &self.max_history_len)
            .finish()
    }
}

impl std::fmt::Debug for EmbeddingModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingModelConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("vector_dim", &self.vector_dim)
            .finish()
    }
}
