//! Provider traits — the abstractions over LLM and embedding backends.
//!
//! A `ChatCompleter` knows how to send one chat-completion request and get a
//! response back. An `Embedder` turns texts into fixed-dimension vectors.
//! The agent loop calls both through trait objects without knowing which
//! backend is in use — pure polymorphism, and the seam every test stubs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::chatml::ChatMessage;
use crate::error::ProviderError;
use crate::tool::{ToolCall, ToolDefinition};

/// One chat-completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,

    /// Tools the model may call; empty for plain completions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,

    pub temperature: f32,

    pub top_p: f32,

    /// Always a positive value; the gateway fills in the default.
    pub max_completion_tokens: u32,

    /// JSON schema the output must conform to, for structured asks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<Value>,
}

/// Token usage reported by the provider for one call.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// One assistant response: textual content and/or tool calls.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Completion {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

impl Completion {
    /// A text-only completion, as scripted in tests.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }
}

/// The chat-completion backend.
#[async_trait]
pub trait ChatCompleter: Send + Sync {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<Completion, ProviderError>;
}

/// The embedding backend.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Declared output dimension; every returned vector has this length.
    fn dimension(&self) -> usize;

    /// Embed a batch of texts; the result has one vector per input.
    async fn embed(
        &self,
        inputs: &[String],
    ) -> std::result::Result<Vec<Vec<f32>>, ProviderError>;
}
