//! LLM and embedding gateways for Statecraft.
//!
//! `OpenAiChatClient` and `OpenAiEmbeddingClient` speak the OpenAI-compatible
//! wire protocol, which covers the vast majority of providers. `LlmGateway`
//! wraps any [`statecraft_core::ChatCompleter`] with per-session token
//! accounting, retry with jittered backoff, and the three ask modes the
//! agents use (plain, tool-calling, structured).

pub mod embedding;
pub mod llm;
pub mod openai;

pub use embedding::OpenAiEmbeddingClient;
pub use llm::LlmGateway;
pub use openai::OpenAiChatClient;
