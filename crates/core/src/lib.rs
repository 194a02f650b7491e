//! # Statecraft Core
//!
//! Domain types, traits, and error definitions for the Statecraft agent
//! runtime. This crate has **zero framework dependencies** — it defines the
//! domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is defined as a trait here. Implementations
//! live in their respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod chatml;
pub mod error;
pub mod fsm;
pub mod memory;
pub mod provider;
pub mod setting;
pub mod store;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use chatml::{ChatMessage, ChatRole, UserInput};
pub use error::{Error, ProviderError, Result, ToolError, VectorStoreError};
pub use fsm::{State, StateMachine};
pub use memory::{Action, ExecState, Memory, Role, Step, StepResult};
pub use provider::{ChatCompleter, Completion, CompletionRequest, Embedder, TokenUsage};
pub use setting::{ChatModelConfig, EmbeddingModelConfig, Setting};
pub use store::{StoredObject, VectorIndex};
pub use tool::{Tool, ToolCall, ToolDefinition, ToolOutcome, ToolSet, SEND_MESSAGE_TOOL};
