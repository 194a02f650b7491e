//! The agent layer: state selection, action selection, and the per-turn
//! chat orchestrator.
//!
//! Everything here is constructed fresh for each turn. Per-turn dependency
//! injection keeps one caller's LLM configuration from leaking into a
//! concurrent turn; nothing in this crate caches clients across turns.

pub mod new_state;
pub mod orchestrator;
pub mod prompts;
pub mod select_actions;
pub mod state_select;

pub use new_state::NewStateAgent;
pub use orchestrator::{ChatOutcome, Orchestrator, ResultType, TurnRequest, DEFAULT_BUDGET};
pub use select_actions::SelectActionsAgent;
pub use state_select::StateSelectAgent;
