//! Thread-safe token accounting — tracks per-session input/output token
//! totals and LLM call counts.
//!
//! The ledger is process-wide but strictly keyed: the orchestrator creates
//! one session id per turn, hands it to the LLM gateway at construction, and
//! reads the totals back under the same id when the turn ends. Recording and
//! reading under different keys was the classic accounting bug this design
//! rules out.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

/// Running totals for one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUsage {
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub call_count: u64,
}

impl SessionUsage {
    pub fn total_tokens(&self) -> u64 {
        self.total_input_tokens + self.total_output_tokens
    }
}

/// The process-wide token ledger. Thread-safe via `RwLock`.
#[derive(Default)]
pub struct TokenLedger {
    sessions: RwLock<HashMap<String, SessionUsage>>,
}

impl TokenLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one LLM call under `session_id`.
    pub fn add(&self, session_id: &str, input_tokens: u64, output_tokens: u64) {
        let mut sessions = self.sessions.write().unwrap();
        let usage = sessions.entry(session_id.to_string()).or_default();
        usage.total_input_tokens += input_tokens;
        usage.total_output_tokens += output_tokens;
        usage.call_count += 1;
    }

    /// The totals recorded under `session_id` so far; zeroes for an unknown
    /// session.
    pub fn usage(&self, session_id: &str) -> SessionUsage {
        self.sessions
            .read()
            .unwrap()
            .get(session_id)
            .copied()
            .unwrap_or_default()
    }

    /// Zero out a session. Called at turn start so totals are per-turn.
    pub fn reset(&self, session_id: &str) {
        self.sessions.write().unwrap().remove(session_id);
    }

    /// Number of sessions with recorded usage.
    pub fn session_count(&self) -> usize {
        self.sessions.read().unwrap().len()
    }
}
