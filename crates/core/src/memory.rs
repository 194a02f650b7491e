//! Conversation memory: an ordered sequence of steps.
//!
//! A `Step` is either a user utterance or one assistant action together with
//! its execution result. The caller owns the `Memory` across turns; only the
//! chat orchestrator mutates it, and only within a single turn.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::tool::SEND_MESSAGE_TOOL;

/// Who produced a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Lifecycle of an action's execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecState {
    Pending,
    Running,
    Success,
    Failed,
    Skipped,
}

/// The action an assistant step selected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Tool name the LLM asked for.
    pub name: String,

    /// Arguments as a JSON object.
    #[serde(default)]
    pub arguments: Map<String, Value>,

    /// The provider's tool_call id, echoed back for traceability.
    #[serde(default)]
    pub tool_call_id: String,
}

impl Action {
    pub fn new(name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            arguments,
            tool_call_id: String::new(),
        }
    }

    /// A `send_message_to_user` action carrying `text`.
    pub fn send_message(text: impl Into<String>) -> Self {
        let mut arguments = Map::new();
        arguments.insert("agent_message".into(), Value::String(text.into()));
        Self::new(SEND_MESSAGE_TOOL, arguments)
    }

    /// The `agent_message` argument, when present.
    pub fn agent_message(&self) -> Option<&str> {
        self.arguments.get("agent_message").and_then(Value::as_str)
    }
}

/// Outcome of executing a step's action (or, for user steps, the utterance).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    #[serde(default)]
    pub content: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub exec_state: ExecState,
}

impl StepResult {
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            error: None,
            exec_state: ExecState::Success,
        }
    }

    pub fn failed(content: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            error: Some(error.into()),
            exec_state: ExecState::Failed,
        }
    }

    pub fn skipped(error: impl Into<String>) -> Self {
        Self {
            content: String::new(),
            error: Some(error.into()),
            exec_state: ExecState::Skipped,
        }
    }
}

/// One element of conversation memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub role: Role,

    /// The selected action; absent for user steps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,

    pub result: StepResult,

    /// FSM state at which this step was produced (may be empty).
    #[serde(default)]
    pub state_name: String,

    /// Monotonic ordinal assigned on insertion.
    #[serde(default)]
    pub created_at: u64,
}

impl Step {
    /// A user utterance.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            action: None,
            result: StepResult::success(content),
            state_name: String::new(),
            created_at: 0,
        }
    }

    /// An assistant step from an action plus its outcome.
    pub fn assistant(action: Action, result: StepResult) -> Self {
        Self {
            role: Role::Assistant,
            action: Some(action),
            result,
            state_name: String::new(),
            created_at: 0,
        }
    }

    /// Whether this step is an assistant `send_message_to_user`.
    pub fn is_send_message(&self) -> bool {
        self.role == Role::Assistant
            && self
                .action
                .as_ref()
                .is_some_and(|a| a.name == SEND_MESSAGE_TOOL)
    }

    /// The message shown to the user, for successful send-message steps.
    pub fn sent_message(&self) -> Option<&str> {
        if self.is_send_message() && self.result.exec_state == ExecState::Success {
            Some(self.result.content.as_str())
        } else {
            None
        }
    }
}

fn fresh_id() -> String {
    Uuid::new_v4().to_string()
}

/// Ordered conversation memory. Insertion order is conversation order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    /// Stable identity, used to key per-turn token sessions.
    #[serde(default = "fresh_id")]
    pub id: String,

    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl Memory {
    pub fn new() -> Self {
        Self {
            id: fresh_id(),
            steps: Vec::new(),
        }
    }

    fn next_ordinal(&self) -> u64 {
        self.steps.last().map_or(0, |s| s.created_at + 1)
    }

    /// Append a step, stamping its ordinal.
    pub fn push(&mut self, mut step: Step) {
        step.created_at = self.next_ordinal();
        self.steps.push(step);
    }

    /// The state name of the most recent assistant step, or empty.
    pub fn last_assistant_state(&self) -> &str {
        self.steps
            .iter()
            .rev()
            .find(|s| s.role == Role::Assistant)
            .map_or("", |s| s.state_name.as_str())
    }

    /// Content of the most recent user step, if any.
    pub fn last_user_content(&self) -> Option<&str> {
        self.steps
            .iter()
            .rev()
            .find(|s| s.role == Role::User)
            .map(|s| s.result.content.as_str())
    }

    /// Drop the trailing user step and every assistant step after it.
    pub fn recall_last_user_turn(&mut self) {
        if let Some(idx) = self.steps.iter().rposition(|s| s.role == Role::User) {
            self.steps.truncate(idx);
        }
    }

    /// Overwrite the content of the most recent send-message step.
    pub fn edit_last_response(&mut self, text: &str) {
        if let Some(step) = self.steps.iter_mut().rev().find(|s| s.is_send_message()) {
            step.result.content = text.to_string();
            if let Some(action) = step.action.as_mut() {
                action
                    .arguments
                    .insert("agent_message".into(), Value::String(text.to_string()));
            }
        }
    }

    /// Collapse runs of consecutive send-message steps with identical
    /// content, keeping only the last occurrence of each run.
    pub fn collapse_duplicate_replies(&mut self) {
        let mut keep = vec![true; self.steps.len()];
        for i in 0..self.steps.len().saturating_sub(1) {
            let (a, b) = (&self.steps[i], &self.steps[i + 1]);
            if a.is_send_message()
                && b.is_send_message()
                && a.result.content == b.result.content
            {
                keep[i] = false;
            }
        }
        let mut iter = keep.into_iter();
        self.steps.retain(|_| iter.next().unwrap_or(true));
    }

    /// The trailing window of at most `max_len` steps.
    pub fn window(&self, max_len: usize) -> &[Step] {
        let start = self.steps.len().saturating_sub(max_len);
        &self.steps[start..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(text: &str) -> Step {
        Step::assistant(Action::send_message(text), StepResult::success(text))
    }

    #[test]
    fn push_assigns_monotonic_ordinals() {
        let mut memory = Memory::new();
        memory.push(Step::user("hi"));
        memory.push(reply("hello"));
        memory.push(Step::user("bye"));
        let ordinals: Vec<u64> = memory.steps.iter().map(|s| s.created_at).collect();
        assert_eq!(ordinals, vec![0, 1, 2]);
    }

    #[test]
    fn last_assistant_state_skips_user_steps() {
        let mut memory = Memory::new();
        assert_eq!(memory.last_assistant_state(), "");

        let mut step = reply("hello");
        step.state_name = "greet".into();
        memory.push(step);
        memory.push(Step::user("next"));
        assert_eq!(memory.last_assistant_state(), "greet");
    }

    #[test]
    fn recall_drops_trailing_user_turn() {
        let mut memory = Memory::new();
        memory.push(Step::user("first"));
        memory.push(reply("one"));
        memory.push(Step::user("second"));
        memory.push(reply("two"));
        memory.push(reply("three"));

        memory.recall_last_user_turn();
        assert_eq!(memory.steps.len(), 2);
        assert_eq!(memory.steps[1].result.content, "one");
    }

    #[test]
    fn edit_rewrites_last_reply_and_arguments() {
        let mut memory = Memory::new();
        memory.push(reply("draft"));
        memory.push(Step::user("edit that"));

        memory.edit_last_response("final");
        let step = &memory.steps[0];
        assert_eq!(step.result.content, "final");
        assert_eq!(step.action.as_ref().unwrap().agent_message(), Some("final"));
    }

    #[test]
    fn collapse_keeps_last_of_identical_run() {
        let mut memory = Memory::new();
        memory.push(reply("hi"));
        memory.push(reply("hi"));
        memory.push(reply("hi"));
        memory.push(reply("bye"));

        memory.collapse_duplicate_replies();
        let contents: Vec<&str> = memory
            .steps
            .iter()
            .map(|s| s.result.content.as_str())
            .collect();
        assert_eq!(contents, vec!["hi", "bye"]);
        // Ordinals stay non-decreasing after removal
        assert!(memory.steps.windows(2).all(|w| w[0].created_at <= w[1].created_at));
    }

    #[test]
    fn collapse_leaves_distinct_replies_alone() {
        let mut memory = Memory::new();
        memory.push(reply("a"));
        memory.push(Step::user("u"));
        memory.push(reply("a"));
        memory.collapse_duplicate_replies();
        assert_eq!(memory.steps.len(), 3);
    }

    #[test]
    fn window_returns_trailing_steps() {
        let mut memory = Memory::new();
        for i in 0..10 {
            memory.push(Step::user(format!("m{i}")));
        }
        let tail = memory.window(3);
        assert_eq!(tail.len(), 3);
        assert_eq!(tail[0].result.content, "m7");
        assert_eq!(memory.window(100).len(), 10);
    }

    #[test]
    fn deserialized_memory_without_id_gets_one() {
        let memory: Memory = serde_json::from_str(r#"{"steps": []}"#).unwrap();
        assert!(!memory.id.is_empty());
    }

    #[test]
    fn step_serialization_roundtrip() {
        let step = reply("hello");
        let json = serde_json::to_string(&step).unwrap();
        let back: Step = serde_json::from_str(&json).unwrap();
        assert_eq!(back, step);
        assert!(json.contains("send_message_to_user"));
    }
}
