//! Prompt rendering helpers shared by the selection agents.
//!
//! History, candidate states, and feedback exemplars are rendered to plain
//! indented text. The LLM reads these blocks inside the user prompt; keep
//! the field names stable, tests and stored feedbacks rely on them.

use statecraft_core::fsm::State;
use statecraft_core::memory::{Role, Step};
use statecraft_feedback::Feedback;

/// Render the trailing history window, one block per step.
pub fn render_history(steps: &[Step]) -> String {
    let mut out = String::new();
    for (i, step) in steps.iter().enumerate() {
        out.push_str(&format!("Step.{i}:\n"));
        match step.role {
            Role::User => {
                out.push_str("  role: user\n");
                out.push_str(&format!("  message: {}\n", step.result.content));
            }
            Role::Assistant => {
                out.push_str("  role: assistant\n");
                if let Some(action) = &step.action {
                    out.push_str(&format!("  action: {}\n", action.name));
                    if !action.arguments.is_empty() {
                        let rendered = serde_json::Value::Object(action.arguments.clone());
                        out.push_str(&format!("  arguments: {rendered}\n"));
                    }
                }
                if !step.state_name.is_empty() {
                    out.push_str(&format!("  state: {}\n", step.state_name));
                }
                if let Some(error) = &step.result.error {
                    out.push_str(&format!("  error: {error}\n"));
                }
                if !step.result.content.is_empty() {
                    out.push_str(&format!("  result: {}\n", step.result.content));
                }
            }
        }
    }
    out
}

/// Render candidate states as a named list with scenarios.
pub fn render_candidates(candidates: &[&State]) -> String {
    let mut out = String::new();
    for state in candidates {
        out.push_str(&format!("- name: {}\n", state.name));
        if !state.scenario.is_empty() {
            out.push_str(&format!("  scenario: {}\n", state.scenario));
        }
        if !state.instruction.is_empty() {
            out.push_str(&format!("  instruction: {}\n", state.instruction));
        }
    }
    out
}

/// Render feedback exemplars as observation/action pairs.
pub fn render_feedbacks(feedbacks: &[Feedback]) -> String {
    let mut out = String::new();
    for (i, feedback) in feedbacks.iter().enumerate() {
        out.push_str(&format!("Example.{i}:\n"));
        out.push_str(&format!(
            "  observation: {}: {}\n",
            feedback.observation.name, feedback.observation.content
        ));
        out.push_str(&format!(
            "  action: {}: {}\n",
            feedback.action.name, feedback.action.content
        ));
        if !feedback.state_name.is_empty() {
            out.push_str(&format!("  state: {}\n", feedback.state_name));
        }
    }
    out
}
