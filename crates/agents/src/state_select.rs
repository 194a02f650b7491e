//! State-select agent — picks the next FSM state.
//!
//! The LLM sees the history window, retrieved feedback exemplars, and the
//! candidate states the machine permits, and must answer with one of the
//! candidate names. An out-of-set answer gets exactly one corrective re-ask;
//! after that the first candidate wins deterministically.

use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use statecraft_core::chatml::ChatMessage;
use statecraft_core::error::ProviderError;
use statecraft_core::fsm::State;
use statecraft_core::memory::Memory;
use statecraft_core::setting::Setting;
use statecraft_feedback::Feedback;
use statecraft_providers::LlmGateway;

use crate::prompts::{render_candidates, render_feedbacks, render_history};

const SYSTEM_PROMPT: &str = "You are a professional state selection agent. \
Your task is to analyze the conversation history, current context, and \
available feedback to select the most appropriate next state. \
You must consider the scenario of each state and the user's recent actions. \
The recent actions are more important than previous actions.";

#[derive(Debug, Deserialize)]
struct StateChoice {
    state_name: String,
    #[serde(default)]
    #[allow(dead_code)]
    reason: String,
}

fn choice_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "state_name": { "type": "string" },
            "reason": { "type": "string" }
        },
        "required": ["state_name"],
        "additionalProperties": false
    })
}

pub struct StateSelectAgent<'a> {
    llm: &'a LlmGateway,
}

impl<'a> StateSelectAgent<'a> {
    pub fn new(llm: &'a LlmGateway) -> Self {
        Self { llm }
    }

    /// Pick the next state, or `None` when the machine offers no candidates
    /// (the caller then falls through to the new-state agent).
    pub async fn step(
        &self,
        setting: &Setting,
        memory: &Memory,
        feedbacks: &[Feedback],
    ) -> Result<Option<State>, ProviderError> {
        let current = memory.last_assistant_state();
        let candidates = setting.state_machine.next_candidates(current);
        if candidates.is_empty() {
            return Ok(None);
        }

        let history = render_history(memory.window(setting.chat_model.max_history_len));
        let mut prompt = format!(
            "You are a professional agent following the instruction below:\n\
             {}\n\n\
             Here is the history of steps:\n{}\n\
             Here is the list of candidate states:\n{}\n",
            setting.global_prompt,
            history,
            render_candidates(&candidates),
        );
        if !feedbacks.is_empty() {
            prompt.push_str(&format!(
                "\nYou MUST follow these examples when the last observation is similar:\n{}",
                render_feedbacks(feedbacks)
            ));
        }
        prompt.push_str(
            "\nSelect the proper state for the next action based on the scenarios. \
             Answer with the state_name of one candidate.",
        );

        let messages = vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)];

        let choice: StateChoice = self
            .llm
            .ask_structured(messages.clone(), choice_schema())
            .await?;

        if let Some(state) = candidates.iter().find(|s| s.name == choice.state_name) {
            info!(state = %state.name, "Selected state");
            return Ok(Some((*state).clone()));
        }

        // One corrective re-ask with the allowed set spelled out
        let allowed: Vec<&str> = candidates.iter().map(|s| s.name.as_str()).collect();
        warn!(
            picked = %choice.state_name,
            ?allowed,
            "State outside the candidate set, re-asking once"
        );

        let mut retry_messages = messages;
        retry_messages.push(ChatMessage::assistant(format!(
            r#"{{"state_name": "{}"}}"#,
            choice.state_name
        )));
        retry_messages.push(ChatMessage::user(format!(
            "\"{}\" is not a valid state. state_name must be one of: {}. \
             Answer again with exactly one of those names.",
            choice.state_name,
            allowed.join(", ")
        )));

        let retry: StateChoice = self
            .llm
            .ask_structured(retry_messages, choice_schema())
            .await?;

        if let Some(state) = candidates.iter().find(|s| s.name == retry.state_name) {
            info!(state = %state.name, "Selected state on re-ask");
            return Ok(Some((*state).clone()));
        }

        // Deterministic fallback
        let fallback = candidates[0].clone();
        warn!(
            picked = %retry.state_name,
            fallback = %fallback.name,
            "Second invalid state, falling back to the first candidate"
        );
        Ok(Some(fallback))
    }
}
