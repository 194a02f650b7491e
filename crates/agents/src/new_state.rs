//! New-state agent — synthesizes a transient state when no FSM is
//! configured. The state lives only for the current turn; it is never added
//! to the caller's machine.

use serde::Deserialize;
use serde_json::json;
use tracing::info;

use statecraft_core::chatml::ChatMessage;
use statecraft_core::error::ProviderError;
use statecraft_core::fsm::State;
use statecraft_core::memory::Memory;
use statecraft_core::setting::Setting;
use statecraft_providers::LlmGateway;

use crate::prompts::render_history;

const SYSTEM_PROMPT: &str = "You are a professional state creation agent. \
Your task is to analyze the conversation history and generate appropriate \
instructions for the next action when no predefined state machine exists. \
Focus on understanding the user's intent and providing clear, actionable \
guidance for the assistant's next response. \
The recent actions are more important than previous actions.";

#[derive(Debug, Deserialize)]
struct NewState {
    #[serde(default)]
    name: String,
    #[serde(default)]
    scenario: String,
    instruction: String,
}

fn state_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "name": { "type": "string", "description": "a short label for the state" },
            "scenario": { "type": "string" },
            "instruction": { "type": "string" }
        },
        "required": ["instruction"],
        "additionalProperties": false
    })
}

pub struct NewStateAgent<'a> {
    llm: &'a LlmGateway,
}

impl<'a> NewStateAgent<'a> {
    pub fn new(llm: &'a LlmGateway) -> Self {
        Self { llm }
    }

    pub async fn step(&self, setting: &Setting, memory: &Memory) -> Result<State, ProviderError> {
        let history = render_history(memory.window(setting.chat_model.max_history_len));
        let prompt = format!(
            "You are a professional agent following the instruction below:\n\
             {}\n\n\
             History of steps:\n{}\n\
             Generate the assistant's instruction for the next action. Provide \
             clear, specific guidance that will help the assistant respond \
             appropriately to the user's needs.",
            setting.global_prompt, history,
        );

        let messages = vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)];
        let generated: NewState = self.llm.ask_structured(messages, state_schema()).await?;

        info!(name = %generated.name, "Synthesized transient state");
        Ok(State::transient(
            generated.name,
            generated.scenario,
            generated.instruction,
        ))
    }
}
