//! Select-actions agent — asks the LLM, with tools attached, what to do in
//! the current state.
//!
//! Tool calls come back as actions in emission order. A reply with textual
//! content but no tool calls is folded into a single `send_message_to_user`
//! action so the turn can still reach the user.

use serde_json::Value;
use tracing::debug;

use statecraft_core::chatml::ChatMessage;
use statecraft_core::error::ProviderError;
use statecraft_core::fsm::State;
use statecraft_core::memory::{Action, Memory};
use statecraft_core::setting::Setting;
use statecraft_core::tool::ToolSet;
use statecraft_feedback::Feedback;
use statecraft_providers::LlmGateway;

use crate::prompts::{render_feedbacks, render_history};

pub struct SelectActionsAgent<'a> {
    llm: &'a LlmGateway,
}

impl<'a> SelectActionsAgent<'a> {
    pub fn new(llm: &'a LlmGateway) -> Self {
        Self { llm }
    }

    pub async fn step(
        &self,
        setting: &Setting,
        memory: &Memory,
        state: &State,
        tools: &ToolSet,
        feedbacks: &[Feedback],
    ) -> Result<Vec<Action>, ProviderError> {
        let mut system = setting.global_prompt.clone();
        if !state.instruction.is_empty() {
            if !system.is_empty() {
                system.push_str("\n\n");
            }
            system.push_str("Instruction for the next action:\n");
            system.push_str(&state.instruction);
        }

        let history = render_history(memory.window(setting.chat_model.max_history_len));
        let mut user = format!(
            "Consider the history of steps and select the next action; you \
             MUST select at least one action.\n\n\
             History of steps:\n{history}"
        );
        if !feedbacks.is_empty() {
            user.push_str(&format!(
                "\nYou MUST follow these examples and give SIMILAR arguments \
                 when the observation matches:\n{}",
                render_feedbacks(feedbacks)
            ));
        }

        let messages = vec![ChatMessage::system(system), ChatMessage::user(user)];
        let completion = self
            .llm
            .ask_with_tools(messages, tools.definitions())
            .await?;

        let mut actions: Vec<Action> = completion
            .tool_calls
            .into_iter()
            .map(|call| {
                let arguments = match call.arguments {
                    Value::Object(map) => map,
                    _ => serde_json::Map::new(),
                };
                Action {
                    name: call.name,
                    arguments,
                    tool_call_id: call.id,
                }
            })
            .collect();

        // Text but no tool calls: treat the text as the reply itself
        if actions.is_empty() {
            if let Some(content) = completion.content.filter(|c| !c.is_empty()) {
                debug!("Model answered with plain text, folding into a reply action");
                actions.push(Action::send_message(content));
            }
        }

        debug!(state = %state.name, count = actions.len(), "Selected actions");
        Ok(actions)
    }
}
