//! The per-turn chat loop.
//!
//! One call = one conversational turn: append the user's input, retrieve
//! feedback, then alternate state selection and action selection until a
//! reply reaches the user or the LLM call budget runs out. The orchestrator
//! is the only component that mutates memory.
//!
//! Everything the turn needs — the completer, the feedback store, the tool
//! set — is passed in per call. The only process-wide collaborator is the
//! token ledger, and it is strictly keyed: the session id minted here is
//! both where the gateway records and where the totals are read back.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use statecraft_core::chatml::{ChatRole, UserInput};
use statecraft_core::memory::{Action, ExecState, Memory, Step, StepResult};
use statecraft_core::provider::ChatCompleter;
use statecraft_core::setting::Setting;
use statecraft_core::tool::{ToolSet, SEND_MESSAGE_TOOL};
use statecraft_feedback::{Feedback, FeedbackStore};
use statecraft_providers::LlmGateway;
use statecraft_stats::TokenLedger;
use statecraft_tools::ActionExecutor;

use crate::new_state::NewStateAgent;
use crate::select_actions::SelectActionsAgent;
use crate::state_select::StateSelectAgent;

/// Default ceiling on LLM calls per turn.
pub const DEFAULT_BUDGET: u64 = 8;

const BUDGET_APOLOGY: &str =
    "I wasn't able to finish that request. Could you rephrase or try again?";

const ERROR_REPLY: &str =
    "Something went wrong while handling your request. Please try again.";

/// How the turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultType {
    Success,
    BudgetExceeded,
    Error,
}

/// Inputs for one turn.
#[derive(Debug, Clone, Deserialize)]
pub struct TurnRequest {
    pub user_message: UserInput,

    /// Rewrites the most recent reply before anything else happens.
    #[serde(default)]
    pub edited_last_response: Option<String>,

    /// Drops the trailing user turn and its replies first.
    #[serde(default)]
    pub recall_last_user_message: bool,

    pub setting: Setting,

    #[serde(default)]
    pub memory: Memory,
}

/// What a turn returns to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct ChatOutcome {
    pub memory: Memory,

    /// The user-visible reply (content of the final send-message step).
    pub response: String,

    pub result_type: ResultType,

    pub llm_calls: u64,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
}

pub struct Orchestrator {
    ledger: Arc<TokenLedger>,
    budget: u64,
}

impl Orchestrator {
    pub fn new(ledger: Arc<TokenLedger>) -> Self {
        Self {
            ledger,
            budget: DEFAULT_BUDGET,
        }
    }

    pub fn with_budget(mut self, budget: u64) -> Self {
        self.budget = budget.max(1);
        self
    }

    /// Run one turn. The completer and feedback store are per-turn
    /// dependencies built from the request's setting.
    pub async fn run_turn(
        &self,
        completer: Arc<dyn ChatCompleter>,
        feedback: Option<&FeedbackStore>,
        request: TurnRequest,
        tools: &ToolSet,
    ) -> ChatOutcome {
        let TurnRequest {
            user_message,
            edited_last_response,
            recall_last_user_message,
            setting,
            mut memory,
        } = request;

        // Preconditions: recall first, then edit
        if recall_last_user_message {
            memory.recall_last_user_turn();
        }
        if let Some(text) = edited_last_response.as_deref() {
            memory.edit_last_response(text);
        }

        // Normalize the input and append it
        for message in user_message.normalize() {
            match message.role {
                ChatRole::Assistant => {
                    let action = Action::send_message(message.content.clone());
                    memory.push(Step::assistant(
                        action,
                        StepResult::success(message.content),
                    ));
                }
                ChatRole::User | ChatRole::System => {
                    memory.push(Step::user(message.content));
                }
            }
        }

        // One session id for the whole turn: the gateway records under it
        // and the totals below are read under it.
        let session_id = format!("{}:{}", setting.agent_name, memory.id);
        self.ledger.reset(&session_id);
        let llm = LlmGateway::new(
            completer,
            Arc::clone(&self.ledger),
            session_id.as_str(),
            &setting.chat_model,
        );

        info!(agent = %setting.agent_name, session = %session_id, "Starting turn");

        let feedbacks = self.retrieve_feedbacks(feedback, &setting, &memory).await;

        let state_select = StateSelectAgent::new(&llm);
        let new_state = NewStateAgent::new(&llm);
        let select_actions = SelectActionsAgent::new(&llm);
        let executor = ActionExecutor::new();

        let mut terminated = false;
        let mut turn_error: Option<statecraft_core::error::ProviderError> = None;

        while self.ledger.usage(&session_id).call_count < self.budget {
            let state = if setting.state_machine.is_empty() {
                new_state.step(&setting, &memory).await
            } else {
                match state_select.step(&setting, &memory, &feedbacks).await {
                    Ok(Some(state)) => Ok(state),
                    // Machine configured but no candidates reachable
                    Ok(None) => new_state.step(&setting, &memory).await,
                    Err(e) => Err(e),
                }
            };
            let state = match state {
                Ok(state) => state,
                Err(e) => {
                    turn_error = Some(e);
                    break;
                }
            };

            let actions = match select_actions
                .step(&setting, &memory, &state, tools, &feedbacks)
                .await
            {
                Ok(actions) => actions,
                Err(e) => {
                    turn_error = Some(e);
                    break;
                }
            };

            // A reply ends the turn; actions emitted after it never run
            let cut = actions
                .iter()
                .position(|a| a.name == SEND_MESSAGE_TOOL)
                .map_or(actions.len(), |i| i + 1);
            let batch: Vec<Action> = actions.into_iter().take(cut).collect();

            let steps = executor.execute_batch(batch, tools).await;
            for mut step in steps {
                step.state_name = state.name.clone();
                let is_reply = step.sent_message().is_some();
                memory.push(step);
                if is_reply {
                    terminated = true;
                }
            }
            if terminated {
                break;
            }
        }

        let result_type = if let Some(error) = turn_error {
            warn!(error = %error, "Turn aborted on provider error");
            let action = Action::send_message(ERROR_REPLY);
            memory.push(Step::assistant(
                action,
                StepResult {
                    content: ERROR_REPLY.to_string(),
                    error: Some(error.to_string()),
                    exec_state: ExecState::Success,
                },
            ));
            ResultType::Error
        } else if terminated {
            ResultType::Success
        } else {
            warn!(budget = self.budget, "LLM call budget exhausted");
            let step = executor
                .execute(Action::send_message(BUDGET_APOLOGY), tools)
                .await;
            memory.push(step);
            ResultType::BudgetExceeded
        };

        memory.collapse_duplicate_replies();

        let usage = self.ledger.usage(&session_id);
        let response = memory
            .steps
            .iter()
            .rev()
            .find_map(Step::sent_message)
            .unwrap_or_default()
            .to_string();

        info!(
            ?result_type,
            llm_calls = usage.call_count,
            "Turn finished"
        );

        ChatOutcome {
            memory,
            response,
            result_type,
            llm_calls: usage.call_count,
            total_input_tokens: usage.total_input_tokens,
            total_output_tokens: usage.total_output_tokens,
        }
    }

    async fn retrieve_feedbacks(
        &self,
        feedback: Option<&FeedbackStore>,
        setting: &Setting,
        memory: &Memory,
    ) -> Vec<Feedback> {
        let Some(store) = feedback else {
            return Vec::new();
        };
        if !setting.feedback_enabled() {
            return Vec::new();
        }
        let query = memory.last_user_content().unwrap_or_default();

        match store
            .retrieve(&setting.agent_name, query, setting.top_k, &[])
            .await
        {
            Ok(feedbacks) => {
                if !feedbacks.is_empty() {
                    info!(count = feedbacks.len(), "Retrieved feedback exemplars");
                }
                feedbacks
            }
            Err(e) => {
                // Retrieval is best-effort; the turn continues without it
                warn!(error = %e, "Feedback retrieval failed");
                Vec::new()
            }
        }
    }
}
