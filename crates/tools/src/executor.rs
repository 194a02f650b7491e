//! Action executor — runs selected actions and records their outcomes.
//!
//! Stateless across turns. A batch emitted in one LLM response may fan out
//! concurrently, but the resulting steps are gathered back in emission
//! order, so memory stays causal.

use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, warn};

use statecraft_core::memory::{Action, Step, StepResult};
use statecraft_core::tool::ToolSet;

#[derive(Default)]
pub struct ActionExecutor;

impl ActionExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Execute one action against the tool set and produce its step.
    pub async fn execute(&self, action: Action, tools: &ToolSet) -> Step {
        let Some(tool) = tools.get(&action.name) else {
            warn!(action = %action.name, "No tool registered under that name");
            return Step::assistant(action, StepResult::skipped("unknown tool"));
        };

        debug!(action = %action.name, "Executing action");
        let arguments = Value::Object(action.arguments.clone());

        let result = match tool.execute(arguments).await {
            Ok(outcome) => match outcome.error {
                None => StepResult::success(outcome.content),
                Some(error) => StepResult::failed(outcome.content, error),
            },
            Err(e) => StepResult::failed(String::new(), e.to_string()),
        };

        Step::assistant(action, result)
    }

    /// Execute a batch concurrently; steps come back in emission order.
    pub async fn execute_batch(&self, actions: Vec<Action>, tools: &ToolSet) -> Vec<Step> {
        join_all(
            actions
                .into_iter()
                .map(|action| self.execute(action, tools)),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use statecraft_core::error::ToolError;
    use statecraft_core::memory::ExecState;
    use statecraft_core::tool::{Tool, ToolOutcome};
    use std::sync::Arc;
    use std::time::Duration;

    struct SlowEcho {
        name: String,
        delay_ms: u64,
    }

    #[async_trait]
    impl Tool for SlowEcho {
        fn name(&self) -> &str {
            &self.name
        }
        fn description(&self) -> &str {
            "echoes after a delay"
        }
        fn parameters_schema(&self) -> Value {
            json!({"type": "object"})
        }
        async fn execute(&self, arguments: Value) -> Result<ToolOutcome, ToolError> {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            Ok(ToolOutcome::ok(
                arguments["text"].as_str().unwrap_or("").to_string(),
            ))
        }
    }

    struct AlwaysFails;

    #[async_trait]
    impl Tool for AlwaysFails {
        fn name(&self) -> &str {
            "broken"
        }
        fn description(&self) -> &str {
            "always fails"
        }
        fn parameters_schema(&self) -> Value {
            json!({"type": "object"})
        }
        async fn execute(&self, _arguments: Value) -> Result<ToolOutcome, ToolError> {
            Err(ToolError::ExecutionFailed {
                tool_name: "broken".into(),
                reason: "boom".into(),
            })
        }
    }

    fn action(name: &str, text: &str) -> Action {
        let mut arguments = serde_json::Map::new();
        arguments.insert("text".into(), json!(text));
        Action::new(name, arguments)
    }

    #[tokio::test]
    async fn unknown_action_is_skipped() {
        let tools = ToolSet::new();
        let step = ActionExecutor::new()
            .execute(action("ghost", "x"), &tools)
            .await;
        assert_eq!(step.result.exec_state, ExecState::Skipped);
        assert_eq!(step.result.error.as_deref(), Some("unknown tool"));
        assert_eq!(step.action.as_ref().unwrap().name, "ghost");
    }

    #[tokio::test]
    async fn tool_errors_become_failed_steps() {
        let mut tools = ToolSet::new();
        tools.register(Arc::new(AlwaysFails)).unwrap();

        let step = ActionExecutor::new()
            .execute(action("broken", "x"), &tools)
            .await;
        assert_eq!(step.result.exec_state, ExecState::Failed);
        assert!(step.result.error.as_deref().unwrap().contains("boom"));
    }

    #[tokio::test]
    async fn batch_preserves_emission_order_despite_timing() {
        let mut tools = ToolSet::new();
        tools
            .register(Arc::new(SlowEcho {
                name: "slow".into(),
                delay_ms: 40,
            }))
            .unwrap();
        tools
            .register(Arc::new(SlowEcho {
                name: "fast".into(),
                delay_ms: 0,
            }))
            .unwrap();

        let steps = ActionExecutor::new()
            .execute_batch(
                vec![action("slow", "first"), action("fast", "second")],
                &tools,
            )
            .await;

        // The slow action finished later but still comes first
        assert_eq!(steps[0].result.content, "first");
        assert_eq!(steps[1].result.content, "second");
        assert!(steps
            .iter()
            .all(|s| s.result.exec_state == ExecState::Success));
    }
}
