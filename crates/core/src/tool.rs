//! Tool trait — the abstraction over agent capabilities.
//!
//! Tools are what let the assistant act: reply to the user or call out to
//! caller-supplied HTTP endpoints. Tools are collected in a `ToolSet` and
//! attached to the action-selection LLM call.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::error::{Error, Result, ToolError};

/// Name of the built-in reply tool. A successful call terminates the turn.
pub const SEND_MESSAGE_TOOL: &str = "send_message_to_user";

/// A tool definition sent to the LLM so it knows what it can call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,

    pub description: String,

    /// JSON Schema describing the tool's parameters.
    pub parameters: Value,
}

/// A tool invocation requested by the LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// The provider's tool_call id.
    pub id: String,

    pub name: String,

    /// Arguments as a JSON value; `{}` when the model omitted them.
    pub arguments: Value,
}

/// What a tool produced. `error` set means the execution failed but the
/// conversation may continue.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolOutcome {
    pub content: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolOutcome {
    pub fn ok(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            error: None,
        }
    }

    pub fn err(content: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            error: Some(error.into()),
        }
    }
}

/// The core Tool trait.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool.
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> Value;

    /// Execute the tool with the given arguments.
    async fn execute(&self, arguments: Value) -> std::result::Result<ToolOutcome, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the LLM.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// The tools available in one turn, in registration order.
///
/// Registration rejects duplicate names: the LLM addresses tools by name and
/// a collision would make dispatch ambiguous.
#[derive(Default)]
pub struct ToolSet {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool; fails on a duplicate name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        if self.get(tool.name()).is_some() {
            return Err(Error::config(format!(
                "duplicate tool name: {}",
                tool.name()
            )));
        }
        self.tools.push(tool);
        Ok(())
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    /// All tool definitions, for sending to the LLM.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.to_definition()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// A simple test tool for unit tests.
    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes back the input"
        }
        fn parameters_schema(&self) -> Value {
            json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string" }
                },
                "required": ["text"]
            })
        }
        async fn execute(&self, arguments: Value) -> std::result::Result<ToolOutcome, ToolError> {
            let text = arguments["text"].as_str().unwrap_or("").to_string();
            Ok(ToolOutcome::ok(text))
        }
    }

    #[test]
    fn register_and_lookup() {
        let mut tools = ToolSet::new();
        tools.register(Arc::new(EchoTool)).unwrap();
        assert!(tools.get("echo").is_some());
        assert!(tools.get("nonexistent").is_none());
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut tools = ToolSet::new();
        tools.register(Arc::new(EchoTool)).unwrap();
        let err = tools.register(Arc::new(EchoTool)).unwrap_err();
        assert!(err.to_string().contains("duplicate tool name"));
    }

    #[test]
    fn definitions_keep_registration_order() {
        let mut tools = ToolSet::new();
        tools.register(Arc::new(EchoTool)).unwrap();
        let defs = tools.definitions();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "echo");
        assert_eq!(defs[0].parameters["required"], json!(["text"]));
    }

    #[tokio::test]
    async fn execute_through_the_set() {
        let mut tools = ToolSet::new();
        tools.register(Arc::new(EchoTool)).unwrap();
        let outcome = tools
            .get("echo")
            .unwrap()
            .execute(json!({"text": "hello"}))
            .await
            .unwrap();
        assert_eq!(outcome.content, "hello");
        assert!(outcome.error.is_none());
    }
}
