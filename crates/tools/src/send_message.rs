//! The built-in reply tool. A successful call ends the turn: the message is
//! on its way to the user and the runtime waits for their next input.

use async_trait::async_trait;
use serde_json::{json, Value};

use statecraft_core::error::ToolError;
use statecraft_core::tool::{Tool, ToolOutcome, SEND_MESSAGE_TOOL};

pub struct SendMessageToUser;

#[async_trait]
impl Tool for SendMessageToUser {
    fn name(&self) -> &str {
        SEND_MESSAGE_TOOL
    }

    fn description(&self) -> &str {
        "Send a message to the user."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "agent_message": {
                    "type": "string",
                    "description": "The message to send to the user. \
                         Can be an empty string if you are passively waiting."
                }
            },
            "required": ["agent_message"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, arguments: Value) -> Result<ToolOutcome, ToolError> {
        let message = arguments["agent_message"].as_str().unwrap_or("");
        Ok(ToolOutcome::ok(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definition_shape() {
        let tool = SendMessageToUser;
        assert_eq!(tool.name(), "send_message_to_user");
        let schema = tool.parameters_schema();
        assert_eq!(schema["required"], json!(["agent_message"]));
    }

    #[tokio::test]
    async fn echoes_the_message_as_content() {
        let outcome = SendMessageToUser
            .execute(json!({"agent_message": "Hi!"}))
            .await
            .unwrap();
        assert_eq!(outcome.content, "Hi!");
        assert!(outcome.error.is_none());
    }

    #[tokio::test]
    async fn missing_message_means_passively_waiting() {
        let outcome = SendMessageToUser.execute(json!({})).await.unwrap();
        assert_eq!(outcome.content, "");
    }
}
