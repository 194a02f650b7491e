//! Tool implementations for Statecraft.
//!
//! Two kinds of tools exist: the built-in `send_message_to_user` reply
//! action, and caller-supplied HTTP request tools described by a
//! [`RequestToolSpec`]. The [`ActionExecutor`] runs whatever the LLM
//! selected and turns each action into a conversation step.

pub mod executor;
pub mod request;
pub mod send_message;

use std::sync::Arc;

use statecraft_core::error::Result;
use statecraft_core::tool::ToolSet;

pub use executor::ActionExecutor;
pub use request::{RequestMethod, RequestTool, RequestToolSpec};
pub use send_message::SendMessageToUser;

/// Build the tool set for one turn: the built-in reply tool plus every
/// caller-supplied request tool. Duplicate names fail loudly.
pub fn build_tool_set(specs: &[RequestToolSpec]) -> Result<ToolSet> {
    let mut tools = ToolSet::new();
    tools.register(Arc::new(SendMessageToUser))?;
    for spec in specs {
        tools.register(Arc::new(RequestTool::new(spec.clone())?))?;
    }
    Ok(tools)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use statecraft_core::tool::SEND_MESSAGE_TOOL;

    fn spec(name: &str) -> RequestToolSpec {
        serde_json::from_value(json!({
            "name": name,
            "description": "test tool",
            "method": "GET",
            "url": "https://example.com/{q}",
        }))
        .unwrap()
    }

    #[test]
    fn set_always_contains_the_reply_tool() {
        let tools = build_tool_set(&[]).unwrap();
        assert_eq!(tools.len(), 1);
        assert!(tools.get(SEND_MESSAGE_TOOL).is_some());
    }

    #[test]
    fn request_tools_are_registered_after_the_builtin() {
        let tools = build_tool_set(&[spec("weather")]).unwrap();
        let names: Vec<String> = tools.definitions().iter().map(|d| d.name.clone()).collect();
        assert_eq!(names, vec![SEND_MESSAGE_TOOL.to_string(), "weather".to_string()]);
    }

    #[test]
    fn duplicate_names_fail() {
        assert!(build_tool_set(&[spec("weather"), spec("weather")]).is_err());
        assert!(build_tool_set(&[spec(SEND_MESSAGE_TOOL)]).is_err());
    }
}
