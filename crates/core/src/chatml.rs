//! ChatML message shapes and user-input normalization.
//!
//! Callers may send either a bare string or a ChatML array; the boundary
//! normalizes both to one shape so downstream code never branches on it.

use serde::{Deserialize, Serialize};

/// Roles accepted at the API boundary. Anything else fails deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One ChatML message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Caller-supplied input for one turn: a raw string or a ChatML sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserInput {
    Text(String),
    Messages(Vec<ChatMessage>),
}

impl Default for UserInput {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl UserInput {
    /// Normalize to a ChatML sequence; a string becomes a single user message.
    pub fn normalize(self) -> Vec<ChatMessage> {
        match self {
            Self::Text(text) => vec![ChatMessage::user(text)],
            Self::Messages(messages) => messages,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.is_empty(),
            Self::Messages(messages) => messages.is_empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_normalizes_to_single_user_message() {
        let input: UserInput = serde_json::from_str(r#""hello""#).unwrap();
        let messages = input.normalize();
        assert_eq!(messages, vec![ChatMessage::user("hello")]);
    }

    #[test]
    fn chatml_array_passes_through() {
        let input: UserInput = serde_json::from_str(
            r#"[{"role":"system","content":"be brief"},{"role":"user","content":"hi"}]"#,
        )
        .unwrap();
        let messages = input.normalize();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, ChatRole::System);
        assert_eq!(messages[1].content, "hi");
    }

    #[test]
    fn unknown_role_is_rejected() {
        let result: Result<UserInput, _> =
            serde_json::from_str(r#"[{"role":"tool","content":"x"}]"#);
        assert!(result.is_err());
    }
}
