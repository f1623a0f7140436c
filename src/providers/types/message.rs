use serde::{Deserialize, Serialize};

use crate::errors::HistoryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A function call requested by the model. `arguments` is the raw JSON text exactly as
/// streamed; it is only parsed when the call is dispatched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

impl ToolCall {
    pub fn new<I, N, A>(id: I, name: N, arguments: A) -> Self
    where
        I: Into<String>,
        N: Into<String>,
        A: Into<String>,
    {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

impl Message {
    fn with_content(role: Role, text: &str) -> Self {
        Self {
            role,
            content: Some(text.to_string()),
            tool_calls: Vec::new(),
            tool_call_id: None,
            tool_name: None,
        }
    }

    pub fn system(text: &str) -> Self {
        Self::with_content(Role::System, text)
    }

    pub fn user(text: &str) -> Self {
        Self::with_content(Role::User, text)
    }

    pub fn assistant(text: &str) -> Self {
        Self::with_content(Role::Assistant, text)
    }

    /// An assistant message that carries only tool calls.
    pub fn tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: None,
            tool_calls: calls,
            tool_call_id: None,
            tool_name: None,
        }
    }

    pub fn tool_result(call: &ToolCall, output: &str) -> Self {
        Self {
            role: Role::Tool,
            content: Some(output.to_string()),
            tool_calls: Vec::new(),
            tool_call_id: Some(call.id.clone()),
            tool_name: Some(call.name.clone()),
        }
    }

    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }

    pub fn is_system(&self) -> bool {
        self.role == Role::System
    }

    /// Check the per-role shape rules.
    pub fn validate(&self) -> Result<(), HistoryError> {
        let invalid = |reason: &str| Err(HistoryError::InvalidMessage(reason.to_string()));
        match self.role {
            Role::Assistant => {
                if self.content.is_none() && self.tool_calls.is_empty() {
                    return invalid("assistant message must include content or tool calls");
                }
                if self.tool_call_id.is_some() {
                    return invalid("assistant message does not support a tool call id");
                }
            }
            Role::Tool => {
                if self.tool_call_id.is_none() {
                    return invalid("tool message must reference a tool call id");
                }
                if !self.tool_calls.is_empty() {
                    return invalid("tool message does not support tool calls");
                }
            }
            Role::System | Role::User => {
                if self.content.is_none() {
                    return invalid("system and user messages must include content");
                }
                if !self.tool_calls.is_empty() || self.tool_call_id.is_some() {
                    return invalid("only assistant and tool messages carry tool data");
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_user_message() {
        let message = Message::user("abcd");
        assert_eq!(message.role, Role::User);
        assert_eq!(message.text(), "abcd");
        assert!(message.validate().is_ok());
    }

    #[test]
    fn test_tool_calls_message_has_no_content() {
        let message = Message::tool_calls(vec![
            ToolCall::new("1", "read_file", "{}"),
            ToolCall::new("2", "read_file", "{}"),
        ]);
        assert_eq!(message.role, Role::Assistant);
        assert!(message.content.is_none());
        assert_eq!(message.tool_calls.len(), 2);
        assert!(message.validate().is_ok());
    }

    #[test]
    fn test_tool_result_correlates_with_call() {
        let call = ToolCall::new("call_1", "create_file", "{}");
        let message = Message::tool_result(&call, "ok");
        assert_eq!(message.tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(message.tool_name.as_deref(), Some("create_file"));
        assert!(message.validate().is_ok());
    }

    #[test]
    fn test_message_validation() {
        let empty_assistant = Message::tool_calls(Vec::new());
        assert!(empty_assistant.validate().is_err());

        let mut tool = Message::tool_result(&ToolCall::new("1", "read_file", "{}"), "x");
        tool.tool_call_id = None;
        assert!(tool.validate().is_err());

        let mut user = Message::user("hi");
        user.tool_calls.push(ToolCall::new("1", "read_file", "{}"));
        assert!(user.validate().is_err());
    }

    #[test]
    fn test_serialization_skips_absent_fields() -> anyhow::Result<()> {
        let message = Message::user("Hello, world!");
        let serialized = serde_json::to_string(&message)?;
        let json_value: Value = serde_json::from_str(&serialized)?;
        assert_eq!(json_value["role"], "user");
        assert!(json_value.get("tool_calls").is_none());
        assert!(json_value.get("tool_call_id").is_none());

        let deserialized: Message = serde_json::from_str(&serialized)?;
        assert_eq!(deserialized, message);
        Ok(())
    }
}
