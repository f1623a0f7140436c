use std::collections::HashSet;
use std::sync::LazyLock;

use anyhow::{anyhow, Result};
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::types::{
    fragment::{Fragment, ToolCallFragment, MAX_TOOL_CALLS},
    message::{Message, Role},
    tool::Tool,
};
use crate::errors::ProviderError;

static FUNCTION_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("function name pattern"));

/// Convert internal Message format to OpenAI's API message specification
///
/// Tool results whose originating call is no longer in the log (for example after
/// trimming) are left out, since the API rejects an unmatched `tool_call_id`.
pub fn messages_to_openai_spec(messages: &[Message]) -> Vec<Value> {
    let mut known_calls: HashSet<&str> = HashSet::new();
    let mut messages_spec = Vec::with_capacity(messages.len());

    for message in messages {
        let mut converted = json!({ "role": message.role });

        match message.role {
            Role::Tool => {
                let call_id = message.tool_call_id.as_deref().unwrap_or_default();
                if !known_calls.contains(call_id) {
                    debug!(call_id, "dropping orphaned tool result from request");
                    continue;
                }
                converted["tool_call_id"] = json!(call_id);
                converted["content"] = json!(message.text());
                if let Some(name) = &message.tool_name {
                    converted["name"] = json!(name);
                }
            }
            _ => {
                converted["content"] = match &message.content {
                    Some(text) => json!(text),
                    None => Value::Null,
                };
                if !message.tool_calls.is_empty() {
                    let tool_calls: Vec<Value> = message
                        .tool_calls
                        .iter()
                        .map(|call| {
                            known_calls.insert(call.id.as_str());
                            json!({
                                "id": call.id,
                                "type": "function",
                                "function": {
                                    "name": call.name,
                                    "arguments": call.arguments,
                                }
                            })
                        })
                        .collect();
                    converted["tool_calls"] = json!(tool_calls);
                }
            }
        }

        messages_spec.push(converted);
    }

    messages_spec
}

/// Convert internal Tool format to OpenAI's API tool specification
pub fn tools_to_openai_spec(tools: &[Tool]) -> Result<Vec<Value>> {
    let mut tool_names = HashSet::new();
    let mut result = Vec::new();

    for tool in tools {
        if !tool_names.insert(&tool.name) {
            return Err(anyhow!("Duplicate tool name: {}", tool.name));
        }

        result.push(json!({
            "type": "function",
            "function": {
                "name": tool.name,
                "description": tool.description,
                "parameters": tool.parameters,
            }
        }));
    }

    Ok(result)
}

pub fn is_valid_function_name(name: &str) -> bool {
    FUNCTION_NAME.is_match(name)
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    delta: Option<Delta>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    reasoning_content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCallDelta>>,
}

#[derive(Debug, Deserialize)]
struct ToolCallDelta {
    #[serde(default)]
    index: Option<usize>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<FunctionDelta>,
}

#[derive(Debug, Deserialize)]
struct FunctionDelta {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

/// Decode one `data:` payload of a chat-completion stream.
///
/// Returns `Ok(None)` for chunks without choices, such as a trailing usage chunk.
pub fn chunk_to_fragment(payload: &str) -> Result<Option<Fragment>, ProviderError> {
    let chunk: ChatChunk = serde_json::from_str(payload)?;
    if let Some(error) = chunk.error {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(ProviderError::Api(message));
    }

    let Some(choice) = chunk.choices.into_iter().next() else {
        return Ok(None);
    };

    let mut fragment = Fragment {
        finish_reason: choice.finish_reason,
        ..Fragment::default()
    };
    if let Some(delta) = choice.delta {
        fragment.text = delta.content.filter(|text| !text.is_empty());
        fragment.reasoning = delta.reasoning_content.filter(|text| !text.is_empty());
        for tool_call in delta.tool_calls.unwrap_or_default() {
            let Some(index) = tool_call.index else {
                warn!("tool call delta without index, ignoring");
                continue;
            };
            if index >= MAX_TOOL_CALLS {
                return Err(ProviderError::Stream(format!(
                    "tool call index {} is above the limit of {}",
                    index, MAX_TOOL_CALLS
                )));
            }
            let (name, arguments) = match tool_call.function {
                Some(function) => (
                    function.name.unwrap_or_default(),
                    function.arguments.unwrap_or_default(),
                ),
                None => (String::new(), String::new()),
            };
            fragment.tool_calls.push(ToolCallFragment {
                index,
                id: tool_call.id.unwrap_or_default(),
                name,
                arguments,
            });
        }
    }
    Ok(Some(fragment))
}

/// Map a rejected request body to a context-length error when the API reports one.
pub fn check_openai_context_length_error(error: &Value) -> Option<ProviderError> {
    let code = error.get("code")?.as_str()?;
    if code == "context_length_exceeded" || code == "string_above_max_length" {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("Unknown error")
            .to_string();
        Some(ProviderError::ContextLengthExceeded(message))
    } else {
        None
    }
}
