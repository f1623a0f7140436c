use anyhow::Result;

use super::types::{fragment::StreamEvent, message::Message, tool::Tool};
use crate::errors::ProviderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolChoice {
    /// Let the model decide whether to call a tool.
    Auto,
    /// Offer no tools at all.
    None,
}

impl ToolChoice {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolChoice::Auto => "auto",
            ToolChoice::None => "none",
        }
    }
}

/// One streaming chat-completion request.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [Message],
    pub tools: &'a [Tool],
    pub tool_choice: ToolChoice,
    pub max_tokens: u32,
}

/// Pull-based source of reply fragments.
///
/// Callers keep calling `next_event` until it yields [`StreamEvent::End`] or an error.
/// Dropping the stream releases the underlying connection.
pub trait FragmentStream {
    fn next_event(&mut self) -> Result<StreamEvent, ProviderError>;
}

/// Base trait for chat-completion providers
pub trait Provider {
    /// Create a provider instance from environment variables
    fn from_env() -> Result<Self>
    where
        Self: Sized;

    /// Open a streaming completion for the given request
    fn stream(
        &self,
        request: &CompletionRequest<'_>,
    ) -> Result<Box<dyn FragmentStream + '_>, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_choice_wire_names() {
        assert_eq!(ToolChoice::Auto.as_str(), "auto");
        assert_eq!(ToolChoice::None.as_str(), "none");
    }
}
