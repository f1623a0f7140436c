use tracing::debug;

use crate::errors::ProviderError;
use crate::formatter::TextFormatter;
use crate::providers::base::{CompletionRequest, Provider};
use crate::providers::types::fragment::{StreamEvent, ToolCallFragment, MAX_TOOL_CALLS};
use crate::providers::types::message::ToolCall;
use crate::render::Renderer;

/// A complete assistant turn rebuilt from the stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregatedReply {
    pub text: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

impl AggregatedReply {
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Accumulates text and indexed tool-call pieces until the stream ends.
#[derive(Debug, Default)]
pub struct StreamAggregator {
    text: String,
    tool_calls: Vec<ToolCall>,
}

impl StreamAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_text(&mut self, text: &str) {
        self.text.push_str(text);
    }

    /// Merge one piece into the call at its index, growing the collection as needed.
    /// Id and arguments are concatenated; the first non-empty name sticks.
    pub fn merge_tool_fragment(
        &mut self,
        fragment: &ToolCallFragment,
    ) -> Result<(), ProviderError> {
        if fragment.index >= MAX_TOOL_CALLS {
            return Err(ProviderError::Stream(format!(
                "tool call index {} is above the limit of {}",
                fragment.index, MAX_TOOL_CALLS
            )));
        }
        if fragment.index >= self.tool_calls.len() {
            self.tool_calls
                .resize_with(fragment.index + 1, ToolCall::default);
        }
        let call = &mut self.tool_calls[fragment.index];
        call.id.push_str(&fragment.id);
        if call.name.is_empty() {
            call.name.push_str(&fragment.name);
        }
        call.arguments.push_str(&fragment.arguments);
        Ok(())
    }

    pub fn finish(self) -> AggregatedReply {
        let text = if self.text.is_empty() {
            None
        } else {
            Some(self.text)
        };
        // indices the endpoint skipped never received any piece
        let tool_calls = self
            .tool_calls
            .into_iter()
            .filter(|call| !(call.id.is_empty() && call.name.is_empty() && call.arguments.is_empty()))
            .collect();
        AggregatedReply { text, tool_calls }
    }
}

/// Issue one streaming request and consume it, rendering text as it arrives.
/// Reasoning pieces are shown but left out of the reply.
pub fn stream_reply(
    provider: &dyn Provider,
    request: &CompletionRequest<'_>,
    renderer: &mut dyn Renderer,
) -> Result<AggregatedReply, ProviderError> {
    let mut stream = provider.stream(request)?;
    let mut aggregator = StreamAggregator::new();
    let mut formatter = TextFormatter::new();
    let mut started = false;

    loop {
        let fragment = match stream.next_event()? {
            StreamEvent::Fragment(fragment) => fragment,
            StreamEvent::End => break,
        };

        if let Some(reasoning) = fragment.reasoning.as_deref().filter(|t| !t.is_empty()) {
            renderer.reasoning(reasoning);
        }

        if let Some(text) = fragment.text.as_deref().filter(|t| !t.is_empty()) {
            if !started {
                renderer.response_begins();
                started = true;
            }
            for line in formatter.feed(text) {
                renderer.render_line(&line);
            }
            aggregator.push_text(text);
        }

        for piece in &fragment.tool_calls {
            aggregator.merge_tool_fragment(piece)?;
        }

        if let Some(reason) = &fragment.finish_reason {
            debug!(finish_reason = %reason, "reply finished");
        }
    }

    if started {
        for line in formatter.finalize() {
            renderer.render_line(&line);
        }
        renderer.response_ends();
    }

    let reply = aggregator.finish();
    debug!(
        text_len = reply.text.as_ref().map_or(0, String::len),
        tool_calls = reply.tool_calls.len(),
        "stream complete"
    );
    Ok(reply)
}
