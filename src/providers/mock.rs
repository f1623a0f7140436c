use anyhow::Result;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;

use crate::errors::ProviderError;
use crate::providers::base::{CompletionRequest, FragmentStream, Provider, ToolChoice};
use crate::providers::types::fragment::{Fragment, StreamEvent, ToolCallFragment};

/// One scripted reply: either a stream of events or a failure to open the stream.
pub enum MockReply {
    Stream(Vec<Result<StreamEvent, ProviderError>>),
    Fail(ProviderError),
}

impl MockReply {
    /// A reply streamed as the given text pieces followed by a normal end.
    pub fn text(pieces: &[&str]) -> Self {
        let mut events: Vec<_> = pieces
            .iter()
            .map(|piece| Ok(StreamEvent::Fragment(Fragment::text(piece))))
            .collect();
        events.push(Ok(StreamEvent::End));
        MockReply::Stream(events)
    }

    pub fn tool_calls(fragments: Vec<ToolCallFragment>) -> Self {
        let mut events: Vec<_> = fragments
            .into_iter()
            .map(|fragment| Ok(StreamEvent::Fragment(Fragment::tool_call(fragment))))
            .collect();
        events.push(Ok(StreamEvent::End));
        MockReply::Stream(events)
    }
}

/// What the agent asked for, captured per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub message_count: usize,
    pub tool_names: Vec<String>,
    pub tool_choice: ToolChoice,
    pub max_tokens: u32,
}

/// A mock provider that returns pre-configured replies for testing
pub struct MockProvider {
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockProvider {
    /// Create a new mock provider with a sequence of replies
    pub fn new(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Shared handle on the requests seen so far; stays valid after the provider is boxed.
    pub fn requests(&self) -> Arc<Mutex<Vec<RecordedRequest>>> {
        Arc::clone(&self.requests)
    }
}

struct ScriptedStream {
    events: VecDeque<Result<StreamEvent, ProviderError>>,
}

impl FragmentStream for ScriptedStream {
    fn next_event(&mut self) -> Result<StreamEvent, ProviderError> {
        self.events.pop_front().unwrap_or(Ok(StreamEvent::End))
    }
}

impl Provider for MockProvider {
    fn from_env() -> Result<Self> {
        Ok(Self::new(Vec::new()))
    }

    fn stream(
        &self,
        request: &CompletionRequest<'_>,
    ) -> Result<Box<dyn FragmentStream + '_>, ProviderError> {
        self.requests.lock().unwrap().push(RecordedRequest {
            message_count: request.messages.len(),
            tool_names: request.tools.iter().map(|tool| tool.name.clone()).collect(),
            tool_choice: request.tool_choice,
            max_tokens: request.max_tokens,
        });

        // An exhausted script behaves like an empty reply
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(MockReply::Stream(Vec::new()));
        match reply {
            MockReply::Stream(events) => Ok(Box::new(ScriptedStream {
                events: events.into(),
            })),
            MockReply::Fail(err) => Err(err),
        }
    }
}
