/// Highest number of tool calls accepted in one reply. Indices at or above it are refused
/// rather than allocated for.
pub const MAX_TOOL_CALLS: usize = 128;

/// One piece of a streamed tool call. Every field except `index` may be empty; only the
/// order in which pieces for the same index arrive is meaningful.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolCallFragment {
    pub index: usize,
    pub id: String,
    pub name: String,
    pub arguments: String,
}

impl ToolCallFragment {
    pub fn new(index: usize, id: &str, name: &str, arguments: &str) -> Self {
        Self {
            index,
            id: id.to_string(),
            name: name.to_string(),
            arguments: arguments.to_string(),
        }
    }
}

/// One incremental chunk of a streamed reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragment {
    pub text: Option<String>,
    /// Chain-of-thought shown to the operator; never stored in the history.
    pub reasoning: Option<String>,
    pub tool_calls: Vec<ToolCallFragment>,
    pub finish_reason: Option<String>,
}

impl Fragment {
    pub fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            ..Self::default()
        }
    }

    pub fn reasoning(text: &str) -> Self {
        Self {
            reasoning: Some(text.to_string()),
            ..Self::default()
        }
    }

    pub fn tool_call(fragment: ToolCallFragment) -> Self {
        Self {
            tool_calls: vec![fragment],
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Fragment(Fragment),
    /// The endpoint signalled a normal end of stream.
    End,
}
