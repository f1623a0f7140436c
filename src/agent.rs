use serde_json::Value;
use tracing::{debug, info, warn};

use crate::aggregator::{stream_reply, AggregatedReply};
use crate::errors::{ProviderError, ToolError, TurnError};
use crate::files::{self, FileChange};
use crate::history::ConversationHistory;
use crate::prompt::SYSTEM_PROMPT;
use crate::providers::base::{CompletionRequest, Provider, ToolChoice};
use crate::providers::types::message::{Message, ToolCall};
use crate::providers::types::tool::Tool;
use crate::render::Renderer;
use crate::tools::ToolRegistry;

pub const DEFAULT_MODEL: &str = "deepseek-chat";
pub const DEFAULT_MAX_TOKENS: u32 = 4000;
pub const DEFAULT_FOLLOW_UP_MAX_TOKENS: u32 = 1000;

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub model: String,
    pub max_tokens: u32,
    /// Budget for the reply that follows tool execution
    pub follow_up_max_tokens: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            follow_up_max_tokens: DEFAULT_FOLLOW_UP_MAX_TOKENS,
        }
    }
}

/// Summary of a completed turn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnReport {
    /// Messages dropped by trimming before the turn started
    pub trimmed: usize,
    pub tool_calls: Vec<ToolCall>,
    pub changes: Vec<FileChange>,
}

/// Agent integrates the chat model with the file tools it needs to pilot
pub struct Agent {
    provider: Box<dyn Provider>,
    registry: ToolRegistry,
    history: ConversationHistory,
    config: AgentConfig,
}

impl Agent {
    /// Create a new Agent with a history seeded by the system prompt
    pub fn new(provider: Box<dyn Provider>, registry: ToolRegistry, config: AgentConfig) -> Self {
        Self {
            provider,
            registry,
            history: ConversationHistory::seeded(SYSTEM_PROMPT),
            config,
        }
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn clear_history(&mut self) {
        self.history.reset(SYSTEM_PROMPT);
    }

    pub fn add_file_context(&mut self, path: &str, content: &str) {
        self.history.add_file_context(path, content);
    }

    /// Run one user turn: the reply, any tool calls it asks for and the follow-up reply.
    ///
    /// A transport failure on the first request removes the user message again. Once tools
    /// have run, their results stay in the history even if the follow-up request fails.
    pub fn submit_user_turn(
        &mut self,
        text: &str,
        renderer: &mut dyn Renderer,
    ) -> Result<TurnReport, TurnError> {
        let mut report = TurnReport {
            trimmed: self.history.trim(),
            ..TurnReport::default()
        };
        if report.trimmed > 0 {
            renderer.notice(&format!(
                "Conversation history trimmed ({} older messages dropped)",
                report.trimmed
            ));
        }

        let checkpoint = self.history.checkpoint();
        self.history.push(Message::user(text))?;

        let reply = match self.request(ToolChoice::Auto, renderer) {
            Ok(reply) => reply,
            Err(e) => {
                self.history.rollback(checkpoint);
                return Err(e.into());
            }
        };
        self.load_edit_targets(&reply.tool_calls);
        self.record_reply(&reply)?;

        if !reply.has_tool_calls() {
            return Ok(report);
        }

        renderer.tool_calls(&reply.tool_calls);
        for call in &reply.tool_calls {
            let (content, changes) = self.execute(call);
            for change in &changes {
                renderer.file_changed(change);
            }
            report.changes.extend(changes);
            self.history.push(Message::tool_result(call, &content))?;
        }
        report.tool_calls = reply.tool_calls;

        let follow_up = self.request(ToolChoice::None, renderer)?;
        if follow_up.has_tool_calls() {
            warn!(
                count = follow_up.tool_calls.len(),
                "discarding tool calls requested in follow-up reply"
            );
        }
        if let Some(text) = &follow_up.text {
            self.history.push(Message::assistant(text))?;
        }

        Ok(report)
    }

    fn request(
        &self,
        tool_choice: ToolChoice,
        renderer: &mut dyn Renderer,
    ) -> Result<AggregatedReply, ProviderError> {
        let (tools, max_tokens) = match tool_choice {
            ToolChoice::Auto => (self.registry.tools(), self.config.max_tokens),
            ToolChoice::None => (&[] as &[Tool], self.config.follow_up_max_tokens),
        };
        let request = CompletionRequest {
            model: &self.config.model,
            messages: self.history.messages(),
            tools,
            tool_choice,
            max_tokens,
        };
        debug!(
            messages = request.messages.len(),
            tools = request.tools.len(),
            tool_choice = tool_choice.as_str(),
            "sending completion request"
        );
        stream_reply(self.provider.as_ref(), &request, renderer)
    }

    /// Fold each file an `edit_file` call targets into the history, unless its content is
    /// already there. Runs before the calls are recorded so their results stay adjacent.
    fn load_edit_targets(&mut self, calls: &[ToolCall]) {
        for call in calls.iter().filter(|call| call.name == "edit_file") {
            let Some(raw) = serde_json::from_str::<Value>(&call.arguments)
                .ok()
                .and_then(|args| args.get("file_path")?.as_str().map(str::to_string))
            else {
                continue;
            };
            let Ok(path) = files::normalize_path(&raw) else {
                continue;
            };
            let key = path.display().to_string();
            if self.history.has_file_context(&raw) || self.history.has_file_context(&key) {
                continue;
            }
            match files::read_file(&path) {
                Ok(content) => {
                    debug!(path = %key, "folding edit target into history");
                    self.history.add_file_context(&key, &content);
                }
                Err(e) => debug!(path = %key, error = %e, "edit target left out of history"),
            }
        }
    }

    /// Text and tool calls go in as two separate assistant messages.
    fn record_reply(&mut self, reply: &AggregatedReply) -> Result<(), TurnError> {
        if let Some(text) = &reply.text {
            self.history.push(Message::assistant(text))?;
        }
        if reply.has_tool_calls() {
            self.history
                .push(Message::tool_calls(reply.tool_calls.clone()))?;
        }
        Ok(())
    }

    /// Run one call and turn the outcome, success or failure, into tool-result text.
    fn execute(&self, call: &ToolCall) -> (String, Vec<FileChange>) {
        match self.registry.dispatch(&call.name, &call.arguments) {
            Ok(output) => {
                info!(tool = %call.name, id = %call.id, "tool call succeeded");
                (output.content, output.changes)
            }
            Err(ToolError::ToolNotFound(name)) => {
                warn!(tool = %name, "model requested an unknown tool");
                (format!("Unknown function: {}", name), Vec::new())
            }
            Err(ToolError::InvalidParameters(e)) => {
                warn!(tool = %call.name, error = %e, "could not parse tool arguments");
                (
                    format!("Error parsing arguments for {}: {}", call.name, e),
                    Vec::new(),
                )
            }
            Err(e) => {
                warn!(tool = %call.name, error = %e, "tool call failed");
                (format!("Error executing {}: {}", call.name, e), Vec::new())
            }
        }
    }
}
