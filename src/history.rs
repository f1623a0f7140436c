use std::collections::HashSet;

use tracing::{debug, info};

use crate::errors::HistoryError;
use crate::providers::types::message::{Message, Role};

/// Trimming kicks in once the log holds more than this many non-system messages.
pub const MAX_NON_SYSTEM_MESSAGES: usize = 20;
/// Number of most recent non-system messages kept by a trim.
pub const RETAINED_MESSAGES: usize = 15;

/// Position in the log that a failed turn can be rolled back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint(usize);

/// Ordered message log for one session.
#[derive(Debug, Clone, Default)]
pub struct ConversationHistory {
    messages: Vec<Message>,
}

impl ConversationHistory {
    /// A log holding only the given system prompt.
    pub fn seeded(system_prompt: &str) -> Self {
        Self {
            messages: vec![Message::system(system_prompt)],
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Append a message after checking its shape. A tool result must answer a call made by
    /// an earlier assistant message still in the log.
    pub fn push(&mut self, message: Message) -> Result<(), HistoryError> {
        message.validate()?;

        if message.role == Role::Tool {
            let call_id = message.tool_call_id.as_deref().unwrap_or_default();
            let answered = self
                .messages
                .iter()
                .filter(|m| m.role == Role::Assistant)
                .flat_map(|m| m.tool_calls.iter())
                .any(|call| call.id == call_id);
            if !answered {
                return Err(HistoryError::OrphanToolResult(call_id.to_string()));
            }
        }

        self.messages.push(message);
        Ok(())
    }

    /// Fold a file into the log as system context.
    pub fn add_file_context(&mut self, path: &str, content: &str) {
        self.messages.push(Message::system(&format!(
            "Content of file '{}':\n\n{}",
            path, content
        )));
    }

    /// Whether the content of `path` is already in the log, folded in or returned by a tool.
    pub fn has_file_context(&self, path: &str) -> bool {
        let marker = format!("Content of file '{}'", path);
        self.messages.iter().any(|m| m.text().contains(&marker))
    }

    /// Drop the oldest non-system messages once there are too many.
    ///
    /// System messages always survive in their original order and are placed first.
    /// Returns how many messages were dropped.
    pub fn trim(&mut self) -> usize {
        let non_system = self.messages.iter().filter(|m| !m.is_system()).count();
        if non_system <= MAX_NON_SYSTEM_MESSAGES {
            return 0;
        }

        let dropped = non_system - RETAINED_MESSAGES;
        let (system, others): (Vec<Message>, Vec<Message>) =
            self.messages.drain(..).partition(Message::is_system);
        self.messages = system;
        self.messages.extend(others.into_iter().skip(dropped));

        info!(dropped, retained = RETAINED_MESSAGES, "conversation history trimmed");
        dropped
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.messages.len())
    }

    /// Discard everything appended since `checkpoint`.
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        if checkpoint.0 < self.messages.len() {
            debug!(
                removed = self.messages.len() - checkpoint.0,
                "rolling back history"
            );
            self.messages.truncate(checkpoint.0);
        }
    }

    /// Reset to the opening system prompt, or to `default_prompt` if the log never had one.
    pub fn reset(&mut self, default_prompt: &str) {
        let first = self
            .messages
            .drain(..)
            .next()
            .filter(Message::is_system)
            .unwrap_or_else(|| Message::system(default_prompt));
        self.messages = vec![first];
    }

    /// Ids of every tool call that an assistant message in the log has made.
    pub fn known_call_ids(&self) -> HashSet<&str> {
        self.messages
            .iter()
            .flat_map(|m| m.tool_calls.iter())
            .map(|call| call.id.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::types::message::ToolCall;
    use crate::providers::utils::messages_to_openai_spec;

    fn history_with(system: usize, others: usize) -> ConversationHistory {
        let mut history = ConversationHistory::default();
        for i in 0..system {
            history.push(Message::system(&format!("sys {}", i))).unwrap();
        }
        for i in 0..others {
            history.push(Message::user(&format!("msg {}", i))).unwrap();
        }
        history
    }

    #[test]
    fn test_seeded_history_starts_with_system() {
        let history = ConversationHistory::seeded("prompt");
        assert_eq!(history.len(), 1);
        assert!(history.messages()[0].is_system());
        assert_eq!(history.messages()[0].text(), "prompt");
    }

    #[test]
    fn test_push_rejects_orphan_tool_result() {
        let mut history = ConversationHistory::seeded("prompt");
        let call = ToolCall::new("call_1", "read_file", "{}");

        let err = history
            .push(Message::tool_result(&call, "content"))
            .unwrap_err();
        assert_eq!(err, HistoryError::OrphanToolResult("call_1".to_string()));

        history.push(Message::tool_calls(vec![call.clone()])).unwrap();
        history.push(Message::tool_result(&call, "content")).unwrap();
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn test_push_rejects_malformed_message() {
        let mut history = ConversationHistory::default();
        assert!(matches!(
            history.push(Message::tool_calls(Vec::new())),
            Err(HistoryError::InvalidMessage(_))
        ));
        assert!(history.is_empty());
    }

    #[test]
    fn test_trim_leaves_short_history_alone() {
        let mut history = history_with(1, MAX_NON_SYSTEM_MESSAGES);
        assert_eq!(history.trim(), 0);
        assert_eq!(history.len(), 21);
    }

    #[test]
    fn test_trim_keeps_most_recent() {
        let mut history = history_with(1, 21);
        assert_eq!(history.trim(), 6);
        assert_eq!(history.len(), 16);
        assert_eq!(history.messages()[1].text(), "msg 6");
        assert_eq!(history.last().unwrap().text(), "msg 20");
    }

    #[test]
    fn test_trim_count_property() {
        for system in 0..4 {
            for others in 0..40 {
                let mut history = history_with(system, others);
                // a late system message makes the reassembly order visible
                history.add_file_context("late.txt", "x");
                let before = history.messages().to_vec();
                let before_system: Vec<Message> =
                    before.iter().filter(|m| m.is_system()).cloned().collect();

                let dropped = history.trim();

                if others <= MAX_NON_SYSTEM_MESSAGES {
                    assert_eq!(dropped, 0, "system={system} others={others}");
                    assert_eq!(history.messages(), &before[..]);
                    continue;
                }

                let after_system: Vec<Message> = history
                    .messages()
                    .iter()
                    .filter(|m| m.is_system())
                    .cloned()
                    .collect();
                let after_others = history.messages().iter().filter(|m| !m.is_system()).count();
                assert_eq!(after_others, RETAINED_MESSAGES, "system={system} others={others}");
                assert_eq!(dropped, others - RETAINED_MESSAGES);
                assert_eq!(after_system, before_system);
                assert!(history.messages()[..after_system.len()]
                    .iter()
                    .all(Message::is_system));
            }
        }
    }

    #[test]
    fn test_trim_may_orphan_tool_results() {
        let mut history = ConversationHistory::seeded("prompt");
        let call = ToolCall::new("old", "read_file", "{}");
        for i in 0..5 {
            history.push(Message::user(&format!("early {}", i))).unwrap();
        }
        history.push(Message::tool_calls(vec![call.clone()])).unwrap();
        history.push(Message::tool_result(&call, "result")).unwrap();
        for i in 0..14 {
            history.push(Message::user(&format!("msg {}", i))).unwrap();
        }

        // 21 non-system messages: the five early ones and the call go, the result stays
        assert_eq!(history.trim(), 6);
        assert!(!history.known_call_ids().contains("old"));
        assert_eq!(history.messages()[1].tool_call_id.as_deref(), Some("old"));

        let spec = messages_to_openai_spec(history.messages());
        assert_eq!(spec.len(), 15);
        assert!(spec.iter().all(|m| m["role"] != "tool"));
        assert_eq!(spec[1]["content"], "msg 0");
    }

    #[test]
    fn test_rollback_to_checkpoint() {
        let mut history = ConversationHistory::seeded("prompt");
        let checkpoint = history.checkpoint();
        history.push(Message::user("hello")).unwrap();
        history.push(Message::assistant("hi")).unwrap();

        history.rollback(checkpoint);
        assert_eq!(history.len(), 1);

        // rolling back past the current end is a no-op
        history.rollback(Checkpoint(10));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_reset_keeps_original_prompt() {
        let mut history = ConversationHistory::seeded("original");
        history.push(Message::user("hello")).unwrap();
        history.add_file_context("a.txt", "A");

        history.reset("fallback");
        assert_eq!(history.len(), 1);
        assert_eq!(history.messages()[0].text(), "original");

        let mut empty = ConversationHistory::default();
        empty.reset("fallback");
        assert_eq!(empty.messages()[0].text(), "fallback");
    }

    #[test]
    fn test_has_file_context() {
        let mut history = ConversationHistory::seeded("prompt");
        assert!(!history.has_file_context("/tmp/a.txt"));

        history.add_file_context("/tmp/a.txt", "hello");
        assert!(history.has_file_context("/tmp/a.txt"));
        assert!(!history.has_file_context("/tmp/a"));
    }

    #[test]
    fn test_add_file_context_format() {
        let mut history = ConversationHistory::default();
        history.add_file_context("/tmp/a.txt", "hello");
        assert!(history.messages()[0].is_system());
        assert_eq!(
            history.messages()[0].text(),
            "Content of file '/tmp/a.txt':\n\nhello"
        );
    }
}
