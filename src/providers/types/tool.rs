use std::fmt::Debug;

use serde_json::Value;

use crate::errors::ToolResult;
use crate::files::FileChange;

/// What a tool hands back: the text returned to the model plus any files it touched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub content: String,
    pub changes: Vec<FileChange>,
}

impl ToolOutput {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            changes: Vec::new(),
        }
    }

    pub fn with_changes(content: impl Into<String>, changes: Vec<FileChange>) -> Self {
        Self {
            content: content.into(),
            changes,
        }
    }
}

/// Typed handler behind a tool; receives the raw argument text from the model.
pub type ToolHandler = fn(&str) -> ToolResult<ToolOutput>;

/// A tool that can be used by a model.
#[derive(Clone)]
pub struct Tool {
    /// The name of the tool
    pub name: String,
    /// A description of what the tool does
    pub description: String,
    /// A json schema of the function signature
    pub parameters: Value,
    /// The function that powers the tool
    pub handler: ToolHandler,
}

impl Tool {
    pub fn new<N, D>(name: N, description: D, parameters: Value, handler: ToolHandler) -> Self
    where
        N: Into<String>,
        D: Into<String>,
    {
        Tool {
            name: name.into(),
            description: description.into(),
            parameters,
            handler,
        }
    }

    pub fn call(&self, arguments: &str) -> ToolResult<ToolOutput> {
        (self.handler)(arguments)
    }
}

impl Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("parameters", &self.parameters)
            .field("handler", &"<function>")
            .finish()
    }
}
