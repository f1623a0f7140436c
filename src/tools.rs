use std::collections::HashSet;

use anyhow::{bail, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::errors::{ToolError, ToolResult};
use crate::files;
use crate::providers::types::tool::{Tool, ToolOutput};
use crate::providers::utils::is_valid_function_name;

const READ_SEPARATOR: &str = "==================================================";

#[derive(Debug, Deserialize)]
struct ReadFileArgs {
    file_path: String,
}

#[derive(Debug, Deserialize)]
struct ReadMultipleFilesArgs {
    file_paths: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CreateFileArgs {
    file_path: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct FileToCreate {
    path: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct CreateMultipleFilesArgs {
    files: Vec<FileToCreate>,
}

#[derive(Debug, Deserialize)]
struct EditFileArgs {
    file_path: String,
    original_snippet: String,
    new_snippet: String,
}

fn parse_args<T: DeserializeOwned>(arguments: &str) -> ToolResult<T> {
    serde_json::from_str(arguments).map_err(|e| ToolError::InvalidParameters(e.to_string()))
}

fn file_content(path: &str, content: &str) -> String {
    format!("Content of file '{}':\n\n{}", path, content)
}

fn read_file(arguments: &str) -> ToolResult<ToolOutput> {
    let args: ReadFileArgs = parse_args(arguments)?;
    let content = files::read_file(&args.file_path)?;
    Ok(ToolOutput::text(file_content(&args.file_path, &content)))
}

/// Reads each path independently; a failure is reported inline and does not stop the rest.
fn read_multiple_files(arguments: &str) -> ToolResult<ToolOutput> {
    let args: ReadMultipleFilesArgs = parse_args(arguments)?;
    let results: Vec<String> = args
        .file_paths
        .iter()
        .map(|path| match files::read_file(path) {
            Ok(content) => file_content(path, &content),
            Err(e) => format!("Error reading '{}': {}", path, e),
        })
        .collect();
    let separator = format!("\n\n{}\n\n", READ_SEPARATOR);
    Ok(ToolOutput::text(results.join(separator.as_str())))
}

fn create_file(arguments: &str) -> ToolResult<ToolOutput> {
    let args: CreateFileArgs = parse_args(arguments)?;
    let change = files::write_file(&args.file_path, &args.content)?;
    Ok(ToolOutput::with_changes(
        format!("Successfully created file '{}'", args.file_path),
        vec![change],
    ))
}

fn create_multiple_files(arguments: &str) -> ToolResult<ToolOutput> {
    let args: CreateMultipleFilesArgs = parse_args(arguments)?;
    let mut changes = Vec::with_capacity(args.files.len());
    for file in &args.files {
        changes.push(files::write_file(&file.path, &file.content)?);
    }
    let created: Vec<&str> = args.files.iter().map(|f| f.path.as_str()).collect();
    Ok(ToolOutput::with_changes(
        format!(
            "Successfully created {} files: {}",
            created.len(),
            created.join(", ")
        ),
        changes,
    ))
}

fn edit_file(arguments: &str) -> ToolResult<ToolOutput> {
    let args: EditFileArgs = parse_args(arguments)?;
    let change = files::edit_by_snippet(&args.file_path, &args.original_snippet, &args.new_snippet)?;
    Ok(ToolOutput::with_changes(
        format!("Successfully edited file '{}'", args.file_path),
        vec![change],
    ))
}

/// Name to handler table for the file tools offered to the model.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: Vec<Tool>,
}

impl ToolRegistry {
    /// Build a registry, rejecting duplicate or malformed names.
    pub fn new(tools: Vec<Tool>) -> Result<Self> {
        let mut names = HashSet::new();
        for tool in &tools {
            if !is_valid_function_name(&tool.name) {
                bail!("Invalid tool name '{}': must match [a-zA-Z0-9_-]+", tool.name);
            }
            if !names.insert(tool.name.as_str()) {
                bail!("Duplicate tool name: {}", tool.name);
            }
        }
        Ok(Self { tools })
    }

    /// The five file tools.
    pub fn standard() -> Result<Self> {
        let read_file_tool = Tool::new(
            "read_file",
            "Read the content of a single file from the filesystem",
            json!({
                "type": "object",
                "required": ["file_path"],
                "properties": {
                    "file_path": {
                        "type": "string",
                        "description": "The path to the file to read (relative or absolute)"
                    }
                }
            }),
            read_file,
        );

        let read_multiple_files_tool = Tool::new(
            "read_multiple_files",
            "Read the content of multiple files from the filesystem",
            json!({
                "type": "object",
                "required": ["file_paths"],
                "properties": {
                    "file_paths": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Paths of the files to read (relative or absolute)"
                    }
                }
            }),
            read_multiple_files,
        );

        let create_file_tool = Tool::new(
            "create_file",
            "Create a new file or overwrite an existing file with the provided content",
            json!({
                "type": "object",
                "required": ["file_path", "content"],
                "properties": {
                    "file_path": {
                        "type": "string",
                        "description": "The path where the file should be created"
                    },
                    "content": {
                        "type": "string",
                        "description": "The content to write to the file"
                    }
                }
            }),
            create_file,
        );

        let create_multiple_files_tool = Tool::new(
            "create_multiple_files",
            "Create multiple files at once",
            json!({
                "type": "object",
                "required": ["files"],
                "properties": {
                    "files": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "required": ["path", "content"],
                            "properties": {
                                "path": {"type": "string"},
                                "content": {"type": "string"}
                            }
                        },
                        "description": "The files to create, each with a path and content"
                    }
                }
            }),
            create_multiple_files,
        );

        let edit_file_tool = Tool::new(
            "edit_file",
            "Edit an existing file by replacing a specific snippet with new content. \
            The original snippet must occur exactly once in the file.",
            json!({
                "type": "object",
                "required": ["file_path", "original_snippet", "new_snippet"],
                "properties": {
                    "file_path": {
                        "type": "string",
                        "description": "The path to the file to edit"
                    },
                    "original_snippet": {
                        "type": "string",
                        "description": "The exact text snippet to find and replace"
                    },
                    "new_snippet": {
                        "type": "string",
                        "description": "The new text to replace the original snippet with"
                    }
                }
            }),
            edit_file,
        );

        Self::new(vec![
            read_file_tool,
            read_multiple_files_tool,
            create_file_tool,
            create_multiple_files_tool,
            edit_file_tool,
        ])
    }

    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.iter().find(|tool| tool.name == name)
    }

    /// Run the named tool on the raw argument text.
    pub fn dispatch(&self, name: &str, arguments: &str) -> ToolResult<ToolOutput> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::ToolNotFound(name.to_string()))?;
        debug!(tool = name, "dispatching tool call");
        tool.call(arguments)
    }
}
