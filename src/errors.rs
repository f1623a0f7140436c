use std::path::PathBuf;

use thiserror::Error;

/// Failures of the single-file primitives. These are reported back to the model as
/// tool-result text, never raised to the operator directly.
#[derive(Error, Debug)]
pub enum FileError {
    #[error("{subject} not found: {}", .path.display())]
    NotFound { subject: &'static str, path: PathBuf },

    #[error("{} is a directory, not a file", .0.display())]
    IsDirectory(PathBuf),

    #[error("{} exceeds size limit ({size} > {limit} bytes)", .path.display())]
    TooLarge { path: PathBuf, size: u64, limit: u64 },

    #[error(
        "ambiguous edit: original snippet found {occurrences} times in {}. Provide a more unique snippet",
        .path.display()
    )]
    AmbiguousEdit { path: PathBuf, occurrences: usize },

    #[error("original snippet for {} must not be empty", .0.display())]
    EmptySnippet(PathBuf),

    #[error("permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FileError {
    /// Classify an I/O error raised while touching `path`.
    pub fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => FileError::NotFound {
                subject: "file",
                path,
            },
            std::io::ErrorKind::PermissionDenied => FileError::PermissionDenied(path),
            _ => FileError::Io { path, source },
        }
    }
}

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error(transparent)]
    File(#[from] FileError),
}

/// Failures talking to the completion endpoint. Terminal for the current turn.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("server error: {status}: {body}")]
    Server { status: u16, body: String },

    #[error("request rejected: {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Input message too long. Message: {0}")]
    ContextLengthExceeded(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("could not decode stream chunk: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("stream error: {0}")]
    Stream(String),

    #[error("stream read failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Only a failure to open the scan root aborts a directory scan.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("cannot open {}: {source}", .path.display())]
    Root {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not a directory", .0.display())]
    NotADirectory(PathBuf),
}

/// Failure of an `/add` request as a whole.
#[derive(Error, Debug)]
pub enum ContextError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    File(#[from] FileError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    #[error("tool result references unknown tool call id '{0}'")]
    OrphanToolResult(String),

    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

#[derive(Error, Debug)]
pub enum TurnError {
    #[error(transparent)]
    Transport(#[from] ProviderError),

    #[error(transparent)]
    History(#[from] HistoryError),
}

pub type ToolResult<T> = Result<T, ToolError>;
