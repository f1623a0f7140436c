use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::agent::Agent;
use crate::errors::{ContextError, FileError};
use crate::files;
use crate::ingest::{self, SkippedEntry};

/// What an `/add` folded into the conversation.
#[derive(Debug, Default)]
pub struct AddReport {
    pub root: PathBuf,
    pub is_directory: bool,
    /// Full paths of the files now in the history, in traversal order.
    pub added: Vec<PathBuf>,
    pub skipped: Vec<SkippedEntry>,
    pub limit_reached: bool,
}

/// Add a single file, or every eligible file below a directory, to the agent's history.
pub fn add_to_context(agent: &mut Agent, path: impl AsRef<Path>) -> Result<AddReport, ContextError> {
    let path = files::normalize_path(path)?;
    let root = fs::canonicalize(&path).map_err(|e| FileError::from_io(&path, e))?;

    if !root.is_dir() {
        let content = files::read_file(&root)?;
        agent.add_file_context(&root.display().to_string(), &content);
        info!(path = %root.display(), "added file to conversation");
        return Ok(AddReport {
            added: vec![root.clone()],
            root,
            ..AddReport::default()
        });
    }

    let scan = ingest::ingest(&root)?;
    let mut added = Vec::with_capacity(scan.files.len());
    for file in &scan.files {
        let full_path = root.join(&file.relative_path);
        agent.add_file_context(&full_path.display().to_string(), &file.content);
        added.push(full_path);
    }
    info!(
        root = %root.display(),
        added = added.len(),
        skipped = scan.skipped.len(),
        "added directory to conversation"
    );

    Ok(AddReport {
        root,
        is_directory: true,
        added,
        skipped: scan.skipped,
        limit_reached: scan.limit_reached,
    })
}
