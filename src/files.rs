use std::env;
use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info};

use crate::errors::FileError;

/// Ceiling for any single file read, written or ingested.
pub const MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;

/// A completed mutation, surfaced to the operator as a confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange {
    Written(PathBuf),
    Edited(PathBuf),
}

impl FileChange {
    pub fn path(&self) -> &Path {
        match self {
            FileChange::Written(path) | FileChange::Edited(path) => path,
        }
    }
}

/// Make `path` absolute against the working directory and fold `.` and `..` lexically.
/// Symlinks are left as they are.
pub fn normalize_path(path: impl AsRef<Path>) -> Result<PathBuf, FileError> {
    let path = path.as_ref();
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()
            .map_err(|e| FileError::from_io(path, e))?
            .join(path)
    };

    let mut resolved = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            // popping at the root leaves the root
            Component::ParentDir => {
                resolved.pop();
            }
            other => resolved.push(other.as_os_str()),
        }
    }
    Ok(resolved)
}

pub fn read_file(path: impl AsRef<Path>) -> Result<String, FileError> {
    let path = normalize_path(path)?;

    let metadata = fs::metadata(&path).map_err(|e| FileError::from_io(&path, e))?;
    if metadata.is_dir() {
        return Err(FileError::IsDirectory(path));
    }
    if metadata.len() > MAX_FILE_SIZE {
        return Err(FileError::TooLarge {
            path,
            size: metadata.len(),
            limit: MAX_FILE_SIZE,
        });
    }

    let bytes = fs::read(&path).map_err(|e| FileError::from_io(&path, e))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Create or overwrite `path`, creating missing parent directories.
pub fn write_file(path: impl AsRef<Path>, content: &str) -> Result<FileChange, FileError> {
    let path = normalize_path(path)?;

    let size = content.len() as u64;
    if size > MAX_FILE_SIZE {
        return Err(FileError::TooLarge {
            path,
            size,
            limit: MAX_FILE_SIZE,
        });
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| FileError::from_io(parent, e))?;
    }
    fs::write(&path, content).map_err(|e| FileError::from_io(&path, e))?;

    info!(path = %path.display(), bytes = size, "file written");
    Ok(FileChange::Written(path))
}

/// Replace the single exact occurrence of `original` with `replacement`.
///
/// The edit only happens when `original` occurs exactly once; zero matches is
/// `NotFound` and several matches is `AmbiguousEdit`, with nothing written in either case.
pub fn edit_by_snippet(
    path: impl AsRef<Path>,
    original: &str,
    replacement: &str,
) -> Result<FileChange, FileError> {
    let path = normalize_path(path)?;
    if original.is_empty() {
        return Err(FileError::EmptySnippet(path));
    }

    let content = read_file(&path)?;
    let occurrences = content.matches(original).count();
    debug!(path = %path.display(), occurrences, "snippet lookup");
    match occurrences {
        0 => Err(FileError::NotFound {
            subject: "original snippet",
            path,
        }),
        1 => {
            let updated = content.replacen(original, replacement, 1);
            write_file(&path, &updated)?;
            Ok(FileChange::Edited(path))
        }
        occurrences => Err(FileError::AmbiguousEdit { path, occurrences }),
    }
}
