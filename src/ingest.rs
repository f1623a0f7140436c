//! Bounded, filtered directory walk used by `/add` to build model context.

use std::fmt;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::errors::ScanError;
use crate::files::{read_file, MAX_FILE_SIZE};

/// Stop admitting files after this many.
pub const MAX_SCANNED_FILES: usize = 1000;

/// Bytes inspected for a null byte before a file is treated as text.
pub const BINARY_PEEK_SIZE: usize = 1024;

const EXCLUDED_NAMES: &[&str] = &[
    ".DS_Store",
    "Thumbs.db",
    ".gitignore",
    ".python-version",
    "uv.lock",
    ".uv",
    "uvenv",
    ".uvenv",
    ".venv",
    "venv",
    "__pycache__",
    ".pytest_cache",
    ".coverage",
    ".mypy_cache",
    "node_modules",
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    ".next",
    ".nuxt",
    "dist",
    "build",
    ".cache",
    ".parcel-cache",
    ".turbo",
    ".vercel",
    ".output",
    ".contentlayer",
    "out",
    "coverage",
    ".nyc_output",
    "storybook-static",
    "target",
    "Cargo.lock",
    "go.sum",
    ".env",
    ".env.local",
    ".env.development",
    ".env.production",
    ".git",
    ".svn",
    ".hg",
    "CVS",
];

const EXCLUDED_EXTENSIONS: &[&str] = &[
    ".png", ".jpg", ".jpeg", ".gif", ".ico", ".svg", ".webp", ".avif", ".bmp", ".tiff",
    ".mp4", ".webm", ".mov", ".mp3", ".wav", ".ogg", ".flac",
    ".zip", ".tar", ".gz", ".tgz", ".bz2", ".xz", ".7z", ".rar",
    ".exe", ".dll", ".so", ".dylib", ".bin", ".o", ".a", ".rlib", ".class", ".jar", ".wasm",
    ".pdf", ".doc", ".docx", ".xls", ".xlsx", ".ppt", ".pptx",
    ".pyc", ".pyo", ".pyd", ".egg", ".whl",
    ".uv", ".uvenv",
    ".db", ".sqlite", ".sqlite3", ".log",
    ".idea", ".vscode",
    ".map", ".chunk.js", ".chunk.css", ".min.js", ".min.css", ".bundle.js", ".bundle.css",
    ".cache", ".tmp", ".temp",
    ".ttf", ".otf", ".woff", ".woff2", ".eot",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    HiddenDirectory,
    HiddenFile,
    ExcludedDirectory,
    ExcludedFile,
    ExcludedExtension,
    TooLarge { size: u64 },
    Binary,
    Unreadable(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::HiddenDirectory => write!(f, "hidden directory"),
            SkipReason::HiddenFile => write!(f, "hidden file"),
            SkipReason::ExcludedDirectory => write!(f, "excluded directory name"),
            SkipReason::ExcludedFile => write!(f, "excluded file name"),
            SkipReason::ExcludedExtension => write!(f, "excluded extension"),
            SkipReason::TooLarge { size } => {
                write!(f, "exceeds size limit {} > {}", size, MAX_FILE_SIZE)
            }
            SkipReason::Binary => write!(f, "binary file"),
            SkipReason::Unreadable(reason) => write!(f, "{}", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    pub path: PathBuf,
    pub reason: SkipReason,
}

impl fmt::Display for SkippedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.path.display(), self.reason)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    /// Path relative to the scan root.
    pub relative_path: PathBuf,
    pub content: String,
}

#[derive(Debug, Default)]
pub struct DirectoryScan {
    /// Admitted files in traversal order.
    pub files: Vec<ScannedFile>,
    pub skipped: Vec<SkippedEntry>,
    /// The walk stopped early at [`MAX_SCANNED_FILES`].
    pub limit_reached: bool,
}

impl DirectoryScan {
    #[cfg(test)]
    fn get(&self, relative_path: impl AsRef<Path>) -> Option<&str> {
        let relative_path = relative_path.as_ref();
        self.files
            .iter()
            .find(|f| f.relative_path == relative_path)
            .map(|f| f.content.as_str())
    }

    fn skip(&mut self, path: &Path, reason: SkipReason) {
        debug!(path = %path.display(), %reason, "skipping entry");
        self.skipped.push(SkippedEntry {
            path: path.to_path_buf(),
            reason,
        });
    }
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.') && name != "." && name != ".."
}

fn is_excluded_name(name: &str) -> bool {
    EXCLUDED_NAMES.contains(&name)
}

fn has_excluded_extension(name: &str) -> bool {
    let lower = name.to_lowercase();
    EXCLUDED_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Peek at the head of a file and report whether it contains a null byte.
pub fn is_binary_file(path: impl AsRef<Path>) -> std::io::Result<bool> {
    let mut file = File::open(path)?;
    let mut buffer = Vec::with_capacity(BINARY_PEEK_SIZE);
    file.by_ref()
        .take(BINARY_PEEK_SIZE as u64)
        .read_to_end(&mut buffer)?;
    Ok(buffer.contains(&0))
}

/// Walk `root` depth-first and collect every file that passes the exclusion policy.
///
/// Per-entry failures become skip records. Only a root that cannot be opened (or is
/// not a directory) fails the whole scan.
pub fn ingest(root: impl AsRef<Path>) -> Result<DirectoryScan, ScanError> {
    let root = root.as_ref();
    let metadata = fs::metadata(root).map_err(|source| ScanError::Root {
        path: root.to_path_buf(),
        source,
    })?;
    if !metadata.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }
    fs::read_dir(root).map_err(|source| ScanError::Root {
        path: root.to_path_buf(),
        source,
    })?;

    let mut scan = DirectoryScan::default();
    let mut walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter();

    while let Some(entry) = walker.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err.path().unwrap_or(root).to_path_buf();
                if err.depth() == 0 {
                    let source = err
                        .into_io_error()
                        .unwrap_or_else(|| std::io::Error::other("walk error"));
                    return Err(ScanError::Root { path, source });
                }
                scan.skip(&path, SkipReason::Unreadable(format!("walk error: {}", err)));
                continue;
            }
        };
        if entry.depth() == 0 {
            continue;
        }

        if scan.files.len() >= MAX_SCANNED_FILES {
            warn!(
                root = %root.display(),
                limit = MAX_SCANNED_FILES,
                "file limit reached while scanning"
            );
            scan.limit_reached = true;
            break;
        }

        let path = entry.path();
        let name = entry.file_name().to_string_lossy();

        if entry.file_type().is_dir() {
            if is_hidden(&name) {
                scan.skip(path, SkipReason::HiddenDirectory);
                walker.skip_current_dir();
            } else if is_excluded_name(&name) {
                scan.skip(path, SkipReason::ExcludedDirectory);
                walker.skip_current_dir();
            }
            continue;
        }

        if is_hidden(&name) {
            scan.skip(path, SkipReason::HiddenFile);
            continue;
        }
        if is_excluded_name(&name) {
            scan.skip(path, SkipReason::ExcludedFile);
            continue;
        }
        if has_excluded_extension(&name) {
            scan.skip(path, SkipReason::ExcludedExtension);
            continue;
        }

        let size = match entry.metadata() {
            Ok(metadata) => metadata.len(),
            Err(err) => {
                scan.skip(path, SkipReason::Unreadable(format!("stat error: {}", err)));
                continue;
            }
        };
        if size > MAX_FILE_SIZE {
            scan.skip(path, SkipReason::TooLarge { size });
            continue;
        }

        match is_binary_file(path) {
            Ok(true) => {
                scan.skip(path, SkipReason::Binary);
                continue;
            }
            Ok(false) => {}
            Err(err) => {
                scan.skip(
                    path,
                    SkipReason::Unreadable(format!("binary check error: {}", err)),
                );
                continue;
            }
        }

        let content = match read_file(path) {
            Ok(content) => content,
            Err(err) => {
                scan.skip(path, SkipReason::Unreadable(format!("read error: {}", err)));
                continue;
            }
        };

        let relative_path = path.strip_prefix(root).unwrap_or(path).to_path_buf();
        scan.files.push(ScannedFile {
            relative_path,
            content,
        });
    }

    info!(
        root = %root.display(),
        admitted = scan.files.len(),
        skipped = scan.skipped.len(),
        "directory scan complete"
    );
    Ok(scan)
}
