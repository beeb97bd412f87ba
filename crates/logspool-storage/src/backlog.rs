//! Backlog listing
//!
//! The backlog is whatever published event files sit in the directory. The
//! index lists them oldest first by modification time, which doubles as the
//! creation time because published files are never written again.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::debug;

use crate::writer::TEMP_MARKER;

/// One published, not yet delivered event file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEvent {
    path: PathBuf,
    modified: SystemTime,
}

impl PendingEvent {
    /// Create an entry for `path` last modified at `modified`
    pub fn new(path: impl Into<PathBuf>, modified: SystemTime) -> Self {
        Self {
            path: path.into(),
            modified,
        }
    }

    /// Full path of the file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name, if it is valid UTF-8
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|name| name.to_str())
    }

    /// Read the encoded event
    pub async fn read(&self) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(&self.path).await
    }
}

/// Lists the pending event files of one backlog directory
#[derive(Debug, Clone)]
pub struct BacklogIndex {
    directory: PathBuf,
    suffix: String,
}

impl BacklogIndex {
    /// Create an index over `directory` for files ending in `suffix`
    pub fn new(directory: impl Into<PathBuf>, suffix: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            suffix: suffix.into(),
        }
    }

    /// The backlog directory
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Whether a directory entry name belongs to this backlog
    pub fn matches(&self, name: &str) -> bool {
        name.ends_with(&self.suffix) && !name.ends_with(TEMP_MARKER)
    }

    /// All pending events, oldest first
    ///
    /// Ties on modification time are broken by file name so one listing is
    /// deterministic. A missing or unreadable directory yields an empty list.
    /// Subdirectories, temp files and files with another suffix are skipped.
    pub async fn list(&self) -> Vec<PendingEvent> {
        let mut entries = match tokio::fs::read_dir(&self.directory).await {
            Ok(entries) => entries,
            Err(e) => {
                debug!(
                    path = %self.directory.display(),
                    error = %e,
                    "Backlog directory not readable, treating as empty"
                );
                return Vec::new();
            }
        };

        let mut pending = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    debug!(error = %e, "Stopped listing backlog on unreadable entry");
                    break;
                }
            };

            let matches = entry
                .file_name()
                .to_str()
                .is_some_and(|name| self.matches(name));
            if !matches {
                continue;
            }

            let path = entry.path();
            let metadata = match entry.metadata().await {
                Ok(metadata) => metadata,
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "Skipping entry without metadata");
                    continue;
                }
            };
            if !metadata.is_file() {
                continue;
            }

            let modified = match metadata.modified() {
                Ok(modified) => modified,
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "Skipping entry without mtime");
                    continue;
                }
            };

            pending.push(PendingEvent::new(path, modified));
        }

        pending.sort_by(|a, b| {
            a.modified
                .cmp(&b.modified)
                .then_with(|| a.path.cmp(&b.path))
        });
        pending
    }
}
