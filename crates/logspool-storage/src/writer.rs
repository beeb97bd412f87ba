//! Durable file-per-event writer
//!
//! Every event becomes its own immutable file named `<uuid><suffix>`. The
//! bytes are first written under the same name with [`TEMP_MARKER`]
//! appended, synced, closed, and only then renamed into place. The rename is
//! the publish barrier: the backlog index never lists a temp name, so a drain
//! cycle running concurrently with a write can only ever see complete files.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use logspool_core::LogEvent;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::codec::EventCodec;
use crate::error::StorageError;

/// Marker appended to a file name while its content is being written
pub const TEMP_MARKER: &str = "-tmp";

/// Writes events into the backlog directory with write-then-rename
#[derive(Debug, Clone)]
pub struct DurableWriter {
    /// Backlog directory
    directory: PathBuf,
    /// Suffix of published files
    suffix: String,
    /// Codec used to turn events into bytes
    codec: Arc<dyn EventCodec>,
}

impl DurableWriter {
    /// Create a writer for `directory`, naming files `<uuid><suffix>`
    pub fn new(
        directory: impl Into<PathBuf>,
        suffix: impl Into<String>,
        codec: Arc<dyn EventCodec>,
    ) -> Self {
        Self {
            directory: directory.into(),
            suffix: suffix.into(),
            codec,
        }
    }

    /// The backlog directory
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Persist one event and return the path it was published under
    ///
    /// The directory (and its parents) is created on every call, since it
    /// may have been removed while the writer was running.
    ///
    /// # Errors
    ///
    /// Returns an error if the event cannot be encoded, written, or renamed.
    /// In every error case no file with the final name exists.
    pub async fn persist(&self, event: &LogEvent) -> Result<PathBuf, StorageError> {
        self.persist_as(event, &self.next_file_name()).await
    }

    async fn persist_as(&self, event: &LogEvent, file_name: &str) -> Result<PathBuf, StorageError> {
        tokio::fs::create_dir_all(&self.directory).await?;

        let bytes = self.codec.encode(event)?;
        let final_path = self.directory.join(file_name);
        let temp_path = temp_path_for(&final_path);

        if let Err(e) = write_synced(&temp_path, &bytes).await {
            discard_temp(&temp_path).await;
            return Err(e);
        }

        if let Err(e) = tokio::fs::rename(&temp_path, &final_path).await {
            discard_temp(&temp_path).await;
            return Err(StorageError::Publish {
                from: temp_path,
                to: final_path,
                reason: e.to_string(),
            });
        }

        trace!(path = %final_path.display(), size = bytes.len(), "Persisted event");
        Ok(final_path)
    }

    /// Delete temp files left behind by an unclean shutdown
    ///
    /// Returns the number of files removed. A missing directory is not an
    /// error; individual failures are logged and skipped.
    pub async fn remove_stale_temp_files(&self) -> usize {
        let mut entries = match tokio::fs::read_dir(&self.directory).await {
            Ok(entries) => entries,
            Err(e) => {
                debug!(
                    path = %self.directory.display(),
                    error = %e,
                    "No backlog directory to clean"
                );
                return 0;
            }
        };

        let mut removed = 0;
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "Failed to read backlog directory entry");
                    break;
                }
            };

            let is_temp = entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.ends_with(TEMP_MARKER));
            let is_file = entry
                .file_type()
                .await
                .map(|kind| kind.is_file())
                .unwrap_or(false);
            if !is_temp || !is_file {
                continue;
            }

            let path = entry.path();
            match tokio::fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) => warn!(path = %path.display(), error = %e, "Could not remove stale temp file"),
            }
        }

        if removed > 0 {
            info!(removed, path = %self.directory.display(), "Removed stale temp files");
        }
        removed
    }

    fn next_file_name(&self) -> String {
        format!("{}{}", Uuid::new_v4(), self.suffix)
    }
}

/// Name under which `final_path` is written before being published
pub fn temp_path_for(final_path: &Path) -> PathBuf {
    let mut name = OsString::from(final_path.as_os_str());
    name.push(TEMP_MARKER);
    PathBuf::from(name)
}

/// Write `bytes` to a fresh file and make them durable
///
/// The handle is owned by this scope and closed when it returns, on the
/// success path and on every error path alike.
async fn write_synced(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let mut file = File::create(path).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await?;
    Ok(())
}

async fn discard_temp(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        debug!(path = %path.display(), error = %e, "Could not remove unpublished temp file");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::PostcardCodec;
    use logspool_core::Level;
    use tempfile::TempDir;

    fn writer(dir: &Path) -> DurableWriter {
        DurableWriter::new(dir, ".ser", Arc::new(PostcardCodec))
    }

    fn file_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_persist_publishes_final_name() {
        let temp = TempDir::new().unwrap();
        let writer = writer(temp.path());
        let event = LogEvent::new(Level::Info, "app", "hello");

        let path = writer.persist(&event).await.unwrap();

        assert!(path.exists());
        assert!(path.to_string_lossy().ends_with(".ser"));
        let names = file_names(temp.path());
        assert_eq!(names.len(), 1);
        assert!(!names[0].ends_with(TEMP_MARKER));

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(PostcardCodec.decode(&bytes).unwrap(), event);
    }

    #[tokio::test]
    async fn test_persist_creates_missing_directories() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("a").join("b").join("spool");
        let writer = writer(&nested);

        writer
            .persist(&LogEvent::new(Level::Info, "app", "first"))
            .await
            .unwrap();
        assert_eq!(file_names(&nested).len(), 1);

        // Directory removed underneath a running writer
        std::fs::remove_dir_all(&nested).unwrap();
        writer
            .persist(&LogEvent::new(Level::Info, "app", "second"))
            .await
            .unwrap();
        assert_eq!(file_names(&nested).len(), 1);
    }

    #[tokio::test]
    async fn test_every_event_gets_its_own_file() {
        let temp = TempDir::new().unwrap();
        let writer = writer(temp.path());

        for i in 0..20 {
            writer
                .persist(&LogEvent::new(Level::Info, "app", format!("event {i}")))
                .await
                .unwrap();
        }

        assert_eq!(file_names(temp.path()).len(), 20);
    }

    #[tokio::test]
    async fn test_failed_write_publishes_nothing() {
        let temp = TempDir::new().unwrap();
        // A regular file where the directory should be
        let blocker = temp.path().join("spool");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let writer = writer(&blocker);

        let result = writer
            .persist(&LogEvent::new(Level::Error, "app", "lost"))
            .await;

        assert!(matches!(result, Err(StorageError::Io(_))));
        assert_eq!(file_names(temp.path()), vec!["spool".to_string()]);
    }

    #[derive(Debug)]
    struct RefusingCodec;

    impl EventCodec for RefusingCodec {
        fn encode(&self, _event: &LogEvent) -> Result<Vec<u8>, StorageError> {
            Err(StorageError::serialization("field cannot be encoded"))
        }

        fn decode(&self, _bytes: &[u8]) -> Result<LogEvent, StorageError> {
            Err(StorageError::deserialization("nothing to decode"))
        }
    }

    #[tokio::test]
    async fn test_encode_failure_writes_nothing() {
        let temp = TempDir::new().unwrap();
        let writer = DurableWriter::new(temp.path(), ".ser", Arc::new(RefusingCodec));

        let result = writer
            .persist(&LogEvent::new(Level::Info, "app", "unencodable"))
            .await;

        assert!(matches!(result, Err(StorageError::Serialization(_))));
        assert!(file_names(temp.path()).is_empty());
    }

    #[tokio::test]
    async fn test_rename_failure_discards_temp_file() {
        let temp = TempDir::new().unwrap();
        let writer = writer(temp.path());
        // A directory already occupies the final name
        std::fs::create_dir(temp.path().join("taken.ser")).unwrap();

        let result = writer
            .persist_as(&LogEvent::new(Level::Warn, "app", "blocked"), "taken.ser")
            .await;

        match result {
            Err(StorageError::Publish { from, to, .. }) => {
                assert_eq!(from, temp.path().join("taken.ser-tmp"));
                assert_eq!(to, temp.path().join("taken.ser"));
            }
            other => panic!("expected a publish error, got {other:?}"),
        }
        assert_eq!(file_names(temp.path()), vec!["taken.ser".to_string()]);
        assert!(temp.path().join("taken.ser").is_dir());
    }

    #[tokio::test]
    async fn test_remove_stale_temp_files() {
        let temp = TempDir::new().unwrap();
        let writer = writer(temp.path());
        let kept = writer
            .persist(&LogEvent::new(Level::Info, "app", "kept"))
            .await
            .unwrap();

        std::fs::write(temp.path().join("a.ser-tmp"), b"partial").unwrap();
        std::fs::write(temp.path().join("b.ser-tmp"), b"").unwrap();
        std::fs::write(temp.path().join("notes.txt"), b"foreign").unwrap();
        std::fs::create_dir(temp.path().join("dir-tmp")).unwrap();

        assert_eq!(writer.remove_stale_temp_files().await, 2);

        let names = file_names(temp.path());
        assert!(names.contains(&"notes.txt".to_string()));
        assert!(names.contains(&"dir-tmp".to_string()));
        assert!(kept.exists());
        assert!(!names.iter().any(|n| n.ends_with(".ser-tmp")));
    }

    #[tokio::test]
    async fn test_remove_stale_temp_files_without_directory() {
        let temp = TempDir::new().unwrap();
        let writer = writer(&temp.path().join("missing"));
        assert_eq!(writer.remove_stale_temp_files().await, 0);
    }

    #[test]
    fn test_temp_path_for() {
        let path = temp_path_for(Path::new("/spool/abc.ser"));
        assert_eq!(path, PathBuf::from("/spool/abc.ser-tmp"));
    }
}
