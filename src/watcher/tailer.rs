//! Incremental log file tailer.
//!
//! Reads complete lines appended to a log file since the last read.

use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use super::error::WatcherError;

/// Incremental line reader that tracks a byte offset into one file.
///
/// The offset only ever points just past a newline, so a line that is still
/// being written is left for a later read instead of being split in two.
#[derive(Debug)]
pub struct LogTailer {
    /// Path to the log file.
    path: PathBuf,
    /// Byte offset of the first unread byte.
    offset: u64,
}

impl LogTailer {
    /// Create a tailer starting at a specific offset.
    #[must_use]
    pub fn with_offset(path: PathBuf, offset: u64) -> Self {
        Self { path, offset }
    }

    /// Create a tailer positioned at the current end of the file.
    ///
    /// Content already in the file is never replayed. A file that cannot be
    /// inspected starts at offset 0.
    pub async fn at_end(path: PathBuf) -> Self {
        let offset = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata.len(),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Cannot stat log file, starting at 0");
                0
            }
        };
        Self { path, offset }
    }

    /// Get the current byte offset.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Get the path being tailed.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read complete lines appended since the last read.
    ///
    /// Lines are decoded lossily, trimmed, and returned in file order. Blank
    /// lines are dropped. Bytes after the final newline are not consumed.
    ///
    /// If the file shrank below the current offset it was rewritten in place,
    /// and reading restarts from the beginning.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or read. The offset is
    /// left unchanged so nothing is lost on the next attempt.
    pub async fn read_new_lines(&mut self) -> Result<Vec<String>, WatcherError> {
        let mut file = File::open(&self.path)
            .await
            .map_err(|e| WatcherError::from_io(&self.path, e))?;

        let file_len = file.metadata().await?.len();

        let mut start = self.offset;
        if file_len < start {
            tracing::warn!(
                path = %self.path.display(),
                old_offset = start,
                new_len = file_len,
                "Log file truncated, resetting offset to 0"
            );
            start = 0;
        }

        if file_len == start {
            self.offset = start;
            return Ok(Vec::new());
        }

        file.seek(std::io::SeekFrom::Start(start)).await?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf).await?;

        let Some(last_newline) = buf.iter().rposition(|b| *b == b'\n') else {
            // Only a partial line so far.
            self.offset = start;
            return Ok(Vec::new());
        };

        let complete = &buf[..=last_newline];
        let lines = String::from_utf8_lossy(complete)
            .split('\n')
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect();

        self.offset = start + complete.len() as u64;
        Ok(lines)
    }
}
