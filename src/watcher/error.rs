//! Watcher error types.

use std::path::PathBuf;

/// Errors that can occur while locating, subscribing to, or tailing a log file.
#[derive(thiserror::Error, Debug)]
pub enum WatcherError {
    /// Watched file was deleted.
    #[error("Watched file deleted: {0}")]
    FileDeleted(PathBuf),

    /// Permission denied accessing file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// Notify watcher error.
    #[error("File watcher error: {0}")]
    Notify(#[from] notify::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The path has no parent directory that could be watched.
    #[error("No watchable parent directory for {0}")]
    NoParent(PathBuf),

    /// No tokio runtime is available to drive a polling subscription.
    #[error("Polling subscription requires a tokio runtime")]
    NoRuntime,
}

impl WatcherError {
    /// Classify an I/O error raised while touching `path`.
    pub(crate) fn from_io(path: &std::path::Path, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::FileDeleted(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io(err),
        }
    }
}
