//! Log file discovery.
//!
//! Locates the most recently modified log file in the configured directory.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Finds log files named `<prefix>*<suffix>` inside a single directory.
#[derive(Debug, Clone)]
pub struct LogLocator {
    dir: PathBuf,
    prefix: String,
    suffix: String,
}

impl LogLocator {
    /// Create a locator for `dir` matching `prefix*suffix`.
    #[must_use]
    pub fn new(dir: PathBuf, prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            dir,
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    /// Directory being scanned.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Check whether a bare file name matches the configured pattern.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::path::PathBuf;
    /// use vrc_log_relay::watcher::LogLocator;
    ///
    /// let locator = LogLocator::new(PathBuf::from("."), "output_log_", ".txt");
    /// assert!(locator.matches_pattern("output_log_2026-01-01_12-00-00.txt"));
    /// assert!(!locator.matches_pattern("output_log_1.log"));
    /// ```
    #[must_use]
    pub fn matches_pattern(&self, file_name: &str) -> bool {
        file_name.len() >= self.prefix.len() + self.suffix.len()
            && file_name.starts_with(&self.prefix)
            && file_name.ends_with(&self.suffix)
    }

    /// Find the matching file with the most recent modification time.
    ///
    /// Returns `None` if the directory is missing or unreadable, or if no
    /// file matches. Equal modification times are broken by file name so the
    /// result of a single scan is deterministic.
    #[must_use]
    pub fn find_latest(&self) -> Option<PathBuf> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!(dir = %self.dir.display(), error = %e, "Log directory not readable");
                return None;
            }
        };

        entries
            .filter_map(Result::ok)
            .filter(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| self.matches_pattern(name))
            })
            .filter_map(|entry| {
                let metadata = entry.metadata().ok()?;
                if !metadata.is_file() {
                    return None;
                }
                let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
                Some((modified, entry.file_name(), entry.path()))
            })
            .max_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)))
            .map(|(_, _, path)| path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn locator(dir: &Path) -> LogLocator {
        LogLocator::new(dir.to_path_buf(), "output_log_", ".txt")
    }

    fn set_mtime(path: &Path, secs_after_epoch: u64) {
        let file = std::fs::OpenOptions::new().write(true).open(path).unwrap();
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs_after_epoch))
            .unwrap();
    }

    #[test]
    fn test_matches_pattern() {
        let loc = locator(Path::new("/tmp"));
        assert!(loc.matches_pattern("output_log_1.txt"));
        assert!(loc.matches_pattern("output_log_.txt"));
        assert!(!loc.matches_pattern("output_log.txt"));
        assert!(!loc.matches_pattern("output_log_1.txt.bak"));
        assert!(!loc.matches_pattern("player_log_1.txt"));
    }

    #[test]
    fn test_overlapping_prefix_and_suffix_do_not_match_short_names() {
        let loc = LogLocator::new(PathBuf::from("/tmp"), "log", "log");
        assert!(!loc.matches_pattern("log"));
        assert!(loc.matches_pattern("loglog"));
    }

    #[test]
    fn test_find_latest_missing_dir() {
        let loc = locator(Path::new("/nonexistent/vrc-log-relay-12345"));
        assert!(loc.find_latest().is_none());
    }

    #[test]
    fn test_find_latest_empty_dir() {
        let temp_dir = TempDir::new().unwrap();
        assert!(locator(temp_dir.path()).find_latest().is_none());
    }

    #[test]
    fn test_find_latest_ignores_non_matching() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("readme.txt"), "hello").unwrap();
        std::fs::write(temp_dir.path().join("output_log_1.log"), "x").unwrap();
        std::fs::create_dir(temp_dir.path().join("output_log_dir.txt")).unwrap();

        assert!(locator(temp_dir.path()).find_latest().is_none());
    }

    #[test]
    fn test_find_latest_picks_newest_mtime() {
        let temp_dir = TempDir::new().unwrap();
        let older = temp_dir.path().join("output_log_2.txt");
        let newer = temp_dir.path().join("output_log_1.txt");
        std::fs::write(&older, "old").unwrap();
        std::fs::write(&newer, "new").unwrap();
        set_mtime(&older, 1_000);
        set_mtime(&newer, 2_000);

        assert_eq!(locator(temp_dir.path()).find_latest(), Some(newer));
    }

    #[test]
    fn test_find_latest_tie_is_deterministic() {
        let temp_dir = TempDir::new().unwrap();
        let a = temp_dir.path().join("output_log_a.txt");
        let b = temp_dir.path().join("output_log_b.txt");
        std::fs::write(&a, "").unwrap();
        std::fs::write(&b, "").unwrap();
        set_mtime(&a, 5_000);
        set_mtime(&b, 5_000);

        let loc = locator(temp_dir.path());
        let first = loc.find_latest();
        assert_eq!(first, Some(b));
        assert_eq!(loc.find_latest(), first);
    }
}
