//! Active log file ownership and rotation.
//!
//! [`RotationWatcher`] owns the file currently being tailed together with
//! its change subscription. A re-scan that finds a newer file stops the old
//! subscription before the new one is installed, so at most one subscription
//! is live at any time.

use std::path::{Path, PathBuf};

use super::discovery::LogLocator;
use super::error::WatcherError;
use super::subscription::{ChangeNotice, FileSubscriber, NoticeSender, Subscription, SubscriptionId};
use super::tailer::LogTailer;

/// Observable state of the watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchState {
    Unwatched,
    Watching(PathBuf),
}

/// What a re-scan did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rescan {
    /// First file adopted.
    Started(PathBuf),
    /// A newer file replaced the previous one.
    Switched { from: PathBuf, to: PathBuf },
    /// The active file is still the newest.
    Unchanged,
    /// No matching file exists.
    ///
    /// `first_report` is set only for the first miss while unwatched, so the
    /// condition is surfaced once until a file shows up.
    Missing { first_report: bool },
}

/// Result of [`RotationWatcher::rescan`].
#[derive(Debug)]
pub struct RescanOutcome {
    pub change: Rescan,
    /// Set when the file was adopted but no subscription could be installed.
    pub subscription_error: Option<WatcherError>,
}

impl RescanOutcome {
    fn new(change: Rescan) -> Self {
        Self {
            change,
            subscription_error: None,
        }
    }
}

struct ActiveWatch {
    tailer: LogTailer,
    subscription: Option<Box<dyn Subscription>>,
}

/// Owns the watched file and its subscription.
pub struct RotationWatcher {
    locator: LogLocator,
    subscriber: Box<dyn FileSubscriber>,
    notices: NoticeSender,
    active: Option<ActiveWatch>,
    next_id: u64,
    missing: bool,
}

impl RotationWatcher {
    /// Create an unwatched watcher.
    ///
    /// Notices from every subscription it installs are delivered to `notices`.
    #[must_use]
    pub fn new(
        locator: LogLocator,
        subscriber: Box<dyn FileSubscriber>,
        notices: NoticeSender,
    ) -> Self {
        Self {
            locator,
            subscriber,
            notices,
            active: None,
            next_id: 0,
            missing: false,
        }
    }

    #[must_use]
    pub fn locator(&self) -> &LogLocator {
        &self.locator
    }

    #[must_use]
    pub fn state(&self) -> WatchState {
        match &self.active {
            Some(active) => WatchState::Watching(active.tailer.path().to_path_buf()),
            None => WatchState::Unwatched,
        }
    }

    /// Path of the file being tailed.
    #[must_use]
    pub fn active_path(&self) -> Option<&Path> {
        self.active.as_ref().map(|a| a.tailer.path())
    }

    /// Read offset into the active file.
    #[must_use]
    pub fn offset(&self) -> Option<u64> {
        self.active.as_ref().map(|a| a.tailer.offset())
    }

    /// Id of the live subscription, if any.
    #[must_use]
    pub fn active_subscription(&self) -> Option<SubscriptionId> {
        self.active
            .as_ref()
            .and_then(|a| a.subscription.as_ref())
            .map(|s| s.id())
    }

    /// Whether the active file has a live change subscription.
    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.active_subscription().is_some()
    }

    /// Look for the newest log file and adopt it if it differs from the
    /// active one.
    pub async fn rescan(&mut self) -> RescanOutcome {
        let Some(latest) = self.locator.find_latest() else {
            let first_report = self.active.is_none() && !self.missing;
            self.missing = true;
            if first_report {
                tracing::warn!(dir = %self.locator.dir().display(), "No log file found");
            }
            return RescanOutcome::new(Rescan::Missing { first_report });
        };
        self.missing = false;

        let previous = self.active_path().map(Path::to_path_buf);
        if previous.as_deref() == Some(latest.as_path()) {
            return RescanOutcome {
                change: Rescan::Unchanged,
                subscription_error: self.ensure_subscribed(),
            };
        }

        let subscription_error = self.adopt(latest.clone()).await;
        let change = match previous {
            Some(from) => {
                tracing::info!(from = %from.display(), to = %latest.display(), "Switched log file");
                Rescan::Switched { from, to: latest }
            }
            None => {
                tracing::info!(path = %latest.display(), "Started watching log file");
                Rescan::Started(latest)
            }
        };

        RescanOutcome {
            change,
            subscription_error,
        }
    }

    /// Read new lines in response to a change notice.
    ///
    /// Notices from retired subscriptions are ignored and yield no lines.
    ///
    /// # Errors
    ///
    /// Returns an error if the active file cannot be read.
    pub async fn handle_notice(&mut self, notice: &ChangeNotice) -> Result<Vec<String>, WatcherError> {
        if self.active_subscription() != Some(notice.subscription) {
            tracing::trace!(
                subscription = %notice.subscription,
                path = %notice.path.display(),
                "Ignoring notice from retired subscription"
            );
            return Ok(Vec::new());
        }
        self.catch_up().await
    }

    /// Read new lines from the active file without waiting for a notice.
    ///
    /// # Errors
    ///
    /// Returns an error if the active file cannot be read.
    pub async fn catch_up(&mut self) -> Result<Vec<String>, WatcherError> {
        match self.active.as_mut() {
            Some(active) => active.tailer.read_new_lines().await,
            None => Ok(Vec::new()),
        }
    }

    /// Stop the active subscription and forget the active file.
    pub fn shutdown(&mut self) {
        self.release();
        self.active = None;
    }

    fn release(&mut self) {
        if let Some(subscription) = self.active.as_mut().and_then(|a| a.subscription.take()) {
            subscription.stop();
        }
    }

    fn allocate_id(&mut self) -> SubscriptionId {
        self.next_id += 1;
        SubscriptionId(self.next_id)
    }

    async fn adopt(&mut self, path: PathBuf) -> Option<WatcherError> {
        self.release();
        self.active = None;

        let tailer = LogTailer::at_end(path).await;
        let id = self.allocate_id();
        let (subscription, error) =
            match self.subscriber.subscribe(tailer.path(), id, self.notices.clone()) {
                Ok(subscription) => (Some(subscription), None),
                Err(e) => {
                    tracing::warn!(path = %tailer.path().display(), error = %e, "Cannot subscribe, relying on re-scans");
                    (None, Some(e))
                }
            };

        tracing::debug!(path = %tailer.path().display(), offset = tailer.offset(), "Adopted log file");
        self.active = Some(ActiveWatch {
            tailer,
            subscription,
        });
        error
    }

    fn ensure_subscribed(&mut self) -> Option<WatcherError> {
        if self.active.as_ref()?.subscription.is_some() {
            return None;
        }

        let id = self.allocate_id();
        let active = self.active.as_mut()?;
        match self
            .subscriber
            .subscribe(active.tailer.path(), id, self.notices.clone())
        {
            Ok(subscription) => {
                tracing::info!(path = %active.tailer.path().display(), "Subscription re-established");
                active.subscription = Some(subscription);
                None
            }
            Err(e) => {
                tracing::debug!(path = %active.tailer.path().display(), error = %e, "Still unable to subscribe");
                Some(e)
            }
        }
    }
}

impl Drop for RotationWatcher {
    fn drop(&mut self) {
        self.release();
    }
}
