//! Filesystem change subscriptions.
//!
//! A subscription delivers [`ChangeNotice`]s for one file into a tokio
//! channel. Native notifications come from `notify-debouncer-full`; hosts
//! without them can use the polling implementation.

use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use notify_debouncer_full::{
    new_debouncer,
    notify::{EventKind, RecommendedWatcher, RecursiveMode},
    DebounceEventResult, Debouncer, RecommendedCache,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::error::WatcherError;

/// Identifies one subscription for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// "This path changed", tagged with the subscription that observed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeNotice {
    pub subscription: SubscriptionId,
    pub path: PathBuf,
}

/// Sender half used by subscriptions to deliver notices.
pub type NoticeSender = mpsc::UnboundedSender<ChangeNotice>;

/// Creates subscriptions for single files.
pub trait FileSubscriber: Send {
    /// Start delivering change notices for `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying watch mechanism cannot be set up.
    fn subscribe(
        &self,
        path: &Path,
        id: SubscriptionId,
        notices: NoticeSender,
    ) -> Result<Box<dyn Subscription>, WatcherError>;
}

/// A live subscription handle.
pub trait Subscription: Send {
    fn id(&self) -> SubscriptionId;

    fn path(&self) -> &Path;

    /// Stop delivering notices and release the underlying watch.
    ///
    /// Returns within a bounded time; in-flight notices may still be queued
    /// and are recognisable by their stale [`SubscriptionId`].
    fn stop(self: Box<Self>);
}

/// Native filesystem notifications via `notify-debouncer-full`.
#[derive(Debug, Clone)]
pub struct NotifySubscriber {
    debounce: Duration,
}

impl NotifySubscriber {
    #[must_use]
    pub fn new(debounce: Duration) -> Self {
        Self { debounce }
    }
}

impl FileSubscriber for NotifySubscriber {
    fn subscribe(
        &self,
        path: &Path,
        id: SubscriptionId,
        notices: NoticeSender,
    ) -> Result<Box<dyn Subscription>, WatcherError> {
        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| WatcherError::NoParent(path.to_path_buf()))?;
        let file_name = path
            .file_name()
            .ok_or_else(|| WatcherError::NoParent(path.to_path_buf()))?
            .to_os_string();

        let target = path.to_path_buf();
        let notice_path = target.clone();

        // Watch the directory; some writers replace the file instead of appending.
        let mut debouncer = new_debouncer(self.debounce, None, move |result: DebounceEventResult| {
            match result {
                Ok(events) => {
                    let touched = events.iter().any(|event| {
                        matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_))
                            && event
                                .paths
                                .iter()
                                .any(|p| p.file_name() == Some(file_name.as_os_str()))
                    });
                    if touched {
                        let _ = notices.send(ChangeNotice {
                            subscription: id,
                            path: notice_path.clone(),
                        });
                    }
                }
                Err(errors) => {
                    for error in errors {
                        tracing::warn!(subscription = %id, error = %error, "File watcher error");
                    }
                }
            }
        })?;

        debouncer.watch(parent, RecursiveMode::NonRecursive)?;
        tracing::debug!(subscription = %id, path = %target.display(), "Native watch installed");

        Ok(Box::new(NotifySubscription {
            id,
            path: target,
            debouncer,
        }))
    }
}

struct NotifySubscription {
    id: SubscriptionId,
    path: PathBuf,
    debouncer: Debouncer<RecommendedWatcher, RecommendedCache>,
}

impl Subscription for NotifySubscription {
    fn id(&self) -> SubscriptionId {
        self.id
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn stop(self: Box<Self>) {
        let Self { id, debouncer, .. } = *self;
        // Blocks the calling task until the debouncer thread is joined. The
        // thread wakes at least once per debounce tick, so the wait is bounded.
        debouncer.stop();
        tracing::debug!(subscription = %id, "Native watch stopped");
    }
}

/// Fallback that polls file size and modification time.
#[derive(Debug, Clone)]
pub struct PollingSubscriber {
    interval: Duration,
}

impl PollingSubscriber {
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

type Fingerprint = Option<(u64, Option<SystemTime>)>;

fn fingerprint(metadata: io::Result<Metadata>) -> Fingerprint {
    metadata.ok().map(|m| (m.len(), m.modified().ok()))
}

impl FileSubscriber for PollingSubscriber {
    fn subscribe(
        &self,
        path: &Path,
        id: SubscriptionId,
        notices: NoticeSender,
    ) -> Result<Box<dyn Subscription>, WatcherError> {
        let handle = tokio::runtime::Handle::try_current().map_err(|_| WatcherError::NoRuntime)?;

        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let target = path.to_path_buf();
        let poll_path = target.clone();
        let interval = self.interval;
        // Baseline taken before returning so an append racing the first poll
        // is still seen as a change.
        let mut last = fingerprint(std::fs::metadata(&target));

        let task = handle.spawn(async move {
            loop {
                tokio::select! {
                    () = task_cancel.cancelled() => break,
                    () = tokio::time::sleep(interval) => {}
                }

                let current = fingerprint(tokio::fs::metadata(&poll_path).await);
                if current != last {
                    last = current;
                    if current.is_some() && !task_cancel.is_cancelled() {
                        let notice = ChangeNotice {
                            subscription: id,
                            path: poll_path.clone(),
                        };
                        if notices.send(notice).is_err() {
                            break;
                        }
                    }
                }
            }
        });

        tracing::debug!(subscription = %id, path = %target.display(), interval = ?interval, "Polling watch installed");

        Ok(Box::new(PollingSubscription {
            id,
            path: target,
            cancel,
            task,
        }))
    }
}

struct PollingSubscription {
    id: SubscriptionId,
    path: PathBuf,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl Subscription for PollingSubscription {
    fn id(&self) -> SubscriptionId {
        self.id
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn stop(self: Box<Self>) {
        self.cancel.cancel();
        self.task.abort();
        tracing::debug!(subscription = %self.id, "Polling watch stopped");
    }
}
