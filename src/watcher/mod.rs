//! Log watching: discovery, tailing, classification and rotation.

mod classifier;
mod discovery;
mod error;
mod rotation;
mod subscription;
mod tailer;

pub use classifier::{EventClassifier, LogEvent, DEFAULT_JOIN_MARKER, DEFAULT_LEAVE_MARKER};
pub use discovery::LogLocator;
pub use error::WatcherError;
pub use rotation::{Rescan, RescanOutcome, RotationWatcher, WatchState};
pub use subscription::{
    ChangeNotice, FileSubscriber, NoticeSender, NotifySubscriber, PollingSubscriber, Subscription,
    SubscriptionId,
};
pub use tailer::LogTailer;
