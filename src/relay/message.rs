//! Messages delivered to the consumer.

use std::path::{Path, PathBuf};

use tokio::sync::mpsc;

use crate::clock::TimeOfDay;
use crate::watcher::LogEvent;

/// Textual marker prefixed to error messages.
pub const ERROR_MARKER: &str = "[ERROR]";

/// Something the consumer should show to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayMessage {
    /// A join or leave was detected in the log.
    Event(LogEvent),
    /// Monitoring started on the given file.
    MonitoringStarted(PathBuf),
    /// A newer log file replaced the watched one.
    Switched { to: PathBuf },
    /// The current time was sent.
    Clock(TimeOfDay),
    /// No log file matched in the directory.
    LogNotFound { dir: PathBuf },
    /// Reading the watched file failed; the read offset was kept.
    ReadFailed(String),
    /// The file could not be subscribed to; re-scans are used instead.
    SubscribeFailed(String),
}

impl RelayMessage {
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Self::LogNotFound { .. } | Self::ReadFailed(_) | Self::SubscribeFailed(_)
        )
    }
}

fn file_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    )
}

impl std::fmt::Display for RelayMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Event(event) => f.write_str(event.message()),
            Self::MonitoringStarted(path) => write!(f, "Watching log: {}", file_name(path)),
            Self::Switched { to } => {
                write!(f, "New log file detected, switched to {}", file_name(to))
            }
            Self::Clock(time) => write!(f, "Time sent: {time}"),
            Self::LogNotFound { dir } => {
                write!(f, "{ERROR_MARKER} No log file found in {}", dir.display())
            }
            Self::ReadFailed(reason) => {
                write!(f, "{ERROR_MARKER} Failed to read log file: {reason}")
            }
            Self::SubscribeFailed(reason) => write!(
                f,
                "{ERROR_MARKER} Cannot watch log file, using periodic scans: {reason}"
            ),
        }
    }
}

/// Producer side of the consumer queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct MessageQueue {
    tx: mpsc::UnboundedSender<RelayMessage>,
}

/// Consumer side of the queue.
#[derive(Debug)]
pub struct MessageDrain {
    rx: mpsc::UnboundedReceiver<RelayMessage>,
}

/// Create a connected queue pair.
#[must_use]
pub fn message_queue() -> (MessageQueue, MessageDrain) {
    let (tx, rx) = mpsc::unbounded_channel();
    (MessageQueue { tx }, MessageDrain { rx })
}

impl MessageQueue {
    /// Enqueue a message. Dropped silently once the consumer is gone.
    pub fn push(&self, message: RelayMessage) {
        if self.tx.send(message).is_err() {
            tracing::trace!("Message consumer gone, dropping message");
        }
    }
}

impl MessageDrain {
    /// Take everything queued so far without waiting.
    pub fn drain(&mut self) -> Vec<RelayMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = self.rx.try_recv() {
            messages.push(message);
        }
        messages
    }

    /// Wait for the next message. `None` once every producer is dropped.
    pub async fn recv(&mut self) -> Option<RelayMessage> {
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            RelayMessage::Event(LogEvent::PlayerJoined).to_string(),
            "A player joined"
        );
        assert_eq!(
            RelayMessage::MonitoringStarted(PathBuf::from("/logs/output_log_1.txt")).to_string(),
            "Watching log: output_log_1.txt"
        );
        assert_eq!(
            RelayMessage::Switched {
                to: PathBuf::from("/logs/output_log_2.txt")
            }
            .to_string(),
            "New log file detected, switched to output_log_2.txt"
        );
        assert_eq!(
            RelayMessage::Clock(TimeOfDay { hour: 9, minute: 3 }).to_string(),
            "Time sent: 09:03"
        );
        assert!(RelayMessage::ReadFailed("gone".to_string())
            .to_string()
            .starts_with("[ERROR] "));
    }

    #[test]
    fn test_is_error() {
        assert!(RelayMessage::LogNotFound {
            dir: PathBuf::from("/x")
        }
        .is_error());
        assert!(RelayMessage::SubscribeFailed("x".to_string()).is_error());
        assert!(!RelayMessage::Event(LogEvent::PlayerLeft).is_error());
        assert!(!RelayMessage::Clock(TimeOfDay { hour: 0, minute: 0 }).is_error());
    }

    #[test]
    fn test_queue_drain_preserves_order() {
        let (queue, mut drain) = message_queue();
        assert!(drain.drain().is_empty());

        queue.push(RelayMessage::Event(LogEvent::PlayerJoined));
        queue.clone().push(RelayMessage::Event(LogEvent::PlayerLeft));

        assert_eq!(
            drain.drain(),
            vec![
                RelayMessage::Event(LogEvent::PlayerJoined),
                RelayMessage::Event(LogEvent::PlayerLeft),
            ]
        );
        assert!(drain.drain().is_empty());
    }

    #[test]
    fn test_push_after_consumer_dropped() {
        let (queue, drain) = message_queue();
        drop(drain);
        queue.push(RelayMessage::ReadFailed("ignored".to_string()));
    }

    #[tokio::test]
    async fn test_queue_is_usable_across_threads() {
        let (queue, mut drain) = message_queue();
        let handle = std::thread::spawn(move || {
            queue.push(RelayMessage::Event(LogEvent::PlayerJoined));
        });
        handle.join().unwrap();
        assert_eq!(
            drain.recv().await,
            Some(RelayMessage::Event(LogEvent::PlayerJoined))
        );
        assert_eq!(drain.recv().await, None);
    }
}
