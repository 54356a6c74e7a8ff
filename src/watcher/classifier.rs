//! Log line classification.

/// Default marker for a player joining the current instance.
pub const DEFAULT_JOIN_MARKER: &str = "[Behaviour] OnPlayerEnteredRoom";

/// Default marker for a player leaving the current instance.
pub const DEFAULT_LEAVE_MARKER: &str = "[Behaviour] OnPlayerLeftRoom";

/// Event recognised in a log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogEvent {
    PlayerJoined,
    PlayerLeft,
}

impl LogEvent {
    /// Human-readable description shown to the user.
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::PlayerJoined => "A player joined",
            Self::PlayerLeft => "A player left",
        }
    }
}

impl std::fmt::Display for LogEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Maps log lines to events by substring containment.
///
/// The join marker is tested before the leave marker, so a line containing
/// both is reported as [`LogEvent::PlayerJoined`].
#[derive(Debug, Clone)]
pub struct EventClassifier {
    join_marker: String,
    leave_marker: String,
}

impl EventClassifier {
    /// Create a classifier with custom markers.
    #[must_use]
    pub fn new(join_marker: impl Into<String>, leave_marker: impl Into<String>) -> Self {
        Self {
            join_marker: join_marker.into(),
            leave_marker: leave_marker.into(),
        }
    }

    /// Classify a single line.
    #[must_use]
    pub fn classify(&self, line: &str) -> Option<LogEvent> {
        if line.contains(&self.join_marker) {
            Some(LogEvent::PlayerJoined)
        } else if line.contains(&self.leave_marker) {
            Some(LogEvent::PlayerLeft)
        } else {
            None
        }
    }
}

impl Default for EventClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_JOIN_MARKER, DEFAULT_LEAVE_MARKER)
    }
}
