//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::watcher::{DEFAULT_JOIN_MARKER, DEFAULT_LEAVE_MARKER};

use super::ConfigError;

/// OSC endpoint and parameter addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OscConfig {
    pub host: String,
    pub port: u16,
    /// Pulsed when a player joins.
    pub join_address: String,
    /// Pulsed when a player leaves.
    pub leave_address: String,
    /// Receives the current hour (0-23).
    pub hours_address: String,
    /// Receives the current minute (0-59).
    pub minutes_address: String,
    /// Time between the `true` and `false` halves of a pulse.
    pub pulse_hold_ms: u64,
}

impl Default for OscConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9000,
            join_address: "/avatar/parameters/PmmaOSC/Notification1".to_string(),
            leave_address: "/avatar/parameters/PmmaOSC/Notification2".to_string(),
            hours_address: "/avatar/parameters/PmmaOSC/TimeHours".to_string(),
            minutes_address: "/avatar/parameters/PmmaOSC/TimeMinutes".to_string(),
            pulse_hold_ms: 50,
        }
    }
}

impl OscConfig {
    #[must_use]
    pub fn pulse_hold(&self) -> Duration {
        Duration::from_millis(self.pulse_hold_ms)
    }

    /// `host:port` for display.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Substrings that identify events in a log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerConfig {
    pub join: String,
    pub leave: String,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            join: DEFAULT_JOIN_MARKER.to_string(),
            leave: DEFAULT_LEAVE_MARKER.to_string(),
        }
    }
}

/// How file changes are observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WatchMode {
    /// Native filesystem notifications.
    #[default]
    Notify,
    /// Periodic size/mtime polling.
    Poll,
}

/// Timing of the watch and display loops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub mode: WatchMode,
    /// Debounce window for native notifications.
    pub debounce_ms: u64,
    /// Interval of the polling fallback.
    pub poll_interval_ms: u64,
    /// How often the terminal display drains its queue.
    pub display_poll_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            mode: WatchMode::Notify,
            debounce_ms: 50,
            poll_interval_ms: 250,
            display_poll_ms: 50,
        }
    }
}

impl WatchConfig {
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    #[must_use]
    pub fn display_poll(&self) -> Duration {
        Duration::from_millis(self.display_poll_ms)
    }
}

/// Top-level relay configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Directory containing the log files.
    pub log_dir: PathBuf,
    pub file_prefix: String,
    pub file_suffix: String,
    pub osc: OscConfig,
    pub markers: MarkerConfig,
    pub watch: WatchConfig,
}

/// `%APPDATA%\..\LocalLow\VRChat\VRChat`, derived from the local data dir.
#[must_use]
pub fn default_log_dir() -> PathBuf {
    let local_low = dirs::data_local_dir()
        .and_then(|local| local.parent().map(|appdata| appdata.join("LocalLow")))
        .unwrap_or_else(|| PathBuf::from("LocalLow"));
    local_low.join("VRChat").join("VRChat")
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            file_prefix: "output_log_".to_string(),
            file_suffix: ".txt".to_string(),
            osc: OscConfig::default(),
            markers: MarkerConfig::default(),
            watch: WatchConfig::default(),
        }
    }
}

impl RelayConfig {
    /// Reject settings the relay cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(field: &str, reason: &str) -> Result<(), ConfigError> {
            Err(ConfigError::Invalid {
                field: field.to_string(),
                reason: reason.to_string(),
            })
        }

        if self.file_prefix.is_empty() && self.file_suffix.is_empty() {
            return invalid("file_prefix", "prefix and suffix cannot both be empty");
        }
        if self.osc.host.trim().is_empty() {
            return invalid("osc.host", "must not be empty");
        }
        if self.osc.port == 0 {
            return invalid("osc.port", "must be non-zero");
        }
        for (field, address) in [
            ("osc.join_address", &self.osc.join_address),
            ("osc.leave_address", &self.osc.leave_address),
            ("osc.hours_address", &self.osc.hours_address),
            ("osc.minutes_address", &self.osc.minutes_address),
        ] {
            if !address.starts_with('/') {
                return invalid(field, "OSC addresses must start with '/'");
            }
        }
        if self.osc.pulse_hold_ms == 0 {
            return invalid("osc.pulse_hold_ms", "must be non-zero");
        }
        if self.markers.join.is_empty() {
            return invalid("markers.join", "must not be empty");
        }
        if self.markers.leave.is_empty() {
            return invalid("markers.leave", "must not be empty");
        }
        for (field, value) in [
            ("watch.debounce_ms", self.watch.debounce_ms),
            ("watch.poll_interval_ms", self.watch.poll_interval_ms),
            ("watch.display_poll_ms", self.watch.display_poll_ms),
        ] {
            if value == 0 {
                return invalid(field, "must be non-zero");
            }
        }
        Ok(())
    }
}
