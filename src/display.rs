//! Colored terminal output for relay messages.
//!
//! The display owns the consumer end of the message queue and drains it on
//! its own interval, independent of the relay task.

use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

use chrono::Local;
use owo_colors::OwoColorize;
use tokio_util::sync::CancellationToken;

use crate::relay::{MessageDrain, RelayMessage};
use crate::watcher::LogEvent;

/// Maximum length of a printed error message.
const MAX_ERROR_LEN: usize = 200;

/// Local wall-clock prefix, e.g. `[21:04:11] `.
fn timestamp() -> String {
    Local::now().format("[%H:%M:%S] ").to_string()
}

/// Truncate a string to a maximum length, adding ellipsis if truncated.
#[must_use]
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        "...".to_string()
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{kept}...")
    }
}

/// Plain-text rendering of a message without timestamp or color.
#[must_use]
pub fn format_message(message: &RelayMessage) -> String {
    let text = message.to_string();
    if message.is_error() {
        truncate(&text, MAX_ERROR_LEN)
    } else {
        text
    }
}

/// Print one message with a timestamp prefix.
pub fn print_message(message: &RelayMessage) {
    let text = format_message(message);
    let ts = timestamp();
    match message {
        RelayMessage::Event(LogEvent::PlayerJoined) => {
            println!("{}{}", ts.dimmed(), text.green().bold());
        }
        RelayMessage::Event(LogEvent::PlayerLeft) => {
            println!("{}{}", ts.dimmed(), text.yellow().bold());
        }
        RelayMessage::MonitoringStarted(_) | RelayMessage::Switched { .. } => {
            println!("{}{}", ts.dimmed(), text.blue());
        }
        RelayMessage::Clock(time) => {
            println!("{}{} {}", ts.dimmed(), "[CLOCK]".cyan().bold(), time);
        }
        _ if message.is_error() => println!("{}{}", ts.dimmed(), text.red()),
        _ => println!("{ts}{text}"),
    }
    let _ = io::stdout().flush();
}

/// Print the startup banner.
pub fn print_banner(endpoint: &str, log_dir: &Path) {
    println!("{} {}", "OSC:".bold(), endpoint.cyan());
    println!("{} {}", "Logs:".bold(), log_dir.display().dimmed());
    let _ = io::stdout().flush();
}

fn print_batch(drain: &mut MessageDrain) -> usize {
    let batch = drain.drain();
    for message in &batch {
        print_message(message);
    }
    batch.len()
}

/// Drain and print queued messages every `interval` until cancelled.
///
/// Anything still queued at cancellation is printed before returning.
/// Returns the number of messages printed.
pub async fn run_display(
    mut drain: MessageDrain,
    interval: Duration,
    cancel: CancellationToken,
) -> usize {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut printed = 0;

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = ticker.tick() => printed += print_batch(&mut drain),
        }
    }

    printed + print_batch(&mut drain)
}
