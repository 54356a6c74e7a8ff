//! Relay coordination.
//!
//! The [`Coordinator`] owns the watched file, its subscription and the
//! notifier. Change notices and minute ticks arrive on one task, so all
//! relay state is mutated from a single place. Human-readable results are
//! pushed to a [`MessageQueue`] that the display drains on its own schedule.

mod coordinator;
mod message;

pub use coordinator::{Coordinator, RelayError};
pub use message::{message_queue, MessageDrain, MessageQueue, RelayMessage, ERROR_MARKER};
