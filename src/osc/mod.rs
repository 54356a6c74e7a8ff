//! Outbound OSC signalling.
//!
//! # Architecture
//!
//! ```text
//! Coordinator --pulse(addr)--> PulseNotifier --true--> OscTransport --UDP--> listener
//!                                   |
//!                                   +--(after hold)--false--> OscTransport
//! ```
//!
//! Sending is best-effort: a missing or failing transport drops messages
//! and never surfaces an error to the caller.

mod client;
mod error;
mod pulse;

pub use client::{DisabledTransport, OscTransport, OscValue, UdpOscClient};
pub use error::OscError;
pub use pulse::{DeferredAction, PulseNotifier, Scheduler, TokioScheduler, DEFAULT_PULSE_HOLD};

#[cfg(test)]
pub(crate) use pulse::testing;
