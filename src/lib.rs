//! VRChat log relay - tails the output log and forwards events over OSC.

pub mod clock;
pub mod config;
pub mod display;
pub mod osc;
pub mod relay;
pub mod watcher;
