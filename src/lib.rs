//! # dockdetect
//! ## Run scripts when an input device reports an event
//!
//! Watches one evdev node (found by path, or by the name its driver reports) for a
//! single (type, code) pair and runs every executable in a script directory with
//! the event's value each time it fires. Built for dock/undock switches.

pub mod args;
pub mod daemon;
pub mod err;
pub mod evdev;
pub mod event;
pub mod filter;
pub mod logging;
pub mod resolve;
pub mod targets;

#[cfg(test)]
mod testutil;
