//! Command-line processes for the sw-watchdog liveliness monitor.
//!
//! Three binaries share this library:
//!
//! - `windowed_watchdog` attributes a lost lease to one of many sources.
//! - `simple_watchdog` watches a single source.
//! - `simple_heartbeat` emits heartbeats for a source at a fixed period.
//!
//! Heartbeats and failure statuses travel as UDP datagrams in the
//! `sw-watchdog-msgs` wire format.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![warn(clippy::pedantic)]

pub mod args;
pub mod command;
pub mod error;
pub mod heartbeat;
pub mod logging;
pub mod output;
pub mod runner;

pub use error::{CliError, CliResult};
