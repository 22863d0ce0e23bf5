//! # sw-watchdog-msgs
//!
//! Message schema shared by heartbeat emitters and watchdogs.
//!
//! - [`Stamp`] - `(sec, nanosec)` timestamp with dimensionally consistent arithmetic
//! - [`Header`] - generic message header (stamp and frame id)
//! - [`Heartbeat`] - liveliness signal emitted by a watched entity
//! - [`Status`] - failure report naming the source believed to have failed
//! - [`codec`] - fixed little-endian wire format for both messages
//!
//! ## Example
//!
//! ```rust
//! use sw_watchdog_msgs::{Heartbeat, Stamp, WireMessage};
//!
//! let heartbeat = Heartbeat::new(Stamp::new(12, 500), 3, 7);
//! let bytes = heartbeat.encode()?;
//! assert_eq!(Heartbeat::decode(&bytes)?, heartbeat);
//! # Ok::<(), sw_watchdog_msgs::CodecError>(())
//! ```

#![deny(
    unsafe_op_in_unsafe_fn,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    missing_debug_implementations
)]
#![warn(clippy::pedantic)]

pub mod codec;
pub mod error;
pub mod messages;
pub mod time;

pub use codec::{MessageKind, WIRE_VERSION, WireMessage, peek_kind};
pub use error::{CodecError, CodecResult};
pub use messages::{Header, Heartbeat, Status};
pub use time::Stamp;
