//! # sw-watchdog
//!
//! Lease-based liveliness watchdog for entities that emit periodic heartbeats
//! over a shared channel.
//!
//! When the transport reports that a writer's lease expired, the watchdog
//! works out which source went quiet and publishes a [`Status`] naming it.
//! Two detectors plug into the same lifecycle:
//!
//! - [`WindowedDetector`] keeps the last N heartbeats from every source and
//!   blames the source that is most overdue relative to its own rhythm
//! - [`SingleSourceDetector`] blames the one watched source
//!
//! ## Architecture
//!
//! - [`cache`] - bounded arrival-ordered heartbeat history
//! - [`estimator`] - per-source average interval and elapsed time
//! - [`attribution`] - choice of the most overdue source
//! - [`detector`] - the detection strategies
//! - [`lifecycle`] - pure state machine returning effects
//! - [`reporter`] - failure publisher ownership and [`Status`] emission
//! - [`transport`] - pub/sub seam and the in-process [`LocalBus`]
//! - [`watchdog`] - the node tying them together
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use sw_watchdog::prelude::*;
//!
//! let clock = Arc::new(ManualClock::new(Stamp::new(100, 0)));
//! let bus = Arc::new(LocalBus::new(clock.clone()));
//! let config = WatchdogConfig::builder()
//!     .lease(Duration::from_millis(300))
//!     .enable_publisher(true)
//!     .build()?;
//! let watchdog = Watchdog::windowed(config, Arc::clone(&bus), clock.clone())?;
//! watchdog.configure()?;
//! watchdog.activate()?;
//!
//! for seq in 1..=3 {
//!     bus.publish_heartbeat("heartbeat", Heartbeat::new(clock.now(), 7, seq));
//!     clock.advance(Duration::from_millis(100));
//! }
//! clock.advance(Duration::from_millis(400));
//! bus.tick();
//!
//! let statuses = bus.take_statuses("failure");
//! assert_eq!(statuses.len(), 1);
//! assert_eq!(statuses.first().map(|s| s.missed_source_id), Some(7));
//! # Ok::<(), WatchdogError>(())
//! ```

#![deny(
    unsafe_op_in_unsafe_fn,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::panic,
    missing_docs,
    missing_debug_implementations
)]
#![warn(clippy::pedantic)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod attribution;
pub mod cache;
pub mod clock;
pub mod config;
pub mod detector;
pub mod error;
pub mod estimator;
pub mod lifecycle;
pub mod metrics;
pub mod reporter;
pub mod transport;
pub mod watchdog;

pub mod prelude;

pub use attribution::Attribution;
pub use cache::{DEFAULT_CACHE_CAPACITY, HeartbeatCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{WatchdogConfig, WatchdogConfigBuilder};
pub use detector::{Detector, SingleSourceDetector, WindowedDetector};
pub use error::{DetectionError, WatchdogError, WatchdogResult};
pub use estimator::SourceTiming;
pub use lifecycle::{LifecycleState, Transition};
pub use metrics::WatchdogMetrics;
pub use reporter::FailureReporter;
pub use transport::{LocalBus, Transport};
pub use watchdog::{SimpleWatchdog, Watchdog, WindowedWatchdog};

pub use sw_watchdog_msgs::{Heartbeat, Stamp, Status};
