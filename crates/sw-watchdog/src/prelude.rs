//! Prelude for sw-watchdog.
//!
//! This module re-exports the most commonly used types for convenient importing.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use sw_watchdog::prelude::*;
//!
//! let clock: Arc<dyn Clock> = Arc::new(SystemClock);
//! let bus = Arc::new(LocalBus::new(Arc::clone(&clock)));
//! let config = WatchdogConfig::builder().lease_ms(220).build()?;
//! let watchdog = Watchdog::simple(config, bus, clock)?;
//! assert_eq!(watchdog.configure()?, LifecycleState::Inactive);
//! # Ok::<(), WatchdogError>(())
//! ```

pub use crate::attribution::{Attribution, attribute};
pub use crate::cache::HeartbeatCache;
pub use crate::clock::{Clock, ManualClock, SystemClock};
pub use crate::config::{WatchdogConfig, WatchdogConfigBuilder};
pub use crate::detector::{Detector, SingleSourceDetector, WindowedDetector};
pub use crate::error::{DetectionError, WatchdogError, WatchdogResult};
pub use crate::estimator::{SourceTiming, estimate};
pub use crate::lifecycle::{Effect, LifecycleState, Step, Transition, transition};
pub use crate::metrics::WatchdogMetrics;
pub use crate::reporter::FailureReporter;
pub use crate::transport::{
    HeartbeatListener, LivelinessChangedInfo, LivelinessQos, LocalBus, StatusPublisher, Transport,
};
pub use crate::watchdog::{SimpleWatchdog, Watchdog, WindowedWatchdog};
pub use sw_watchdog_msgs::{Heartbeat, Stamp, Status};
