//! Time sources.
//!
//! The watchdog and the local bus read time through [`Clock`] so tests and
//! simulations can drive them deterministically with a [`ManualClock`].

use parking_lot::Mutex;
use std::time::Duration;
use sw_watchdog_msgs::Stamp;

/// A source of message timestamps.
pub trait Clock: Send + Sync + 'static {
    /// Current time.
    fn now(&self) -> Stamp;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Stamp {
        Stamp::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Mutex<Stamp>,
}

impl ManualClock {
    /// Create a clock reading `start`.
    #[must_use]
    pub fn new(start: Stamp) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Jump to `stamp`.
    pub fn set(&self, stamp: Stamp) {
        *self.now.lock() = stamp;
    }

    /// Move forward by `step` and return the new time.
    pub fn advance(&self, step: Duration) -> Stamp {
        let mut now = self.now.lock();
        *now = now.offset_by(step);
        *now
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Stamp {
        *self.now.lock()
    }
}
