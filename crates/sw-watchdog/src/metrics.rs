//! Watchdog counters.

use serde::{Deserialize, Serialize};

/// Running counters of one watchdog instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WatchdogMetrics {
    /// Heartbeats fed to the detector.
    pub heartbeats_received: u64,
    /// Liveliness changes received, gains included.
    pub liveliness_events: u64,
    /// Failure reports published.
    pub failures_reported: u64,
    /// Failures detected while the publisher was missing or inactive.
    pub reports_suppressed: u64,
    /// Liveliness losses no source could be blamed for.
    pub detection_errors: u64,
    /// Reports the transport refused.
    pub publish_errors: u64,
    /// Accepted lifecycle transitions.
    pub transitions: u64,
}

impl WatchdogMetrics {
    /// Failures detected, published or not.
    #[must_use]
    pub fn failures_detected(&self) -> u64 {
        self.failures_reported
            .saturating_add(self.reports_suppressed)
            .saturating_add(self.publish_errors)
    }
}

pub(crate) fn bump(counter: &mut u64) {
    *counter = counter.saturating_add(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failures_detected() {
        let mut metrics = WatchdogMetrics::default();
        bump(&mut metrics.failures_reported);
        bump(&mut metrics.reports_suppressed);
        bump(&mut metrics.detection_errors);
        assert_eq!(metrics.failures_detected(), 2);
    }
}
