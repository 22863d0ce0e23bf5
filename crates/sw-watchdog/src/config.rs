//! Watchdog configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::cache::DEFAULT_CACHE_CAPACITY;
use crate::error::{WatchdogError, WatchdogResult};

/// Default topic heartbeats arrive on.
pub const DEFAULT_HEARTBEAT_TOPIC: &str = "heartbeat";
/// Default topic failure reports are published on.
pub const DEFAULT_FAILURE_TOPIC: &str = "failure";
/// Default history depth of the failure publisher.
pub const DEFAULT_FAILURE_QUEUE_DEPTH: usize = 1;

/// Watchdog configuration.
///
/// The lease has no meaningful default: a configuration built without one
/// fails validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchdogConfig {
    /// Lease granted to every watched entity. Must exceed the heartbeat period.
    pub lease: Duration,
    /// Topic heartbeats are subscribed on.
    pub heartbeat_topic: String,
    /// Topic failure reports are published on.
    pub failure_topic: String,
    /// Number of heartbeats kept by the windowed detector.
    pub cache_capacity: usize,
    /// History depth of the failure publisher.
    pub failure_queue_depth: usize,
    /// Whether failure reports are published at all.
    pub enable_publisher: bool,
    /// Configure and activate right after start-up.
    pub autostart: bool,
    /// Source reported by the single-source detector.
    pub watched_source_id: u16,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            lease: Duration::ZERO,
            heartbeat_topic: DEFAULT_HEARTBEAT_TOPIC.to_string(),
            failure_topic: DEFAULT_FAILURE_TOPIC.to_string(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            failure_queue_depth: DEFAULT_FAILURE_QUEUE_DEPTH,
            enable_publisher: false,
            autostart: false,
            watched_source_id: 0,
        }
    }
}

impl WatchdogConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> WatchdogResult<()> {
        validate_lease(self.lease)?;
        if self.heartbeat_topic.is_empty() {
            return Err(WatchdogError::invalid_configuration(
                "heartbeat_topic must not be empty",
            ));
        }
        if self.failure_topic.is_empty() {
            return Err(WatchdogError::invalid_configuration(
                "failure_topic must not be empty",
            ));
        }
        if self.cache_capacity < 2 {
            return Err(WatchdogError::invalid_configuration(
                "cache_capacity must be at least 2",
            ));
        }
        if self.failure_queue_depth == 0 {
            return Err(WatchdogError::invalid_configuration(
                "failure_queue_depth must be greater than 0",
            ));
        }
        Ok(())
    }

    /// Create a configuration builder.
    #[must_use]
    pub fn builder() -> WatchdogConfigBuilder {
        WatchdogConfigBuilder::default()
    }
}

/// Reject a zero lease.
///
/// # Errors
///
/// Returns [`WatchdogError::InvalidConfiguration`] when `lease` is zero.
pub fn validate_lease(lease: Duration) -> WatchdogResult<()> {
    if lease.is_zero() {
        return Err(WatchdogError::invalid_configuration(
            "lease must be greater than 0",
        ));
    }
    Ok(())
}

/// Builder for `WatchdogConfig`.
#[derive(Debug, Default)]
pub struct WatchdogConfigBuilder {
    config: WatchdogConfig,
}

impl WatchdogConfigBuilder {
    /// Set the lease.
    #[must_use]
    pub fn lease(mut self, lease: Duration) -> Self {
        self.config.lease = lease;
        self
    }

    /// Set the lease in whole milliseconds.
    #[must_use]
    pub fn lease_ms(self, ms: u64) -> Self {
        self.lease(Duration::from_millis(ms))
    }

    /// Set the heartbeat topic.
    #[must_use]
    pub fn heartbeat_topic(mut self, topic: impl Into<String>) -> Self {
        self.config.heartbeat_topic = topic.into();
        self
    }

    /// Set the failure topic.
    #[must_use]
    pub fn failure_topic(mut self, topic: impl Into<String>) -> Self {
        self.config.failure_topic = topic.into();
        self
    }

    /// Set the heartbeat cache capacity.
    #[must_use]
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.config.cache_capacity = capacity;
        self
    }

    /// Set the failure publisher history depth.
    #[must_use]
    pub fn failure_queue_depth(mut self, depth: usize) -> Self {
        self.config.failure_queue_depth = depth;
        self
    }

    /// Enable or disable failure reports.
    #[must_use]
    pub fn enable_publisher(mut self, enable: bool) -> Self {
        self.config.enable_publisher = enable;
        self
    }

    /// Configure and activate on start-up.
    #[must_use]
    pub fn autostart(mut self, autostart: bool) -> Self {
        self.config.autostart = autostart;
        self
    }

    /// Set the source reported by the single-source detector.
    #[must_use]
    pub fn watched_source_id(mut self, source_id: u16) -> Self {
        self.config.watched_source_id = source_id;
        self
    }

    /// Build the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> WatchdogResult<WatchdogConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WatchdogConfig::default();
        assert_eq!(config.heartbeat_topic, "heartbeat");
        assert_eq!(config.failure_topic, "failure");
        assert_eq!(config.cache_capacity, 25);
        assert_eq!(config.failure_queue_depth, 1);
        assert!(!config.enable_publisher);
        assert_eq!(config.watched_source_id, 0);
    }

    #[test]
    fn test_missing_lease_rejected() {
        let result = WatchdogConfig::builder().build();
        assert!(matches!(
            result,
            Err(WatchdogError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_builder() -> WatchdogResult<()> {
        let config = WatchdogConfig::builder()
            .lease_ms(220)
            .cache_capacity(10)
            .enable_publisher(true)
            .autostart(true)
            .watched_source_id(3)
            .build()?;
        assert_eq!(config.lease, Duration::from_millis(220));
        assert_eq!(config.cache_capacity, 10);
        assert!(config.enable_publisher);
        assert!(config.autostart);
        assert_eq!(config.watched_source_id, 3);
        Ok(())
    }

    #[test]
    fn test_invalid_values_rejected() {
        let base = || WatchdogConfig::builder().lease_ms(100);
        let rejected = |result: WatchdogResult<WatchdogConfig>| {
            matches!(result, Err(WatchdogError::InvalidConfiguration(_)))
        };
        assert!(rejected(base().cache_capacity(1).build()));
        assert!(rejected(base().failure_queue_depth(0).build()));
        assert!(rejected(base().heartbeat_topic("").build()));
        assert!(rejected(base().failure_topic("").build()));
    }

    #[test]
    fn test_config_json_round_trip() -> Result<(), Box<dyn std::error::Error>> {
        let config = WatchdogConfig::builder().lease_ms(500).build()?;
        let json = serde_json::to_string(&config)?;
        let back: WatchdogConfig = serde_json::from_str(&json)?;
        assert_eq!(back, config);
        Ok(())
    }
}
