//! Pub/sub transport seam.
//!
//! The watchdog talks to its channel only through these traits. A transport
//! delivers heartbeats and liveliness changes to a [`HeartbeatListener`] it
//! holds weakly, and hands out [`StatusPublisher`]s for failure reports.
//! [`LocalBus`] is the in-process implementation.

mod lease;
mod local;

use serde::{Deserialize, Serialize};
use std::sync::Weak;
use std::time::Duration;
use sw_watchdog_msgs::{Heartbeat, Status};

use crate::error::WatchdogResult;

pub use lease::LeaseMonitor;
pub use local::{LocalBus, LocalPublisher, LocalSubscription};

/// How liveliness is asserted by writers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LivelinessKind {
    /// Each published message on the topic asserts liveliness.
    #[default]
    ManualByTopic,
}

/// Liveliness requirements of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LivelinessQos {
    /// Longest silence before a writer is considered not alive.
    pub lease: Duration,
    /// How writers assert liveliness.
    pub kind: LivelinessKind,
}

impl LivelinessQos {
    /// Manual-by-topic liveliness with `lease`.
    #[must_use]
    pub fn manual_by_topic(lease: Duration) -> Self {
        Self {
            lease,
            kind: LivelinessKind::ManualByTopic,
        }
    }
}

/// A change in the number of live writers on a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LivelinessChangedInfo {
    /// Writers currently alive.
    pub alive_count: i32,
    /// Writers currently not alive.
    pub not_alive_count: i32,
    /// Change of `alive_count` since the previous event.
    pub alive_count_change: i32,
    /// Change of `not_alive_count` since the previous event.
    pub not_alive_count_change: i32,
}

impl LivelinessChangedInfo {
    /// Whether more writers died than came alive.
    #[must_use]
    pub fn is_net_loss(&self) -> bool {
        self.not_alive_count_change.max(0) > self.alive_count_change.max(0)
    }
}

/// Receiver of subscription traffic.
///
/// Implementations are called from transport threads and must not call
/// back into the transport while holding their own locks.
pub trait HeartbeatListener: Send + Sync {
    /// A heartbeat arrived.
    fn on_heartbeat(&self, heartbeat: Heartbeat);

    /// The set of live writers changed.
    fn on_liveliness_changed(&self, info: LivelinessChangedInfo);
}

/// Failure report publisher. Created inactive.
pub trait StatusPublisher: Send {
    /// Allow publishing.
    fn on_activate(&mut self);

    /// Stop publishing.
    fn on_deactivate(&mut self);

    /// Whether publishing is allowed.
    fn is_activated(&self) -> bool;

    /// Publish a failure report.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the report cannot be handed over.
    fn publish(&mut self, status: Status) -> WatchdogResult<()>;
}

/// A pub/sub channel the watchdog can subscribe and publish on.
pub trait Transport: Send + Sync + 'static {
    /// Live subscription. Dropping it unsubscribes.
    type Subscription: Send + 'static;
    /// Failure report publisher.
    type Publisher: StatusPublisher + 'static;

    /// Subscribe `listener` to heartbeats on `topic`.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the subscription cannot be created.
    fn subscribe(
        &self,
        topic: &str,
        qos: LivelinessQos,
        listener: Weak<dyn HeartbeatListener>,
    ) -> WatchdogResult<Self::Subscription>;

    /// Create an inactive publisher on `topic` keeping `depth` reports.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the publisher cannot be created.
    fn create_publisher(&self, topic: &str, depth: usize) -> WatchdogResult<Self::Publisher>;
}
