//! In-process transport.

use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Weak};
use sw_watchdog_msgs::{Heartbeat, Status};

use super::{
    HeartbeatListener, LeaseMonitor, LivelinessChangedInfo, LivelinessQos, StatusPublisher,
    Transport,
};
use crate::clock::Clock;
use crate::error::{WatchdogError, WatchdogResult};

struct SubscriptionEntry {
    topic: String,
    listener: Weak<dyn HeartbeatListener>,
    monitor: LeaseMonitor,
}

#[derive(Default)]
struct BusState {
    next_subscription: u64,
    subscriptions: BTreeMap<u64, SubscriptionEntry>,
    statuses: HashMap<String, VecDeque<Status>>,
    live_publishers: usize,
    publishers_created: usize,
}

/// Topic bus living in one process.
///
/// Heartbeats published on a topic reach every subscription on it, and each
/// subscription runs its own [`LeaseMonitor`] against the bus clock.
/// Liveliness losses are only raised by [`LocalBus::tick`]. Listeners are
/// always invoked after the bus lock is released.
pub struct LocalBus {
    clock: Arc<dyn Clock>,
    state: Arc<Mutex<BusState>>,
}

impl std::fmt::Debug for LocalBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("LocalBus")
            .field("subscriptions", &state.subscriptions.len())
            .field("live_publishers", &state.live_publishers)
            .finish_non_exhaustive()
    }
}

impl LocalBus {
    /// Create a bus reading time from `clock`.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            state: Arc::new(Mutex::new(BusState::default())),
        }
    }

    /// The bus clock.
    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Deliver `heartbeat` to every subscription on `topic`.
    ///
    /// A subscription that has not heard from the sender before, or had
    /// expired it, also receives a liveliness gain right after the heartbeat.
    /// Returns the number of listeners reached.
    pub fn publish_heartbeat(&self, topic: &str, heartbeat: Heartbeat) -> usize {
        let now = self.clock.now();
        let targets: Vec<_> = {
            let mut state = self.state.lock();
            state
                .subscriptions
                .values_mut()
                .filter(|entry| entry.topic == topic)
                .map(|entry| {
                    let event = entry.monitor.observe(heartbeat.source_id, now);
                    (entry.listener.clone(), event)
                })
                .collect()
        };

        let mut reached = 0;
        for (listener, event) in targets {
            let Some(listener) = listener.upgrade() else {
                continue;
            };
            listener.on_heartbeat(heartbeat.clone());
            if let Some(info) = event {
                listener.on_liveliness_changed(info);
            }
            reached += 1;
        }
        reached
    }

    /// Run every subscription's lease timer and deliver the losses.
    ///
    /// Returns the number of liveliness events delivered.
    pub fn tick(&self) -> usize {
        let now = self.clock.now();
        let events: Vec<(Weak<dyn HeartbeatListener>, LivelinessChangedInfo)> = {
            let mut state = self.state.lock();
            state
                .subscriptions
                .values_mut()
                .flat_map(|entry| {
                    let listener = entry.listener.clone();
                    entry
                        .monitor
                        .poll(now)
                        .into_iter()
                        .map(move |info| (listener.clone(), info))
                })
                .collect()
        };

        let mut delivered = 0;
        for (listener, info) in events {
            if let Some(listener) = listener.upgrade() {
                listener.on_liveliness_changed(info);
                delivered += 1;
            }
        }
        delivered
    }

    /// Drain the reports queued on `topic`, oldest first.
    #[must_use]
    pub fn take_statuses(&self, topic: &str) -> Vec<Status> {
        self.state
            .lock()
            .statuses
            .remove(topic)
            .map(Vec::from)
            .unwrap_or_default()
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.state.lock().subscriptions.len()
    }

    /// Number of live publishers.
    #[must_use]
    pub fn publisher_count(&self) -> usize {
        self.state.lock().live_publishers
    }

    /// Number of publishers ever created.
    #[must_use]
    pub fn publishers_created(&self) -> usize {
        self.state.lock().publishers_created
    }
}

impl Transport for LocalBus {
    type Subscription = LocalSubscription;
    type Publisher = LocalPublisher;

    fn subscribe(
        &self,
        topic: &str,
        qos: LivelinessQos,
        listener: Weak<dyn HeartbeatListener>,
    ) -> WatchdogResult<LocalSubscription> {
        if qos.lease.is_zero() {
            return Err(WatchdogError::transport("liveliness lease must be positive"));
        }
        let mut state = self.state.lock();
        let id = state.next_subscription;
        state.next_subscription = id.wrapping_add(1);
        state.subscriptions.insert(
            id,
            SubscriptionEntry {
                topic: topic.to_string(),
                listener,
                monitor: LeaseMonitor::new(qos.lease),
            },
        );
        tracing::debug!(topic, subscription = id, lease = ?qos.lease, "Subscribed");
        Ok(LocalSubscription {
            id,
            topic: topic.to_string(),
            state: Arc::downgrade(&self.state),
        })
    }

    fn create_publisher(&self, topic: &str, depth: usize) -> WatchdogResult<LocalPublisher> {
        if depth == 0 {
            return Err(WatchdogError::transport("publisher depth must be positive"));
        }
        let mut state = self.state.lock();
        state.live_publishers = state.live_publishers.saturating_add(1);
        state.publishers_created = state.publishers_created.saturating_add(1);
        tracing::debug!(topic, depth, "Publisher created");
        Ok(LocalPublisher {
            topic: topic.to_string(),
            depth,
            activated: false,
            state: Arc::downgrade(&self.state),
        })
    }
}

/// Subscription handle on a [`LocalBus`]. Unsubscribes on drop.
pub struct LocalSubscription {
    id: u64,
    topic: String,
    state: Weak<Mutex<BusState>>,
}

impl LocalSubscription {
    /// Topic subscribed to.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }
}

impl std::fmt::Debug for LocalSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalSubscription")
            .field("id", &self.id)
            .field("topic", &self.topic)
            .finish()
    }
}

impl Drop for LocalSubscription {
    fn drop(&mut self) {
        if let Some(state) = self.state.upgrade() {
            state.lock().subscriptions.remove(&self.id);
            tracing::debug!(topic = %self.topic, subscription = self.id, "Unsubscribed");
        }
    }
}

/// Failure publisher on a [`LocalBus`].
///
/// Keeps at most `depth` undrained reports per topic, dropping the oldest.
pub struct LocalPublisher {
    topic: String,
    depth: usize,
    activated: bool,
    state: Weak<Mutex<BusState>>,
}

impl std::fmt::Debug for LocalPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalPublisher")
            .field("topic", &self.topic)
            .field("depth", &self.depth)
            .field("activated", &self.activated)
            .finish()
    }
}

impl StatusPublisher for LocalPublisher {
    fn on_activate(&mut self) {
        self.activated = true;
    }

    fn on_deactivate(&mut self) {
        self.activated = false;
    }

    fn is_activated(&self) -> bool {
        self.activated
    }

    fn publish(&mut self, status: Status) -> WatchdogResult<()> {
        if !self.activated {
            return Err(WatchdogError::transport(format!(
                "publisher on '{}' is not activated",
                self.topic
            )));
        }
        let state = self
            .state
            .upgrade()
            .ok_or_else(|| WatchdogError::transport("bus has been dropped"))?;
        let mut state = state.lock();
        let queue = state.statuses.entry(self.topic.clone()).or_default();
        queue.push_back(status);
        while queue.len() > self.depth {
            queue.pop_front();
        }
        Ok(())
    }
}

impl Drop for LocalPublisher {
    fn drop(&mut self) {
        if let Some(state) = self.state.upgrade() {
            let mut state = state.lock();
            state.live_publishers = state.live_publishers.saturating_sub(1);
        }
    }
}
