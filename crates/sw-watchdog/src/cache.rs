//! Bounded heartbeat history.

use std::collections::VecDeque;
use sw_watchdog_msgs::Heartbeat;

/// Default number of heartbeats kept.
pub const DEFAULT_CACHE_CAPACITY: usize = 25;

/// Arrival-ordered history of heartbeats from every source on a channel.
///
/// Once full, each push evicts the oldest entry regardless of its source.
#[derive(Debug, Clone)]
pub struct HeartbeatCache {
    entries: VecDeque<Heartbeat>,
    capacity: usize,
}

impl HeartbeatCache {
    /// Create an empty cache holding at most `capacity` heartbeats.
    ///
    /// A zero capacity is raised to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a heartbeat, returning the entry evicted to make room.
    pub fn push(&mut self, heartbeat: Heartbeat) -> Option<Heartbeat> {
        let evicted = if self.entries.len() >= self.capacity {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(heartbeat);
        evicted
    }

    /// Owned copy of the history, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Heartbeat> {
        self.entries.iter().cloned().collect()
    }

    /// Iterate oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Heartbeat> {
        self.entries.iter()
    }

    /// Most recent heartbeat from `source_id`.
    #[must_use]
    pub fn latest_for(&self, source_id: u16) -> Option<&Heartbeat> {
        self.entries
            .iter()
            .rev()
            .find(|heartbeat| heartbeat.source_id == source_id)
    }

    /// Number of cached heartbeats.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of cached heartbeats.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every cached heartbeat.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for HeartbeatCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}
