//! Per-writer lease timer.

use std::collections::BTreeMap;
use std::time::Duration;
use sw_watchdog_msgs::Stamp;

use super::LivelinessChangedInfo;

#[derive(Debug, Clone, Copy)]
struct WriterLease {
    last_seen: Stamp,
    alive: bool,
}

/// Tracks which writers on a subscription are alive under a lease.
#[derive(Debug, Clone)]
pub struct LeaseMonitor {
    lease: Duration,
    writers: BTreeMap<u16, WriterLease>,
    alive_count: i32,
    not_alive_count: i32,
}

impl LeaseMonitor {
    /// Create a monitor with no known writers.
    #[must_use]
    pub fn new(lease: Duration) -> Self {
        Self {
            lease,
            writers: BTreeMap::new(),
            alive_count: 0,
            not_alive_count: 0,
        }
    }

    /// The lease.
    #[must_use]
    pub fn lease(&self) -> Duration {
        self.lease
    }

    /// Writers currently alive.
    #[must_use]
    pub fn alive_count(&self) -> i32 {
        self.alive_count
    }

    /// Writers currently not alive.
    #[must_use]
    pub fn not_alive_count(&self) -> i32 {
        self.not_alive_count
    }

    /// Record a message from `writer` at `now`.
    ///
    /// Returns an event when the writer is new or comes back to life.
    pub fn observe(&mut self, writer: u16, now: Stamp) -> Option<LivelinessChangedInfo> {
        let not_alive_count_change = match self.writers.get_mut(&writer) {
            Some(entry) if entry.alive => {
                entry.last_seen = now;
                return None;
            }
            Some(entry) => {
                entry.last_seen = now;
                entry.alive = true;
                self.not_alive_count = self.not_alive_count.saturating_sub(1);
                -1
            }
            None => {
                self.writers.insert(
                    writer,
                    WriterLease {
                        last_seen: now,
                        alive: true,
                    },
                );
                0
            }
        };
        self.alive_count = self.alive_count.saturating_add(1);
        Some(LivelinessChangedInfo {
            alive_count: self.alive_count,
            not_alive_count: self.not_alive_count,
            alive_count_change: 1,
            not_alive_count_change,
        })
    }

    /// Expire every writer silent for longer than the lease at `now`.
    ///
    /// Returns one event per expired writer, ordered by writer id.
    pub fn poll(&mut self, now: Stamp) -> Vec<LivelinessChangedInfo> {
        let mut events = Vec::new();
        for entry in self.writers.values_mut() {
            if entry.alive && now.saturating_duration_since(entry.last_seen) > self.lease {
                entry.alive = false;
                self.alive_count = self.alive_count.saturating_sub(1);
                self.not_alive_count = self.not_alive_count.saturating_add(1);
                events.push(LivelinessChangedInfo {
                    alive_count: self.alive_count,
                    not_alive_count: self.not_alive_count,
                    alive_count_change: -1,
                    not_alive_count_change: 1,
                });
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(ms: i64) -> Stamp {
        Stamp::from_nanos(ms * 1_000_000)
    }

    #[test]
    fn test_new_writer_becomes_alive() {
        let mut monitor = LeaseMonitor::new(Duration::from_millis(100));
        let event = monitor.observe(1, ms(0));
        assert_eq!(
            event,
            Some(LivelinessChangedInfo {
                alive_count: 1,
                not_alive_count: 0,
                alive_count_change: 1,
                not_alive_count_change: 0,
            })
        );
        assert_eq!(monitor.observe(1, ms(50)), None);
    }

    #[test]
    fn test_expiry_and_recovery() {
        let mut monitor = LeaseMonitor::new(Duration::from_millis(100));
        monitor.observe(1, ms(0));
        monitor.observe(2, ms(0));

        assert!(monitor.poll(ms(100)).is_empty());
        monitor.observe(2, ms(90));

        let events = monitor.poll(ms(150));
        assert_eq!(events.len(), 1);
        assert!(events.iter().all(LivelinessChangedInfo::is_net_loss));
        assert_eq!(monitor.alive_count(), 1);
        assert_eq!(monitor.not_alive_count(), 1);

        // Already expired writers are not reported twice.
        assert!(monitor.poll(ms(160)).is_empty());

        let recovered = monitor.observe(1, ms(200));
        assert_eq!(recovered.map(|info| info.not_alive_count_change), Some(-1));
        assert_eq!(monitor.not_alive_count(), 0);
    }
}
