//! Failure detection strategies.
//!
//! A [`Detector`] sees every heartbeat the watchdog receives while active and
//! is asked to name the failed source on every net liveliness loss.

use std::collections::BTreeSet;
use std::time::Duration;
use sw_watchdog_msgs::{Heartbeat, Stamp};

use crate::attribution::{Attribution, attribute};
use crate::cache::HeartbeatCache;
use crate::error::DetectionError;
use crate::estimator::estimate;

/// Strategy that attributes a liveliness loss to one source.
pub trait Detector: Send + 'static {
    /// Record a received heartbeat.
    fn observe(&mut self, heartbeat: &Heartbeat);

    /// Name the source responsible for a liveliness loss detected at `now`.
    ///
    /// # Errors
    ///
    /// Returns a [`DetectionError`] when no source can be blamed.
    fn attribute(&self, now: Stamp, lease: Duration) -> Result<Attribution, DetectionError>;

    /// Note that `source_id` has been reported as failed.
    ///
    /// Detectors that can blame more than one source stop considering it
    /// until it is heard from again.
    fn mark_failed(&mut self, _source_id: u16) {}

    /// Forget everything observed so far.
    fn reset(&mut self);
}

/// Multi-source detector working over a bounded heartbeat window.
///
/// A source reported once stays out of attribution until it beats again, so
/// a later loss can be pinned on another source while the dead one is still
/// in the window.
#[derive(Debug, Clone, Default)]
pub struct WindowedDetector {
    cache: HeartbeatCache,
    failed: BTreeSet<u16>,
}

impl WindowedDetector {
    /// Create a detector keeping the last `capacity` heartbeats.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: HeartbeatCache::new(capacity),
            failed: BTreeSet::new(),
        }
    }

    /// The heartbeat window.
    #[must_use]
    pub fn cache(&self) -> &HeartbeatCache {
        &self.cache
    }

    /// Sources already reported and not heard from since.
    #[must_use]
    pub fn failed(&self) -> &BTreeSet<u16> {
        &self.failed
    }
}

impl Detector for WindowedDetector {
    fn observe(&mut self, heartbeat: &Heartbeat) {
        if self.failed.remove(&heartbeat.source_id) {
            tracing::debug!(source_id = heartbeat.source_id, "Failed source heard again");
        }
        self.cache.push(heartbeat.clone());
    }

    fn attribute(&self, now: Stamp, lease: Duration) -> Result<Attribution, DetectionError> {
        if self.cache.is_empty() {
            return Err(DetectionError::EmptyCache);
        }
        let candidates = self
            .cache
            .iter()
            .filter(|heartbeat| !self.failed.contains(&heartbeat.source_id));
        let timings = estimate(candidates, now);
        if timings.is_empty() {
            return Err(DetectionError::NoQualifyingSource);
        }
        attribute(&timings, lease)
    }

    fn mark_failed(&mut self, source_id: u16) {
        self.failed.insert(source_id);
    }

    fn reset(&mut self) {
        self.cache.clear();
        self.failed.clear();
    }
}

/// Detector for a channel carrying exactly one watched source.
///
/// Any liveliness loss is blamed on the watched source. The report carries
/// the last heartbeat seen from it, or a default heartbeat with the watched
/// id when none has arrived yet.
#[derive(Debug, Clone, Default)]
pub struct SingleSourceDetector {
    watched_source_id: u16,
    last: Option<Heartbeat>,
}

impl SingleSourceDetector {
    /// Create a detector reporting `watched_source_id`.
    #[must_use]
    pub fn new(watched_source_id: u16) -> Self {
        Self {
            watched_source_id,
            last: None,
        }
    }

    /// Source this detector reports.
    #[must_use]
    pub fn watched_source_id(&self) -> u16 {
        self.watched_source_id
    }

    /// Last heartbeat seen from the watched source.
    #[must_use]
    pub fn last(&self) -> Option<&Heartbeat> {
        self.last.as_ref()
    }
}

impl Detector for SingleSourceDetector {
    fn observe(&mut self, heartbeat: &Heartbeat) {
        if heartbeat.source_id == self.watched_source_id {
            self.last = Some(heartbeat.clone());
        }
    }

    fn attribute(&self, now: Stamp, _lease: Duration) -> Result<Attribution, DetectionError> {
        let (heartbeat, elapsed) = match &self.last {
            Some(last) => (last.clone(), now.saturating_duration_since(last.stamp())),
            None => (
                Heartbeat {
                    source_id: self.watched_source_id,
                    ..Heartbeat::default()
                },
                Duration::ZERO,
            ),
        };
        Ok(Attribution {
            heartbeat,
            elapsed,
            overdue_ratio: None,
        })
    }

    fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEASE: Duration = Duration::from_millis(300);

    #[test]
    fn test_windowed_detector_blames_overdue_source() -> Result<(), DetectionError> {
        let mut detector = WindowedDetector::new(10);
        for step in 0..4 {
            let ms = step * 100;
            detector.observe(&Heartbeat::new(Stamp::from_nanos(ms * 1_000_000), 1, 1));
        }
        for step in 0..8 {
            let ms = step * 50;
            detector.observe(&Heartbeat::new(Stamp::from_nanos(ms * 1_000_000), 2, 1));
        }
        // Source 1 last beat at 300 ms, source 2 at 350 ms.
        let attribution = detector.attribute(Stamp::from_nanos(700_000_000), LEASE)?;
        assert_eq!(attribution.source_id(), 2);
        Ok(())
    }

    #[test]
    fn test_windowed_detector_reset() {
        let mut detector = WindowedDetector::new(4);
        detector.observe(&Heartbeat::default());
        assert_eq!(detector.cache().len(), 1);
        detector.reset();
        assert_eq!(
            detector.attribute(Stamp::ZERO, LEASE),
            Err(DetectionError::EmptyCache)
        );
    }

    #[test]
    fn test_windowed_detector_skips_reported_source() -> Result<(), DetectionError> {
        let mut detector = WindowedDetector::new(16);
        for step in 0..4 {
            let ms = step * 100;
            detector.observe(&Heartbeat::new(Stamp::from_nanos(ms * 1_000_000), 1, 1));
            detector.observe(&Heartbeat::new(Stamp::from_nanos(ms * 1_000_000), 2, 1));
        }
        let now = Stamp::from_nanos(900_000_000);
        detector.mark_failed(1);
        assert_eq!(detector.attribute(now, LEASE)?.source_id(), 2);

        detector.mark_failed(2);
        assert_eq!(
            detector.attribute(now, LEASE),
            Err(DetectionError::NoQualifyingSource)
        );

        // A fresh beat puts the source back in play.
        detector.observe(&Heartbeat::new(Stamp::from_nanos(400_000_000), 1, 2));
        assert!(!detector.failed().contains(&1));
        assert_eq!(detector.attribute(now, LEASE)?.source_id(), 1);

        detector.reset();
        assert!(detector.failed().is_empty());
        Ok(())
    }

    #[test]
    fn test_single_source_detector_defaults_to_watched_id() -> Result<(), DetectionError> {
        let detector = SingleSourceDetector::new(4);
        let attribution = detector.attribute(Stamp::new(10, 0), LEASE)?;
        assert_eq!(attribution.source_id(), 4);
        assert_eq!(attribution.heartbeat.sequence_number, 1);
        Ok(())
    }

    #[test]
    fn test_single_source_detector_keeps_last_watched() -> Result<(), DetectionError> {
        let mut detector = SingleSourceDetector::new(0);
        detector.observe(&Heartbeat::new(Stamp::new(1, 0), 0, 7));
        detector.observe(&Heartbeat::new(Stamp::new(2, 0), 3, 8));

        let attribution = detector.attribute(Stamp::new(3, 0), LEASE)?;
        assert_eq!(attribution.heartbeat.sequence_number, 7);
        assert_eq!(attribution.elapsed, Duration::from_secs(2));

        detector.reset();
        assert!(detector.last().is_none());
        Ok(())
    }
}
