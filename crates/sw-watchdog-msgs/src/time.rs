//! Message timestamps.

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Nanoseconds per second.
pub const NANOS_PER_SEC: i64 = 1_000_000_000;

/// A `(sec, nanosec)` timestamp from a monotonic or synchronized clock.
///
/// All differences between stamps are taken on the combined nanosecond
/// count, so the sub-second field of one stamp is never compared with the
/// sub-second field of another without its whole-second part.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Stamp {
    /// Whole seconds.
    pub sec: i32,
    /// Sub-second part in nanoseconds, `0..1_000_000_000`.
    pub nanosec: u32,
}

impl Stamp {
    /// The zero stamp.
    pub const ZERO: Self = Self { sec: 0, nanosec: 0 };

    /// Create a stamp from its raw fields.
    #[must_use]
    pub const fn new(sec: i32, nanosec: u32) -> Self {
        Self { sec, nanosec }
    }

    /// Create a stamp from a signed nanosecond count.
    ///
    /// Counts outside the `i32` seconds range saturate.
    #[must_use]
    pub fn from_nanos(nanos: i64) -> Self {
        let sec = nanos.div_euclid(NANOS_PER_SEC);
        let nanosec = nanos.rem_euclid(NANOS_PER_SEC);
        let sec = i32::try_from(sec).unwrap_or(if sec < 0 { i32::MIN } else { i32::MAX });
        Self {
            sec,
            nanosec: u32::try_from(nanosec).unwrap_or(0),
        }
    }

    /// Create a stamp from a duration since the epoch of the clock.
    #[must_use]
    pub fn from_duration(duration: Duration) -> Self {
        Self::from_nanos(i64::try_from(duration.as_nanos()).unwrap_or(i64::MAX))
    }

    /// Current wall-clock time.
    #[must_use]
    pub fn now() -> Self {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(Self::ZERO, Self::from_duration)
    }

    /// Combined signed nanosecond count.
    #[must_use]
    pub fn as_nanos(self) -> i64 {
        i64::from(self.sec) * NANOS_PER_SEC + i64::from(self.nanosec)
    }

    /// Signed nanoseconds from `earlier` to `self`.
    #[must_use]
    pub fn nanos_since(self, earlier: Self) -> i64 {
        self.as_nanos() - earlier.as_nanos()
    }

    /// Time elapsed from `earlier` to `self`, zero if `earlier` is later.
    #[must_use]
    pub fn saturating_duration_since(self, earlier: Self) -> Duration {
        u64::try_from(self.nanos_since(earlier)).map_or(Duration::ZERO, Duration::from_nanos)
    }

    /// The stamp `duration` after `self`.
    #[must_use]
    pub fn offset_by(self, duration: Duration) -> Self {
        let delta = i64::try_from(duration.as_nanos()).unwrap_or(i64::MAX);
        Self::from_nanos(self.as_nanos().saturating_add(delta))
    }

    /// Seconds as a float, for display.
    #[must_use]
    pub fn as_secs_f64(self) -> f64 {
        f64::from(self.sec) + f64::from(self.nanosec) / 1e9
    }
}

impl std::fmt::Display for Stamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:09}", self.sec, self.nanosec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nanos_round_trip() {
        let stamp = Stamp::new(5, 250_000_000);
        assert_eq!(stamp.as_nanos(), 5_250_000_000);
        assert_eq!(Stamp::from_nanos(stamp.as_nanos()), stamp);
    }

    #[test]
    fn test_difference_spans_second_boundary() {
        let earlier = Stamp::new(9, 900_000_000);
        let later = Stamp::new(10, 100_000_000);
        assert_eq!(later.nanos_since(earlier), 200_000_000);
        assert_eq!(
            later.saturating_duration_since(earlier),
            Duration::from_millis(200)
        );
    }

    #[test]
    fn test_saturating_duration_in_future_is_zero() {
        let earlier = Stamp::new(10, 0);
        let later = Stamp::new(11, 0);
        assert_eq!(earlier.saturating_duration_since(later), Duration::ZERO);
    }

    #[test]
    fn test_negative_nanos_normalize() {
        let stamp = Stamp::from_nanos(-1);
        assert_eq!(stamp.sec, -1);
        assert_eq!(stamp.nanosec, 999_999_999);
    }

    #[test]
    fn test_add_duration() {
        let stamp = Stamp::new(1, 800_000_000).offset_by(Duration::from_millis(300));
        assert_eq!(stamp, Stamp::new(2, 100_000_000));
    }

    #[test]
    fn test_display() {
        assert_eq!(Stamp::new(3, 42).to_string(), "3.000000042");
    }
}
