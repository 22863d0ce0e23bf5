//! Per-source inter-arrival statistics.

use std::collections::BTreeMap;
use std::time::Duration;
use sw_watchdog_msgs::{Heartbeat, Stamp};

/// Timing summary of one source over the cached window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTiming {
    /// Source the summary describes.
    pub source_id: u16,
    /// Number of cached heartbeats from the source.
    pub samples: usize,
    /// Most recent cached heartbeat from the source.
    pub latest: Heartbeat,
    /// Mean spacing between consecutive heartbeats.
    ///
    /// `None` with fewer than two samples or when the stamps do not advance.
    pub average_interval: Option<Duration>,
    /// Time since `latest` was stamped, zero if it lies in the future.
    pub elapsed: Duration,
}

struct Accumulator<'a> {
    first: Stamp,
    latest: &'a Heartbeat,
    samples: usize,
}

/// Summarize every source present in `heartbeats` as seen at `now`.
///
/// `heartbeats` must be in arrival order. The mean of consecutive stamp
/// differences telescopes to `(last - first) / (samples - 1)`, which is what
/// is computed here in whole nanoseconds.
pub fn estimate<'a, I>(heartbeats: I, now: Stamp) -> BTreeMap<u16, SourceTiming>
where
    I: IntoIterator<Item = &'a Heartbeat>,
{
    let mut sources: BTreeMap<u16, Accumulator<'a>> = BTreeMap::new();
    for heartbeat in heartbeats {
        sources
            .entry(heartbeat.source_id)
            .and_modify(|acc| {
                acc.latest = heartbeat;
                acc.samples = acc.samples.saturating_add(1);
            })
            .or_insert(Accumulator {
                first: heartbeat.stamp(),
                latest: heartbeat,
                samples: 1,
            });
    }

    sources
        .into_iter()
        .map(|(source_id, acc)| {
            let timing = SourceTiming {
                source_id,
                samples: acc.samples,
                latest: acc.latest.clone(),
                average_interval: average_interval(acc.first, acc.latest.stamp(), acc.samples),
                elapsed: now.saturating_duration_since(acc.latest.stamp()),
            };
            (source_id, timing)
        })
        .collect()
}

fn average_interval(first: Stamp, last: Stamp, samples: usize) -> Option<Duration> {
    let gaps = i64::try_from(samples.checked_sub(1)?).ok()?;
    if gaps == 0 {
        return None;
    }
    let mean = last.nanos_since(first).checked_div(gaps)?;
    u64::try_from(mean)
        .ok()
        .filter(|nanos| *nanos > 0)
        .map(Duration::from_nanos)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at_ms(source_id: u16, ms: i64) -> Heartbeat {
        Heartbeat::new(Stamp::from_nanos(ms * 1_000_000), source_id, 1)
    }

    #[test]
    fn test_average_and_elapsed() {
        let heartbeats = [at_ms(1, 0), at_ms(2, 50), at_ms(1, 100), at_ms(1, 200)];
        let timings = estimate(&heartbeats, Stamp::from_nanos(260_000_000));

        let one = timings.get(&1);
        assert_eq!(one.map(|t| t.samples), Some(3));
        assert_eq!(
            one.and_then(|t| t.average_interval),
            Some(Duration::from_millis(100))
        );
        assert_eq!(one.map(|t| t.elapsed), Some(Duration::from_millis(60)));

        let two = timings.get(&2);
        assert_eq!(two.map(|t| t.samples), Some(1));
        assert_eq!(two.and_then(|t| t.average_interval), None);
        assert_eq!(two.map(|t| t.elapsed), Some(Duration::from_millis(210)));
    }

    #[test]
    fn test_interval_spans_second_boundary() {
        let heartbeats = [
            Heartbeat::new(Stamp::new(4, 950_000_000), 0, 1),
            Heartbeat::new(Stamp::new(5, 50_000_000), 0, 2),
        ];
        let timings = estimate(&heartbeats, Stamp::new(5, 50_000_000));
        assert_eq!(
            timings.get(&0).and_then(|t| t.average_interval),
            Some(Duration::from_millis(100))
        );
    }

    #[test]
    fn test_non_advancing_stamps_have_no_average() {
        let heartbeats = [at_ms(3, 100), at_ms(3, 100), at_ms(3, 40)];
        let timings = estimate(&heartbeats, Stamp::from_nanos(0));
        let three = timings.get(&3);
        assert_eq!(three.and_then(|t| t.average_interval), None);
        assert_eq!(three.map(|t| t.elapsed), Some(Duration::ZERO));
    }

    #[test]
    fn test_empty_input() {
        let empty: [Heartbeat; 0] = [];
        assert!(estimate(&empty, Stamp::ZERO).is_empty());
    }
}
