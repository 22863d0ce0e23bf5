//! Pinning a liveliness loss on one source.
//!
//! The most overdue source is the one whose silence is longest relative to
//! its own heartbeat rhythm, so a slow source that is merely between beats
//! is not blamed for a fast source going quiet.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::time::Duration;
use sw_watchdog_msgs::Heartbeat;

use crate::error::DetectionError;
use crate::estimator::SourceTiming;

/// The source blamed for a liveliness loss.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribution {
    /// Most recent cached heartbeat of the blamed source.
    pub heartbeat: Heartbeat,
    /// Silence of the blamed source at detection time.
    pub elapsed: Duration,
    /// `elapsed / average_interval`, absent when the average is unknown.
    pub overdue_ratio: Option<f64>,
}

impl Attribution {
    /// Blamed source id.
    #[must_use]
    pub fn source_id(&self) -> u16 {
        self.heartbeat.source_id
    }

    fn from_timing(timing: &SourceTiming) -> Self {
        let overdue_ratio = timing
            .average_interval
            .map(|average| timing.elapsed.as_secs_f64() / average.as_secs_f64());
        Self {
            heartbeat: timing.latest.clone(),
            elapsed: timing.elapsed,
            overdue_ratio,
        }
    }
}

/// Choose the most overdue source.
///
/// Sources with a known average compete on `elapsed / average_interval`, but
/// only while overdue: silent for longer than their average or than `lease`.
/// Only when none of them is overdue may a source with an unknown average be
/// chosen on raw silence, and then only if that silence exceeds `lease`.
/// Ties go to the smallest source id.
///
/// # Errors
///
/// Returns [`DetectionError::EmptyCache`] when `timings` is empty and
/// [`DetectionError::NoQualifyingSource`] when nothing qualifies.
pub fn attribute(
    timings: &BTreeMap<u16, SourceTiming>,
    lease: Duration,
) -> Result<Attribution, DetectionError> {
    if timings.is_empty() {
        return Err(DetectionError::EmptyCache);
    }

    let mut best: Option<(&SourceTiming, Duration)> = None;
    for timing in timings.values() {
        let Some(average) = timing.average_interval else {
            continue;
        };
        if timing.elapsed <= average && timing.elapsed <= lease {
            continue;
        }
        let beats_best = best.is_none_or(|(current, current_average)| {
            compare_ratios(timing.elapsed, average, current.elapsed, current_average)
                == Ordering::Greater
        });
        if beats_best {
            best = Some((timing, average));
        }
    }
    if let Some((timing, _)) = best {
        return Ok(Attribution::from_timing(timing));
    }

    let mut longest: Option<&SourceTiming> = None;
    for timing in timings.values().filter(|timing| timing.elapsed > lease) {
        if longest.is_none_or(|current| timing.elapsed > current.elapsed) {
            longest = Some(timing);
        }
    }
    longest
        .map(Attribution::from_timing)
        .ok_or(DetectionError::NoQualifyingSource)
}

/// Compare `elapsed_a / average_a` with `elapsed_b / average_b` without
/// rounding.
fn compare_ratios(
    elapsed_a: Duration,
    average_a: Duration,
    elapsed_b: Duration,
    average_b: Duration,
) -> Ordering {
    let lhs = elapsed_a.as_nanos().saturating_mul(average_b.as_nanos());
    let rhs = elapsed_b.as_nanos().saturating_mul(average_a.as_nanos());
    lhs.cmp(&rhs)
}
