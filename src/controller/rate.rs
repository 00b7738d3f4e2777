//! Turn cumulative counters into per-second rates.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Shortest interval a rate is divided by.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// One reading of a cumulative read/write counter pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CounterSample {
    pub read_units: u64,
    pub write_units: u64,
    pub captured_at: Instant,
}

/// Read/write units per second.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct IoRate {
    pub read_per_sec: f64,
    pub write_per_sec: f64,
}

impl IoRate {
    pub fn total(&self) -> f64 {
        self.read_per_sec + self.write_per_sec
    }
}

impl std::ops::Add for IoRate {
    type Output = IoRate;

    fn add(self, rhs: IoRate) -> IoRate {
        IoRate {
            read_per_sec: self.read_per_sec + rhs.read_per_sec,
            write_per_sec: self.write_per_sec + rhs.write_per_sec,
        }
    }
}

/// Previous sample per counter stream.
#[derive(Debug, Default)]
pub struct RateTracker {
    prev: Mutex<HashMap<String, CounterSample>>,
}

impl RateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new reading for `key` and return the rate since the previous
    /// one.
    ///
    /// Returns `None` on the first reading of a key. A counter that went
    /// backwards (reset) yields 0 for that side. The new reading always
    /// replaces the stored one.
    pub fn observe(&self, key: &str, read: u64, write: u64, now: Instant) -> Option<IoRate> {
        let current = CounterSample {
            read_units: read,
            write_units: write,
            captured_at: now,
        };
        let mut prev = self.prev.lock().unwrap_or_else(|e| e.into_inner());
        let previous = prev.insert(key.to_string(), current)?;

        let elapsed = now
            .saturating_duration_since(previous.captured_at)
            .max(MIN_INTERVAL)
            .as_secs_f64();
        Some(IoRate {
            read_per_sec: read.saturating_sub(previous.read_units) as f64 / elapsed,
            write_per_sec: write.saturating_sub(previous.write_units) as f64 / elapsed,
        })
    }

    /// Drop streams whose key is not in `live`, e.g. unplugged devices.
    pub fn retain<'a>(&self, live: impl IntoIterator<Item = &'a str>) {
        let live: Vec<&str> = live.into_iter().collect();
        let mut prev = self.prev.lock().unwrap_or_else(|e| e.into_inner());
        prev.retain(|key, _| live.contains(&key.as_str()));
    }

    pub fn len(&self) -> usize {
        self.prev.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_observation_is_not_measurable() {
        let tracker = RateTracker::new();
        assert_eq!(tracker.observe("sda", 100, 100, Instant::now()), None);
    }

    #[test]
    fn rate_over_elapsed_time() {
        let tracker = RateTracker::new();
        let t0 = Instant::now();
        tracker.observe("sda", 1000, 500, t0);
        let rate = tracker
            .observe("sda", 3000, 1500, t0 + Duration::from_secs(2))
            .unwrap();
        assert_eq!(rate.read_per_sec, 1000.0);
        assert_eq!(rate.write_per_sec, 500.0);
        assert_eq!(rate.total(), 1500.0);
    }

    #[test]
    fn counter_reset_is_zero_not_negative() {
        let tracker = RateTracker::new();
        let t0 = Instant::now();
        tracker.observe("sda", 1000, 1000, t0);
        let rate = tracker
            .observe("sda", 10, 5, t0 + Duration::from_secs(1))
            .unwrap();
        assert_eq!(rate, IoRate::default());

        // re-baselined at the reset value
        let rate = tracker
            .observe("sda", 110, 5, t0 + Duration::from_secs(2))
            .unwrap();
        assert_eq!(rate.read_per_sec, 100.0);
    }

    #[test]
    fn zero_interval_does_not_divide_by_zero() {
        let tracker = RateTracker::new();
        let t0 = Instant::now();
        tracker.observe("k", 0, 0, t0);
        let rate = tracker.observe("k", 1, 0, t0).unwrap();
        assert!(rate.read_per_sec.is_finite());
        assert_eq!(rate.read_per_sec, 1000.0);
    }

    #[test]
    fn keys_are_independent() {
        let tracker = RateTracker::new();
        let t0 = Instant::now();
        tracker.observe("a", 0, 0, t0);
        assert_eq!(tracker.observe("b", 10, 10, t0), None);
        assert!(tracker.observe("a", 10, 10, t0 + Duration::from_secs(1)).is_some());
        tracker.retain(["a"]);
        assert_eq!(tracker.len(), 1);
    }
}
