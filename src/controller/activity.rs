//! Throttled one-line summaries of served snapshots.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::info;

use super::RateTracker;
use crate::model::MetricSnapshot;

/// Minimum gap between two summary lines.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(1500);

const MIB: f64 = 1024.0 * 1024.0;

/// Logs `monitor cpu=..% ram=..% ...` for snapshots that were served,
/// at most once per interval, so viewers of the live tail see activity.
pub struct ActivityLog {
    interval: Duration,
    last: Mutex<Option<Instant>>,
    rates: RateTracker,
}

impl ActivityLog {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Mutex::new(None),
            rates: RateTracker::new(),
        }
    }

    /// Returns whether a line was logged.
    pub fn record(&self, snapshot: &MetricSnapshot) -> bool {
        self.record_at(snapshot, Instant::now())
    }

    fn record_at(&self, snapshot: &MetricSnapshot, now: Instant) -> bool {
        {
            let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
            match *last {
                Some(prev) if now.saturating_duration_since(prev) < self.interval => return false,
                _ => *last = Some(now),
            }
        }

        let line = summary(
            snapshot,
            self.rates
                .observe("monitor", snapshot.io_read_bytes, snapshot.io_write_bytes, now)
                .map(|r| (r.read_per_sec / MIB, r.write_per_sec / MIB)),
        );
        info!("{line}");
        true
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL)
    }
}

fn summary(snapshot: &MetricSnapshot, mb_per_sec: Option<(f64, f64)>) -> String {
    let mut line = format!(
        "monitor cpu={:?}% ram={:?}% disk={:?}%",
        snapshot.cpu_percent, snapshot.memory_percent, snapshot.disk_percent
    );
    if let Some((read, write)) = mb_per_sec {
        line.push_str(&format!(" ioR={read:.2}MB/s ioW={write:.2}MB/s"));
    }
    line
}
