//! Metric sampling: counter source → device filter → rate tracker → snapshot.

mod activity;
mod rate;

pub use activity::ActivityLog;
pub use rate::{CounterSample, IoRate, RateTracker};

use std::path::PathBuf;
use std::time::Instant;

use chrono::Utc;
use tracing::debug;

use crate::collectors::{devices, CounterSource};
use crate::error::Result;
use crate::model::{DiskIo, IoTotals, MetricSnapshot};

/// Throughput shown as 100% I/O activity: 100 MiB/s.
pub const DEFAULT_IO_CEILING_BYTES: f64 = 100.0 * 1024.0 * 1024.0;

const AGGREGATE_KEY: &str = "aggregate";

#[derive(Clone, Debug)]
pub struct SamplerSettings {
    /// Path whose volume is reported as `disk_percent`.
    pub disk_path: PathBuf,
    /// Bytes per second that map to `io_percent = 100`.
    pub io_ceiling_bytes: f64,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            disk_path: PathBuf::from("/"),
            io_ceiling_bytes: DEFAULT_IO_CEILING_BYTES,
        }
    }
}

/// Builds `MetricSnapshot`s from a counter source.
pub struct Sampler {
    source: Box<dyn CounterSource>,
    rates: RateTracker,
    settings: SamplerSettings,
    host: String,
    os: String,
}

impl Sampler {
    pub fn new(source: Box<dyn CounterSource>, settings: SamplerSettings) -> Self {
        Self {
            source,
            rates: RateTracker::new(),
            settings,
            host: host_name(),
            os: os_family().to_string(),
        }
    }

    /// Take one snapshot. Blocks for the source's CPU measurement window;
    /// never fails, unavailable metrics fall back to 0 / null. Concurrent
    /// calls measure overlapping windows.
    pub fn snapshot(&self) -> MetricSnapshot {
        let source = &self.source;
        let cpu = available("cpu", source.cpu_percent());
        let memory = available("memory", source.memory());
        let capacity = available("disk capacity", source.capacity(&self.settings.disk_path));
        let disk_io = available("disk i/o", source.disk_io());

        let (io_totals, io_rate) = match disk_io {
            Some(io) => self.io_activity(io, Instant::now()),
            None => (IoTotals::default(), None),
        };
        let io_percent = io_rate
            .map(|r| r.total() / self.settings.io_ceiling_bytes.max(1.0) * 100.0)
            .unwrap_or(0.0);

        MetricSnapshot {
            cpu_percent: percent(cpu.unwrap_or(0.0)),
            memory_percent: percent(memory.and_then(|m| m.used_percent()).unwrap_or(0.0)),
            memory_free_gb: memory.map(|m| round2(m.available_gb())),
            disk_percent: percent(capacity.and_then(|c| c.used_percent()).unwrap_or(0.0)),
            io_percent: percent(io_percent),
            io_read_bytes: io_totals.read_bytes,
            io_write_bytes: io_totals.write_bytes,
            updated_at: Utc::now().timestamp_millis(),
            host: self.host.clone(),
            os: self.os.clone(),
        }
    }

    /// Snapshot with every metric at its default, for when sampling could
    /// not run at all.
    pub fn empty_snapshot(&self) -> MetricSnapshot {
        MetricSnapshot {
            cpu_percent: 0.0,
            memory_percent: 0.0,
            memory_free_gb: None,
            disk_percent: 0.0,
            io_percent: 0.0,
            io_read_bytes: 0,
            io_write_bytes: 0,
            updated_at: Utc::now().timestamp_millis(),
            host: self.host.clone(),
            os: self.os.clone(),
        }
    }

    /// Cumulative totals plus the byte rate since the previous call, if
    /// there was one.
    fn io_activity(&self, io: DiskIo, now: Instant) -> (IoTotals, Option<IoRate>) {
        match io {
            DiskIo::Aggregate(totals) => {
                let rate =
                    self.rates
                        .observe(AGGREGATE_KEY, totals.read_bytes, totals.write_bytes, now);
                (totals, rate)
            }
            DiskIo::Devices(rows) => {
                let disks = devices::whole_disks(rows);
                let mut totals = IoTotals::default();
                let mut rate: Option<IoRate> = None;
                for disk in &disks {
                    let (read, write) = (disk.read_bytes(), disk.write_bytes());
                    totals.read_bytes = totals.read_bytes.saturating_add(read);
                    totals.write_bytes = totals.write_bytes.saturating_add(write);
                    // devices seen for the first time don't contribute yet
                    if let Some(r) = self.rates.observe(&disk.name, read, write, now) {
                        rate = Some(rate.unwrap_or_default() + r);
                    }
                }
                self.rates.retain(disks.iter().map(|d| d.name.as_str()));
                (totals, rate)
            }
        }
    }
}

fn available<T>(metric: &'static str, result: Result<T>) -> Option<T> {
    result
        .map_err(|e| debug!(metric, error = %e, "metric unavailable"))
        .ok()
}

fn percent(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    round2(value.clamp(0.0, 100.0))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn host_name() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Operating system family in the spelling dashboards already expect.
pub fn os_family() -> &'static str {
    match std::env::consts::OS {
        "linux" => "Linux",
        "macos" => "Darwin",
        "windows" => "Windows",
        "freebsd" => "FreeBSD",
        other => other,
    }
}
