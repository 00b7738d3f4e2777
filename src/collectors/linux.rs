use super::{CounterSource, VolumeTable};
use crate::error::{Error, Result};
use crate::model::{CapacityTotals, CpuTicks, DeviceCounters, DiskIo, MemoryTotals};
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tracing::trace;

/// Counter source that parses the kernel's text tables under /proc.
pub struct ProcfsSource {
    /// Normally `/proc`; tests point this at a fixture directory.
    root: PathBuf,
    cpu_window: Duration,
    volumes: VolumeTable,
}

impl ProcfsSource {
    pub fn new(root: impl Into<PathBuf>, cpu_window: Duration) -> Self {
        Self {
            root: root.into(),
            cpu_window,
            volumes: VolumeTable::new(),
        }
    }

    fn read(&self, file: &str) -> Result<String> {
        read_table(&self.root.join(file))
    }

    fn cpu_ticks(&self) -> Result<CpuTicks> {
        parse_cpu_ticks(&self.read("stat")?)
    }
}

// ── parsers ─────────────────────────────────────────────────────────────

pub(crate) fn read_table(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.display().to_string(),
        source,
    })
}

/// Parse the aggregate `cpu ` line of /proc/stat.
///
/// total = sum of every column, idle = idle + iowait (columns 4 and 5).
pub fn parse_cpu_ticks(stat: &str) -> Result<CpuTicks> {
    let line = stat
        .lines()
        .next()
        .filter(|l| l.starts_with("cpu "))
        .ok_or_else(|| Error::parse("/proc/stat", "missing aggregate cpu line"))?;

    let values = line
        .split_whitespace()
        .skip(1)
        .map(|v| v.parse::<u64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::parse("/proc/stat", e.to_string()))?;
    if values.len() < 4 {
        return Err(Error::parse("/proc/stat", "fewer than four cpu columns"));
    }

    let total = values.iter().fold(0u64, |acc, v| acc.saturating_add(*v));
    let idle = values[3].saturating_add(values.get(4).copied().unwrap_or(0));
    Ok(CpuTicks { total, idle })
}

/// Busy percentage between two tick samples, or `None` when no ticks
/// elapsed (or the counters went backwards).
pub fn cpu_percent_between(before: CpuTicks, after: CpuTicks) -> Option<f64> {
    let total = after.total.checked_sub(before.total)?;
    if total == 0 {
        return None;
    }
    let idle = after.idle.saturating_sub(before.idle).min(total);
    let usage = (total - idle) as f64 / total as f64 * 100.0;
    Some(usage.clamp(0.0, 100.0))
}

/// Parse `MemTotal` and `MemAvailable` (kB) from /proc/meminfo.
pub fn parse_meminfo(meminfo: &str) -> Result<MemoryTotals> {
    let mut total = None;
    let mut available = None;
    for line in meminfo.lines() {
        if let Some(rest) = line.strip_prefix("MemTotal:") {
            total = parse_kb(rest);
        } else if let Some(rest) = line.strip_prefix("MemAvailable:") {
            available = parse_kb(rest);
        }
        if total.is_some() && available.is_some() {
            break;
        }
    }
    match (total, available) {
        (Some(total_bytes), Some(available_bytes)) if total_bytes > 0 => Ok(MemoryTotals {
            total_bytes,
            available_bytes,
        }),
        _ => Err(Error::parse(
            "/proc/meminfo",
            "MemTotal/MemAvailable missing or zero",
        )),
    }
}

fn parse_kb(rest: &str) -> Option<u64> {
    rest.split_whitespace()
        .next()?
        .parse::<u64>()
        .ok()
        .map(|kb| kb.saturating_mul(1024))
}

/// Parse /proc/diskstats into per-device sector counters.
///
/// Fields (0-indexed): 2 name, 5 sectors read, 9 sectors written.
/// Rows that are short or unparsable are skipped.
pub fn parse_diskstats(content: &str) -> Vec<DeviceCounters> {
    let mut devices = Vec::new();
    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 14 {
            continue;
        }
        let (Ok(read_sectors), Ok(write_sectors)) =
            (parts[5].parse::<u64>(), parts[9].parse::<u64>())
        else {
            trace!(row = line, "skipping malformed diskstats row");
            continue;
        };
        devices.push(DeviceCounters {
            name: parts[2].to_string(),
            read_sectors,
            write_sectors,
        });
    }
    devices
}

// ── trait implementation ────────────────────────────────────────────────

impl CounterSource for ProcfsSource {
    fn name(&self) -> &'static str {
        "procfs"
    }

    /// Busy percentage from two /proc/stat samples taken `cpu_window` apart.
    /// Keeps no state, so concurrent callers measure overlapping windows.
    fn cpu_percent(&self) -> Result<f64> {
        let before = self.cpu_ticks()?;
        thread::sleep(self.cpu_window);
        let after = self.cpu_ticks()?;
        cpu_percent_between(before, after).ok_or(Error::Unavailable("cpu ticks"))
    }

    fn memory(&self) -> Result<MemoryTotals> {
        parse_meminfo(&self.read("meminfo")?)
    }

    fn disk_io(&self) -> Result<DiskIo> {
        Ok(DiskIo::Devices(parse_diskstats(&self.read("diskstats")?)))
    }

    fn capacity(&self, path: &Path) -> Result<CapacityTotals> {
        self.volumes.capacity(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DISKSTATS: &str = "\
   7       0 loop0 55 0 2104 12 0 0 0 0 0 20 12 0 0 0 0
   8       0 sda 9000 100 204800 3000 5000 200 409600 7000 0 6000 10000 0 0 0 0
   8       1 sda1 8000 90 200000 2900 4900 190 400000 6900 0 5900 9800 0 0 0 0
 259       0 nvme0n1 100 0 800 10 50 0 400 5 0 12 15
 259       1 nvme0n1p1 oops 0 x 10 50 0 400 5 0 12 15
   8      16 sdb 1 2 3
";

    #[test]
    fn cpu_line_sums_all_columns() {
        let stat = "cpu  100 5 50 800 20 0 25 0 0 0\ncpu0 1 2 3 4 5\n";
        let ticks = parse_cpu_ticks(stat).unwrap();
        assert_eq!(ticks.total, 1000);
        assert_eq!(ticks.idle, 820);
    }

    #[test]
    fn cpu_line_must_come_first() {
        assert!(parse_cpu_ticks("intr 1 2 3\ncpu  1 2 3 4\n").is_err());
        assert!(parse_cpu_ticks("").is_err());
        assert!(parse_cpu_ticks("cpu  1 2 x 4\n").is_err());
    }

    #[test]
    fn cpu_percent_stays_in_range() {
        let pairs = [
            ((1000, 800), (2000, 1300)),
            ((1000, 800), (1001, 800)),
            ((1000, 800), (1500, 1300)),
            ((0, 0), (u64::MAX / 2, 0)),
        ];
        for ((t1, i1), (t2, i2)) in pairs {
            let pct = cpu_percent_between(
                CpuTicks { total: t1, idle: i1 },
                CpuTicks { total: t2, idle: i2 },
            )
            .unwrap();
            assert!((0.0..=100.0).contains(&pct), "{pct} out of range");
        }
        let half = cpu_percent_between(
            CpuTicks { total: 1000, idle: 800 },
            CpuTicks { total: 2000, idle: 1300 },
        );
        assert_eq!(half, Some(50.0));
    }

    #[test]
    fn cpu_percent_needs_elapsed_ticks() {
        let t = CpuTicks { total: 10, idle: 5 };
        assert_eq!(cpu_percent_between(t, t), None);
        assert_eq!(
            cpu_percent_between(t, CpuTicks { total: 9, idle: 5 }),
            None
        );
    }

    #[test]
    fn meminfo_in_bytes() {
        let mem = parse_meminfo(
            "MemTotal:       16000000 kB\nMemFree:  100 kB\nMemAvailable:    4000000 kB\n",
        )
        .unwrap();
        assert_eq!(mem.total_bytes, 16_000_000 * 1024);
        assert_eq!(mem.available_bytes, 4_000_000 * 1024);
    }

    #[test]
    fn meminfo_without_available_is_an_error() {
        assert!(parse_meminfo("MemTotal: 100 kB\nMemFree: 50 kB\n").is_err());
        assert!(parse_meminfo("MemTotal: 0 kB\nMemAvailable: 0 kB\n").is_err());
    }

    #[test]
    fn diskstats_skips_malformed_rows() {
        let devices = parse_diskstats(DISKSTATS);
        let names: Vec<&str> = devices.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["loop0", "sda", "sda1", "nvme0n1"]);
        assert_eq!(devices[1].read_sectors, 204800);
        assert_eq!(devices[1].write_sectors, 409600);
    }

    #[test]
    fn missing_tables_fail_independently() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("meminfo"),
            "MemTotal: 2048 kB\nMemAvailable: 1024 kB\n",
        )
        .unwrap();
        let source = ProcfsSource::new(dir.path(), Duration::ZERO);
        assert!(source.cpu_percent().is_err());
        assert!(source.disk_io().is_err());
        let mem = source.memory().unwrap();
        assert_eq!(mem.used_percent(), Some(50.0));
    }
}
