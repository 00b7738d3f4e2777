use serde::{Deserialize, Serialize};

/// Bytes per sector in /proc/diskstats, regardless of the device's
/// physical sector size.
pub const SECTOR_SIZE: u64 = 512;

// --- Raw counters ---

/// Aggregate CPU tick counters from the first line of /proc/stat.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CpuTicks {
    pub total: u64,
    /// idle + iowait
    pub idle: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemoryTotals {
    pub total_bytes: u64,
    pub available_bytes: u64,
}

/// Capacity of the volume backing the monitored path.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CapacityTotals {
    pub total_bytes: u64,
    pub available_bytes: u64,
}

/// One row of the block-device statistics table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceCounters {
    pub name: String,
    pub read_sectors: u64,
    pub write_sectors: u64,
}

impl DeviceCounters {
    pub fn read_bytes(&self) -> u64 {
        self.read_sectors.saturating_mul(SECTOR_SIZE)
    }

    pub fn write_bytes(&self) -> u64 {
        self.write_sectors.saturating_mul(SECTOR_SIZE)
    }
}

/// Cumulative I/O byte totals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IoTotals {
    pub read_bytes: u64,
    pub write_bytes: u64,
}

/// Disk I/O counters as reported by a counter source.
#[derive(Clone, Debug, PartialEq)]
pub enum DiskIo {
    /// Raw per-device rows; partitions and virtual devices are still in
    /// here and must be filtered out before summing.
    Devices(Vec<DeviceCounters>),
    /// Totals already aggregated by the introspection library.
    Aggregate(IoTotals),
}

// --- Snapshot served by /monitor ---

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetricSnapshot {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub memory_free_gb: Option<f64>,
    pub disk_percent: f64,
    pub io_percent: f64,
    pub io_read_bytes: u64,
    pub io_write_bytes: u64,
    /// Epoch milliseconds.
    pub updated_at: i64,
    pub host: String,
    pub os: String,
}

impl MemoryTotals {
    /// Used share of memory, or `None` when the totals are unusable.
    pub fn used_percent(&self) -> Option<f64> {
        if self.total_bytes == 0 {
            return None;
        }
        let used = self.total_bytes.saturating_sub(self.available_bytes) as f64;
        Some(used / self.total_bytes as f64 * 100.0)
    }

    pub fn available_gb(&self) -> f64 {
        self.available_bytes as f64 / (1024.0 * 1024.0 * 1024.0)
    }
}

impl CapacityTotals {
    pub fn used_percent(&self) -> Option<f64> {
        if self.total_bytes == 0 {
            return None;
        }
        let used = self.total_bytes.saturating_sub(self.available_bytes) as f64;
        Some(used / self.total_bytes as f64 * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_percent_from_totals() {
        let mem = MemoryTotals {
            total_bytes: 16_000_000 * 1024,
            available_bytes: 4_000_000 * 1024,
        };
        assert!((mem.used_percent().unwrap() - 75.0).abs() < 1e-9);
        assert!((mem.available_gb() - 3.8147).abs() < 1e-3);
    }

    #[test]
    fn zero_total_is_unusable() {
        assert_eq!(MemoryTotals::default().used_percent(), None);
        assert_eq!(CapacityTotals::default().used_percent(), None);
    }

    #[test]
    fn sectors_convert_to_bytes() {
        let dev = DeviceCounters {
            name: "sda".into(),
            read_sectors: 2,
            write_sectors: 3,
        };
        assert_eq!(dev.read_bytes(), 1024);
        assert_eq!(dev.write_bytes(), 1536);
    }
}
