use super::linux::{parse_diskstats, read_table};
use super::{CounterSource, VolumeTable};
use crate::error::{Error, Result};
use crate::model::{CapacityTotals, DiskIo, MemoryTotals};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;
use sysinfo::{CpuRefreshKind, MemoryRefreshKind, RefreshKind, System};
use tracing::debug;

/// Counter source backed by `sysinfo`.
///
/// CPU usage needs two refreshes at least `MINIMUM_CPU_UPDATE_INTERVAL`
/// apart, so the measurement window is never shorter than that.
///
/// Disk I/O comes from the kernel device table when the host has one, so
/// whole disks are counted once and unmounted disks are not missed. Per-volume
/// totals are the fallback.
pub struct SysinfoSource {
    memory: Mutex<System>,
    cpu_window: Duration,
    volumes: VolumeTable,
    device_table: Option<PathBuf>,
}

impl SysinfoSource {
    pub fn new(cpu_window: Duration) -> Self {
        let memory = System::new_with_specifics(
            RefreshKind::nothing().with_memory(MemoryRefreshKind::nothing().with_ram()),
        );
        Self {
            memory: Mutex::new(memory),
            cpu_window: cpu_window.max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL),
            volumes: VolumeTable::new(),
            device_table: cfg!(target_os = "linux").then(|| PathBuf::from("/proc/diskstats")),
        }
    }

    /// Read per-device counters from `path` (diskstats format) instead of
    /// the default table.
    pub fn with_device_table(mut self, path: impl Into<PathBuf>) -> Self {
        self.device_table = Some(path.into());
        self
    }

    pub fn cpu_window(&self) -> Duration {
        self.cpu_window
    }
}

impl CounterSource for SysinfoSource {
    fn name(&self) -> &'static str {
        "sysinfo"
    }

    fn cpu_percent(&self) -> Result<f64> {
        // one System per measurement: a refresh from another caller would
        // otherwise cut this window short
        let mut sys = System::new_with_specifics(
            RefreshKind::nothing().with_cpu(CpuRefreshKind::nothing().with_cpu_usage()),
        );
        thread::sleep(self.cpu_window);
        sys.refresh_cpu_usage();
        if sys.cpus().is_empty() {
            return Err(Error::Unavailable("cpu usage"));
        }
        Ok(f64::from(sys.global_cpu_usage()).clamp(0.0, 100.0))
    }

    fn memory(&self) -> Result<MemoryTotals> {
        let mut sys = self.memory.lock().unwrap_or_else(|e| e.into_inner());
        sys.refresh_memory();
        let total_bytes = sys.total_memory();
        if total_bytes == 0 {
            return Err(Error::Unavailable("memory totals"));
        }
        Ok(MemoryTotals {
            total_bytes,
            available_bytes: sys.available_memory(),
        })
    }

    fn disk_io(&self) -> Result<DiskIo> {
        if let Some(path) = &self.device_table {
            match read_table(path) {
                Ok(table) => return Ok(DiskIo::Devices(parse_diskstats(&table))),
                Err(e) => debug!(error = %e, "no device table, using per-volume totals"),
            }
        }
        self.volumes.io_totals().map(DiskIo::Aggregate)
    }

    fn capacity(&self, path: &Path) -> Result<CapacityTotals> {
        self.volumes.capacity(path)
    }
}
