use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use clap::ValueEnum;
use sysinfo::Disks;
use tracing::info;

use crate::error::{Error, Result};
use crate::model::{CapacityTotals, DiskIo, IoTotals, MemoryTotals};

pub mod devices;
pub mod introspect;
pub mod linux;

pub use introspect::SysinfoSource;
pub use linux::ProcfsSource;

/// Source of raw host counters.
/// Implementations (SysinfoSource, ProcfsSource) handle the low-level details;
/// every method fails independently so one broken table never hides the others.
///
/// Methods are called from several request threads at once. Any shared state
/// is locked only around its own refresh, never across the CPU window.
pub trait CounterSource: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Instantaneous CPU busy percentage. Blocks for the source's
    /// measurement window.
    fn cpu_percent(&self) -> Result<f64>;

    /// Memory totals (bytes).
    fn memory(&self) -> Result<MemoryTotals>;

    /// Cumulative disk I/O counters.
    fn disk_io(&self) -> Result<DiskIo>;

    /// Capacity of the volume that holds `path`.
    fn capacity(&self, path: &Path) -> Result<CapacityTotals>;
}

/// Which counter source to run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    /// Use the introspection library when the platform supports it,
    /// otherwise parse /proc directly.
    Auto,
    Sysinfo,
    Procfs,
}

/// Pick a counter source once, at startup.
pub fn detect(kind: SourceKind, cpu_window: Duration) -> Box<dyn CounterSource> {
    let source: Box<dyn CounterSource> = match kind {
        SourceKind::Sysinfo => Box::new(SysinfoSource::new(cpu_window)),
        SourceKind::Procfs => Box::new(ProcfsSource::new("/proc", cpu_window)),
        SourceKind::Auto if sysinfo::IS_SUPPORTED_SYSTEM => {
            Box::new(SysinfoSource::new(cpu_window))
        }
        SourceKind::Auto => Box::new(ProcfsSource::new("/proc", cpu_window)),
    };
    info!(source = source.name(), "counter source selected");
    source
}

// ── volume capacity ─────────────────────────────────────────────────────

/// Mounted volumes, used by both sources for disk capacity.
pub struct VolumeTable {
    disks: Mutex<Disks>,
}

impl VolumeTable {
    pub fn new() -> Self {
        Self {
            disks: Mutex::new(Disks::new_with_refreshed_list()),
        }
    }

    fn refreshed(&self) -> MutexGuard<'_, Disks> {
        let mut disks = self.disks.lock().unwrap_or_else(|e| e.into_inner());
        disks.refresh(true);
        disks
    }

    /// Capacity of the volume whose mount point is the longest prefix of
    /// `path`.
    pub fn capacity(&self, path: &Path) -> Result<CapacityTotals> {
        self.refreshed()
            .list()
            .iter()
            .filter(|d| path.starts_with(d.mount_point()))
            .max_by_key(|d| d.mount_point().as_os_str().len())
            .map(|d| CapacityTotals {
                total_bytes: d.total_space(),
                available_bytes: d.available_space(),
            })
            .ok_or(Error::Unavailable("disk capacity"))
    }

    /// Cumulative read/write bytes over all mounted volumes, counting each
    /// backing device once. Only used where there is no kernel device table.
    pub fn io_totals(&self) -> Result<IoTotals> {
        let disks = self.refreshed();
        let mut seen = HashSet::new();
        let mut totals = IoTotals::default();
        for disk in disks.list() {
            if !seen.insert(disk.name().to_os_string()) {
                continue;
            }
            let usage = disk.usage();
            totals.read_bytes = totals.read_bytes.saturating_add(usage.total_read_bytes);
            totals.write_bytes = totals.write_bytes.saturating_add(usage.total_written_bytes);
        }
        if seen.is_empty() {
            return Err(Error::Unavailable("disk i/o counters"));
        }
        Ok(totals)
    }
}

impl Default for VolumeTable {
    fn default() -> Self {
        Self::new()
    }
}
