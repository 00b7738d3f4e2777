// Re-export all model types from submodules.

pub use logs::LogLine;
pub use system::{
    CapacityTotals, CpuTicks, DeviceCounters, DiskIo, IoTotals, MemoryTotals, MetricSnapshot,
    SECTOR_SIZE,
};

mod logs;
mod system;
