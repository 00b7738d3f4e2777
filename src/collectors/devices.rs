//! Whole-disk detection for the block-device statistics table.
//!
//! The kernel lists partitions next to their parent device, so summing every
//! row counts the same I/O twice. Only whole disks are kept.

use crate::model::DeviceCounters;

/// Name families whose partitions are spelled with a trailing index
/// (`sda1`, `vdb2`, `xvda1`).
const INDEXED_FAMILIES: [&str; 3] = ["sd", "vd", "xvd"];

/// Return `true` if `name` is a whole disk rather than a partition or a
/// loop/ram device. Unknown families are rejected.
pub fn is_whole_disk(name: &str) -> bool {
    if name.starts_with("loop") || name.starts_with("ram") {
        return false;
    }
    // nvme0n1 (namespace) vs nvme0n1p1 (partition)
    if let Some(rest) = name.strip_prefix("nvme") {
        return !rest.is_empty() && !rest.contains('p');
    }
    if INDEXED_FAMILIES.iter().any(|prefix| name.starts_with(prefix)) {
        return !name.ends_with(|c: char| c.is_ascii_digit());
    }
    false
}

/// Keep only whole disks, sorted by name with duplicate names collapsed so
/// the result does not depend on enumeration order.
pub fn whole_disks(devices: Vec<DeviceCounters>) -> Vec<DeviceCounters> {
    let mut kept: Vec<DeviceCounters> = devices
        .into_iter()
        .filter(|d| is_whole_disk(&d.name))
        .collect();
    kept.sort_by(|a, b| {
        a.name
            .cmp(&b.name)
            .then(a.read_sectors.cmp(&b.read_sectors))
            .then(a.write_sectors.cmp(&b.write_sectors))
    });
    kept.dedup_by(|a, b| a.name == b.name);
    kept
}
