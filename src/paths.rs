//! Deterministic file naming for ring buffer and interchange files.

use std::path::{Path, PathBuf};

use crate::error::TransferResult;
use crate::schema::DeviceRecord;

/// Ring buffer filename for one device subset: `<device-id>-<interval>.rra`.
pub fn ring_file_path(dir: &Path, device_id: &str, interval: &str) -> PathBuf {
    dir.join(format!("{device_id}-{interval}.rra"))
}

/// Interchange filename for one device subset, or `None` when the device has
/// no resolved display name (nothing was ever exported for it).
///
/// The name is `<display-name>_<variable>_<interval>.csv`; thermostat
/// devices predate the variable segment and omit it.
pub fn interchange_file_path(
    dir: &Path,
    record: &DeviceRecord,
    index: usize,
) -> TransferResult<Option<PathBuf>> {
    let subset = record.subset(index)?;
    let Some(name) = record.display_name.as_deref() else {
        return Ok(None);
    };

    let file = if name.starts_with("thermstat") {
        format!("{name}_{}.csv", subset.interval)
    } else {
        format!("{name}_{}_{}.csv", record.variable, subset.interval)
    };
    Ok(Some(dir.join(file)))
}
