//! Device-name resolution from the appliance's logger registry.
//!
//! The registry is a JSON document listing every logger the appliance knows,
//! keyed by device id:
//!
//! ```json
//! [
//!   { "uuid": "2b34cf5e-...", "name": "gas_quantity" },
//!   { "uuid": "8a11de90-...", "name": "elec_delivered_lt" }
//! ]
//! ```
//!
//! Display names drive the interchange filenames; a device missing from the
//! registry simply has no interchange counterpart and is skipped upstream.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Deserialize;

use crate::error::TransferResult;

#[derive(Debug, Deserialize)]
struct RegistryEntry {
    uuid: String,
    name: String,
}

/// Look up the display name registered for `device_id`.
///
/// Returns `Ok(None)` when the registry has no entry for the device.
pub fn resolve(path: &Path, device_id: &str) -> TransferResult<Option<String>> {
    let file = File::open(path)?;
    let entries: Vec<RegistryEntry> = serde_json::from_reader(BufReader::new(file))?;
    Ok(entries
        .into_iter()
        .find(|entry| entry.uuid == device_id)
        .map(|entry| entry.name))
}
