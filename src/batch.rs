//! Batch processing of a directory of schema files.
//!
//! A migration run walks every schema (".dat") file in a directory and
//! processes its device's ring buffers one by one. Per-device and per-subset
//! failures are logged and the run continues with the next; only failing to
//! enumerate the directory itself aborts. Each ring buffer file together
//! with its schema file is a read-modify-write unit handled to completion
//! before the next is touched.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::cutoff::Cutoff;
use crate::error::{TransferError, TransferResult};
use crate::interchange;
use crate::merge::merge_series;
use crate::paths::{interchange_file_path, ring_file_path};
use crate::registry;
use crate::ring::slot_times;
use crate::ringfile;
use crate::sample::{Sample, SampleKind};
use crate::schema::{read_schema_file, DeviceRecord, SubsetRecord};

/// Options for an import run (merge uploaded data into local databases).
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Directory of the replacement unit's schema and ring buffer files.
    pub database_dir: PathBuf,
    /// Directory holding the uploaded interchange files.
    pub feed_dir: PathBuf,
    /// Registry document naming the local devices.
    pub registry_path: PathBuf,
    /// Import time limit.
    pub cutoff: Cutoff,
}

/// Options for an export run (project old ring buffers into interchange
/// rows).
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Directory holding the old unit's schema and ring buffer files;
    /// interchange output lands here too.
    pub data_dir: PathBuf,
    /// Registry document naming the old unit's devices.
    pub registry_path: PathBuf,
}

/// Outcome counts of one batch run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchReport {
    /// Schema files found in the directory.
    pub schemas_found: usize,
    /// Devices processed to completion.
    pub devices_processed: usize,
    /// Devices skipped because they were never provisioned.
    pub devices_skipped: usize,
    /// Devices that failed and were logged.
    pub devices_failed: usize,
    /// Subsets whose ring buffer (import) or interchange file (export) was
    /// written.
    pub subsets_written: usize,
}

/// Merge uploaded interchange data into every database under
/// `opts.database_dir`.
pub fn import_directory(opts: &ImportOptions) -> TransferResult<BatchReport> {
    run_batch(&opts.database_dir, |schema_path| {
        import_device(schema_path, opts)
    })
}

/// Project every ring buffer under `opts.data_dir` into interchange files
/// alongside it.
pub fn export_directory(opts: &ExportOptions) -> TransferResult<BatchReport> {
    run_batch(&opts.data_dir, |schema_path| {
        export_device(schema_path, opts)
    })
}

fn run_batch(
    dir: &Path,
    mut process: impl FnMut(&Path) -> TransferResult<usize>,
) -> TransferResult<BatchReport> {
    let files = schema_files(dir)?;
    if files.is_empty() {
        return Err(TransferError::NothingImportable(dir.to_path_buf()));
    }

    let mut report = BatchReport {
        schemas_found: files.len(),
        ..BatchReport::default()
    };

    for path in &files {
        info!(path = %path.display(), "found schema file");
        match process(path) {
            Ok(written) => {
                report.devices_processed += 1;
                report.subsets_written += written;
            }
            Err(TransferError::NotProvisioned) => {
                info!(
                    path = %path.display(),
                    "database not yet initialised, continuing"
                );
                report.devices_skipped += 1;
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "device failed, continuing");
                report.devices_failed += 1;
            }
        }
    }

    Ok(report)
}

/// Enumerate schema files in `dir`, sorted for a stable processing order.
fn schema_files(dir: &Path) -> TransferResult<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "dat"))
        .collect();
    files.sort();
    Ok(files)
}

/// The schema file's stem names the device on disk.
fn device_id_from(schema_path: &Path) -> String {
    schema_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn load_device(schema_path: &Path, registry_path: &Path) -> TransferResult<(DeviceRecord, String)> {
    let mut record = read_schema_file(schema_path)?;
    if !record.is_provisioned() {
        return Err(TransferError::NotProvisioned);
    }

    let device_id = device_id_from(schema_path);
    record.display_name = match registry::resolve(registry_path, &device_id) {
        Ok(name) => name,
        Err(err) => {
            warn!(
                path = %registry_path.display(),
                error = %err,
                "cannot read device registry, treating device as unnamed"
            );
            None
        }
    };
    debug!(device = %device_id, subsets = record.subsets.len(), kind = %record.sample_kind,
           name = record.display_name.as_deref().unwrap_or("-"), "decoded schema record");
    Ok((record, device_id))
}

fn import_device(schema_path: &Path, opts: &ImportOptions) -> TransferResult<usize> {
    let (record, device_id) = load_device(schema_path, &opts.registry_path)?;

    let mut written = 0usize;
    for index in 0..record.subsets.len() {
        match import_subset(&record, index, &device_id, opts) {
            Ok(true) => written += 1,
            Ok(false) => {}
            Err(err) => warn!(
                device = %device_id,
                subset = index,
                error = %err,
                "subset import failed, continuing"
            ),
        }
    }
    Ok(written)
}

fn import_subset(
    record: &DeviceRecord,
    index: usize,
    device_id: &str,
    opts: &ImportOptions,
) -> TransferResult<bool> {
    let subset = record.subset(index)?;
    if subset.capacity == 0 {
        debug!(device = %device_id, subset = index, "empty ring, nothing to merge");
        return Ok(false);
    }
    if subset.sample_interval() <= 0 {
        warn!(
            device = %device_id,
            subset = index,
            "degenerate sampling interval, skipping subset"
        );
        return Ok(false);
    }

    let Some(feed_path) = interchange_file_path(&opts.feed_dir, record, index)? else {
        debug!(device = %device_id, "no display name registered, skipping subset");
        return Ok(false);
    };
    if !feed_path.is_file() {
        info!(
            path = %feed_path.display(),
            "no interchange data for this subset, keeping ring as-is"
        );
        return Ok(false);
    }

    let ring_path = ring_file_path(&opts.database_dir, device_id, &subset.interval);
    let times = slot_times(subset);

    match record.sample_kind {
        SampleKind::Integer => {
            merge_into_ring::<i32>(&ring_path, &feed_path, subset, &times, opts.cutoff)?;
        }
        SampleKind::Float => {
            merge_into_ring::<f64>(&ring_path, &feed_path, subset, &times, opts.cutoff)?;
        }
    }
    info!(path = %ring_path.display(), "ring buffer rewritten");
    Ok(true)
}

fn merge_into_ring<T: Sample>(
    ring_path: &Path,
    feed_path: &Path,
    subset: &SubsetRecord,
    times: &[i64],
    cutoff: Cutoff,
) -> TransferResult<()> {
    let ring_values: Vec<T> = ringfile::read_ring(ring_path, subset.capacity)?;
    let (feed_times, feed_values) = interchange::read_series::<T>(feed_path, cutoff)?;
    let merged = merge_series(&ring_values, times, subset.offset, &feed_times, &feed_values);
    ringfile::write_ring(ring_path, &merged)
}

fn export_device(schema_path: &Path, opts: &ExportOptions) -> TransferResult<usize> {
    let (record, device_id) = load_device(schema_path, &opts.registry_path)?;

    let mut written = 0usize;
    for index in 0..record.subsets.len() {
        match export_subset(&record, index, &device_id, opts) {
            Ok(true) => written += 1,
            Ok(false) => {}
            Err(err) => warn!(
                device = %device_id,
                subset = index,
                error = %err,
                "subset export failed, continuing"
            ),
        }
    }
    Ok(written)
}

fn export_subset(
    record: &DeviceRecord,
    index: usize,
    device_id: &str,
    opts: &ExportOptions,
) -> TransferResult<bool> {
    let subset = record.subset(index)?;
    if subset.capacity == 0 {
        return Ok(false);
    }
    let Some(csv_path) = interchange_file_path(&opts.data_dir, record, index)? else {
        debug!(device = %device_id, "no display name registered, skipping subset");
        return Ok(false);
    };

    let ring_path = ring_file_path(&opts.data_dir, device_id, &subset.interval);
    let times = slot_times(subset);

    let rows = match record.sample_kind {
        SampleKind::Integer => project_ring::<i32>(&ring_path, &csv_path, subset, &times)?,
        SampleKind::Float => project_ring::<f64>(&ring_path, &csv_path, subset, &times)?,
    };
    info!(path = %csv_path.display(), rows, "interchange file written");
    Ok(true)
}

fn project_ring<T: Sample>(
    ring_path: &Path,
    csv_path: &Path,
    subset: &SubsetRecord,
    times: &[i64],
) -> TransferResult<usize> {
    let values: Vec<T> = ringfile::read_ring(ring_path, subset.capacity)?;
    interchange::write_series(csv_path, times, &values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_directory_aborts_the_run() {
        let opts = ImportOptions {
            database_dir: PathBuf::from("/nonexistent/meterlog-db"),
            feed_dir: PathBuf::from("/nonexistent/meterlog-feed"),
            registry_path: PathBuf::from("/nonexistent/registry.json"),
            cutoff: Cutoff::UNLIMITED,
        };
        assert!(matches!(
            import_directory(&opts),
            Err(TransferError::Io(_))
        ));
    }

    #[test]
    fn directory_without_schemas_is_nothing_importable() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), "hello").unwrap();

        let opts = ImportOptions {
            database_dir: dir.path().to_path_buf(),
            feed_dir: dir.path().to_path_buf(),
            registry_path: dir.path().join("registry.json"),
            cutoff: Cutoff::UNLIMITED,
        };
        assert!(matches!(
            import_directory(&opts),
            Err(TransferError::NothingImportable(_))
        ));
    }

    #[test]
    fn schema_scan_is_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.dat"), "x").unwrap();
        fs::write(dir.path().join("a.dat"), "x").unwrap();
        fs::write(dir.path().join("a.rra"), "x").unwrap();

        let files = schema_files(dir.path()).unwrap();
        let names: Vec<_> = files.iter().map(|p| device_id_from(p)).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
