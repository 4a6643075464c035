//! Reader/writer for the flat ring buffer (".rra") files.
//!
//! A ring buffer file is a bare array of `capacity` fixed-width values in
//! physical slot order, no header, no footer. Physical position is the
//! invariant the appliance depends on for its own offset-relative appends,
//! so reads and writes never reorder slots. Writes replace the whole file in
//! one pass through a temp file in the same directory followed by a rename,
//! so a crash cannot leave a half-written ring behind.

use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::{TransferError, TransferResult};
use crate::sample::Sample;

/// Read exactly `capacity` samples in physical slot order.
///
/// Fails with [`TransferError::ShortRead`] when the file holds fewer samples
/// than the schema declares; trailing bytes beyond `capacity` samples are
/// ignored.
pub fn read_ring<T: Sample>(path: &Path, capacity: usize) -> TransferResult<Vec<T>> {
    let bytes = fs::read(path)?;
    let need = capacity * T::WIDTH;
    if bytes.len() < need {
        return Err(TransferError::ShortRead {
            expected: capacity,
            got: bytes.len() / T::WIDTH,
        });
    }

    Ok(bytes[..need]
        .chunks_exact(T::WIDTH)
        .map(T::from_le)
        .collect())
}

/// Rewrite a ring buffer file with a full physical-order value sequence.
///
/// The destination is replaced atomically; slot order is written verbatim.
pub fn write_ring<T: Sample>(path: &Path, values: &[T]) -> TransferResult<()> {
    let mut buf = Vec::with_capacity(values.len() * T::WIDTH);
    for value in values {
        value.extend_le(&mut buf);
    }

    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    let mut tmp = NamedTempFile::new_in(dir.unwrap_or_else(|| Path::new(".")))?;
    tmp.write_all(&buf)?;
    tmp.persist(path).map_err(|e| TransferError::Io(e.error))?;
    Ok(())
}
