//! Custom error types for the application.
//!
//! This module defines the primary error type, `TransferError`, for the entire
//! application. Using the `thiserror` crate, it provides a centralized and
//! consistent way to handle the different kinds of failures a migration run
//! can hit, from unreadable files to corrupt schema records.
//!
//! ## Error Hierarchy
//!
//! `TransferError` consolidates the following sources:
//!
//! - **`FormatMismatch`**: the schema file's 17-byte format tag is not the
//!   expected constant. Fatal for that file; the batch skips the device.
//! - **`Truncated`**: a declared length field whose payload the stream cannot
//!   supply in full, hit while decoding the device header. Truncation inside
//!   a subset record is handled by the decoder itself (the partial subset is
//!   discarded) and never surfaces as this error.
//! - **`ShortRead`**: a ring buffer file holds fewer samples than its schema
//!   declares. The caller decides whether this is fatal.
//! - **`NotProvisioned`**: the device id is the `placeholder` sentinel. The
//!   batch loop downgrades this to a notice; it never fails a run.
//! - **`SubsetOutOfRange`**: a subset index outside `0..n_sets`. This is an
//!   invariant violation and should not occur with a well-formed decode.
//! - **`Io`** / **`Interchange`** / **`Registry`** / **`Config`**: wrapped
//!   errors from std I/O, the `csv` crate, `serde_json` and the `config`
//!   crate respectively.
//! - **`InvalidDate`**: a cutoff date that does not parse as `YYYY-MM-DD`.
//! - **`NothingImportable`**: a batch run found no schema files at all.
//!
//! Per-device and per-subset failures are caught and logged at the batch
//! level; only directory-level failures abort a run.

use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias for results using the application error type.
pub type TransferResult<T> = std::result::Result<T, TransferError>;

/// Application-wide error type.
#[derive(Error, Debug)]
pub enum TransferError {
    /// The schema file does not start with the known format tag.
    #[error("unrecognized schema format tag")]
    FormatMismatch,

    /// The schema stream ended before a declared field was complete.
    #[error("schema stream truncated while reading {0}")]
    Truncated(&'static str),

    /// A ring buffer file is shorter than its schema declares.
    #[error("ring buffer file holds {got} samples, schema declares {expected}")]
    ShortRead {
        /// Sample count the schema declares.
        expected: usize,
        /// Sample count the file actually holds.
        got: usize,
    },

    /// The device carries the `placeholder` id and has no data yet.
    #[error("device not yet provisioned (placeholder id)")]
    NotProvisioned,

    /// A subset index outside the decoded record's range.
    #[error("subset index {index} out of range (device has {n_sets})")]
    SubsetOutOfRange {
        /// The offending index.
        index: usize,
        /// Number of subsets the device record carries.
        n_sets: usize,
    },

    /// Wrapped std I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped `csv` crate error from interchange reading/writing.
    #[error("interchange file error: {0}")]
    Interchange(#[from] csv::Error),

    /// Wrapped `serde_json` error from the registry document.
    #[error("registry document error: {0}")]
    Registry(#[from] serde_json::Error),

    /// Wrapped configuration-layer error.
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// A cutoff date string that does not parse.
    #[error("invalid cutoff date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    /// A batch run found no schema files to process.
    #[error("no schema files found in {0}")]
    NothingImportable(PathBuf),
}
